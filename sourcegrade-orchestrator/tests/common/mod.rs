//! Test doubles for sourcegrade-orchestrator
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sourcegrade_core::application::{AnalysisError, CacheEntry, CacheError, ResultCache};
use sourcegrade_core::domain::{
    AnalysisContext, AnalysisIssue, Analyzer, AnalyzerResult, Severity,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Succeed,
    Fail,
    Panic,
}

/// Analyzer that scores a fixed value and counts its invocations
pub struct FakeAnalyzer {
    pub id: &'static str,
    pub score: f64,
    pub behavior: Behavior,
    pub analyzed: AtomicUsize,
    pub cleaned: AtomicUsize,
    pub cleanup_fails: bool,
}

impl FakeAnalyzer {
    pub fn new(id: &'static str, score: f64) -> Arc<Self> {
        Self::with_behavior(id, score, Behavior::Succeed)
    }

    pub fn with_behavior(id: &'static str, score: f64, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id,
            score,
            behavior,
            analyzed: AtomicUsize::new(0),
            cleaned: AtomicUsize::new(0),
            cleanup_fails: false,
        })
    }

    pub fn failing_cleanup(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            score: 0.0,
            behavior: Behavior::Succeed,
            analyzed: AtomicUsize::new(0),
            cleaned: AtomicUsize::new(0),
            cleanup_fails: true,
        })
    }

    pub fn analyzed(&self) -> usize {
        self.analyzed.load(Ordering::SeqCst)
    }

    pub fn cleaned(&self) -> usize {
        self.cleaned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Analyzer for FakeAnalyzer {
    fn id(&self) -> &str {
        self.id
    }

    async fn analyze(&self, context: &AnalysisContext) -> Result<AnalyzerResult, AnalysisError> {
        self.analyzed.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Fail => Err(AnalysisError::InvalidConfig {
                analyzer_id: "somewhere-else".into(),
                message: "parser crashed".into(),
            }),
            Behavior::Panic => panic!("analyzer exploded"),
            Behavior::Succeed => {
                let issues = context
                    .files_for(self.id)?
                    .into_iter()
                    .map(|file| {
                        AnalysisIssue::new(
                            Severity::Info,
                            "seen",
                            "file inspected",
                            file.display().to_string(),
                            1,
                            1,
                        )
                    })
                    .collect();
                Ok(AnalyzerResult::new(self.id, self.score, issues))
            }
        }
    }

    fn validate_config(
        &self,
        rules: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AnalysisError> {
        match rules.keys().find(|k| k.as_str() != "max-depth") {
            Some(unknown) => Err(AnalysisError::invalid_config(
                self.id,
                format!("unknown rule {}", unknown),
            )),
            None => Ok(()),
        }
    }

    async fn cleanup(&self) -> Result<(), AnalysisError> {
        self.cleaned.fetch_add(1, Ordering::SeqCst);
        if self.cleanup_fails {
            return Err(AnalysisError::analysis_failed(self.id, "worker already gone"));
        }
        Ok(())
    }
}

/// Analyzer relying on every default trait method
pub struct MinimalAnalyzer;

#[async_trait]
impl Analyzer for MinimalAnalyzer {
    fn id(&self) -> &str {
        "minimal"
    }

    async fn analyze(&self, _context: &AnalysisContext) -> Result<AnalyzerResult, AnalysisError> {
        Ok(AnalyzerResult::new("minimal", 100.0, vec![]))
    }
}

/// Cache backend whose every operation fails
pub struct BrokenCache;

#[async_trait]
impl ResultCache for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn set(&self, _key: &str, _entry: CacheEntry) -> Result<(), CacheError> {
        Err(CacheError::Backend("connection refused".into()))
    }
}
