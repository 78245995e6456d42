//! Analysis orchestrator

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use sourcegrade_core::application::{AnalysisError, CacheEntry, ResultCache};
use sourcegrade_core::config::CacheConfig;
use sourcegrade_core::domain::{
    AnalysisContext, Analyzer, AnalyzerConfig, AnalyzerResult, SourceFingerprint,
};
use tracing::{debug, error, info, warn};

use crate::domain::AnalysisRun;
use crate::infrastructure::AnalyzerRegistry;

/// Runs registered analyzers behind an optional result cache
pub struct AnalysisOrchestrator {
    registry: AnalyzerRegistry,
    cache: Option<Arc<dyn ResultCache>>,
    max_age: Duration,
}

impl Default for AnalysisOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisOrchestrator {
    /// Orchestrator without a cache; every run invokes the analyzers
    pub fn new() -> Self {
        Self {
            registry: AnalyzerRegistry::new(),
            cache: None,
            max_age: CacheConfig::default().max_age(),
        }
    }

    /// Orchestrator that reuses results younger than `max_age`
    pub fn with_cache(cache: Arc<dyn ResultCache>, max_age: Duration) -> Self {
        Self {
            registry: AnalyzerRegistry::new(),
            cache: Some(cache),
            max_age,
        }
    }

    /// Orchestrator honoring the `cache` configuration section
    pub fn from_config(config: &CacheConfig, cache: Arc<dyn ResultCache>) -> Self {
        if config.enabled {
            Self::with_cache(cache, config.max_age())
        } else {
            Self::new()
        }
    }

    /// Register an analyzer; fails with `DuplicateAnalyzer` on a repeated id
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) -> Result<(), AnalysisError> {
        let id = analyzer.id().to_string();
        self.registry.register(analyzer)?;
        debug!(analyzer = %id, "Registered analyzer");
        Ok(())
    }

    pub fn analyzer(&self, analyzer_id: &str) -> Result<Arc<dyn Analyzer>, AnalysisError> {
        self.registry
            .get(analyzer_id)
            .ok_or_else(|| AnalysisError::AnalyzerNotFound {
                analyzer_id: analyzer_id.to_string(),
            })
    }

    pub fn analyzer_ids(&self) -> Vec<&str> {
        self.registry.ids()
    }

    /// Run every enabled analyzer, or return cached results for the context's
    /// fingerprint when they are fresh
    pub async fn run_analysis(
        &self,
        context: &AnalysisContext,
        configs: &HashMap<String, AnalyzerConfig>,
    ) -> Result<Vec<AnalyzerResult>, AnalysisError> {
        Ok(self.run_analysis_detailed(context, configs).await?.results)
    }

    /// Same as [`run_analysis`](Self::run_analysis), reporting whether the
    /// cache answered
    pub async fn run_analysis_detailed(
        &self,
        context: &AnalysisContext,
        configs: &HashMap<String, AnalyzerConfig>,
    ) -> Result<AnalysisRun, AnalysisError> {
        let cacheable = match (&self.cache, &context.fingerprint) {
            (Some(cache), Some(fingerprint)) => Some((cache, fingerprint)),
            _ => None,
        };

        if let Some((cache, fingerprint)) = cacheable
            && let Some(entry) = self.lookup(cache.as_ref(), fingerprint).await
        {
            info!(
                version = %fingerprint.version,
                results = entry.results.len(),
                "Serving analysis results from cache"
            );
            return Ok(AnalysisRun {
                results: entry.results,
                from_cache: true,
                fingerprint: Some(fingerprint.clone()),
            });
        }

        let results = self.execute_analyzers(context, configs).await?;

        if let Some((cache, fingerprint)) = cacheable {
            let entry = CacheEntry::new(fingerprint.clone(), results.clone());
            if let Err(e) = cache.set(&fingerprint.version, entry).await {
                warn!(
                    version = %fingerprint.version,
                    error = %e,
                    "Failed to store analysis results"
                );
            }
        }

        Ok(AnalysisRun {
            results,
            from_cache: false,
            fingerprint: context.fingerprint.clone(),
        })
    }

    /// Fresh cache entry for `fingerprint`, if any. Backend errors count as a miss.
    async fn lookup(
        &self,
        cache: &dyn ResultCache,
        fingerprint: &SourceFingerprint,
    ) -> Option<CacheEntry> {
        match cache.get(&fingerprint.version).await {
            Ok(Some(entry)) if entry.is_fresh(self.max_age, chrono::Utc::now()) => Some(entry),
            Ok(Some(entry)) => {
                debug!(
                    version = %fingerprint.version,
                    age_secs = entry.age_at(chrono::Utc::now()).as_secs(),
                    "Cached results expired"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(version = %fingerprint.version, error = %e, "Result cache lookup failed");
                None
            }
        }
    }

    async fn execute_analyzers(
        &self,
        context: &AnalysisContext,
        configs: &HashMap<String, AnalyzerConfig>,
    ) -> Result<Vec<AnalyzerResult>, AnalysisError> {
        let mut results = Vec::new();

        for analyzer in self.registry.iter() {
            let id = analyzer.id();
            let config = configs.get(id).cloned().unwrap_or_default();
            if !config.enabled {
                debug!(analyzer = %id, "Analyzer disabled, skipping");
                continue;
            }

            match self.execute_one(analyzer.as_ref(), context, config).await {
                Ok(result) => {
                    debug!(
                        analyzer = %id,
                        score = result.score,
                        issues = result.issues.len(),
                        "Analyzer finished"
                    );
                    results.push(result);
                }
                Err(e) => {
                    error!(analyzer = %id, error = %e, "Analyzer failed, aborting run");
                    return Err(e);
                }
            }
        }

        Ok(results)
    }

    async fn execute_one(
        &self,
        analyzer: &dyn Analyzer,
        context: &AnalysisContext,
        config: AnalyzerConfig,
    ) -> Result<AnalyzerResult, AnalysisError> {
        let id = analyzer.id();

        if let Some(rules) = &config.rules {
            std::panic::catch_unwind(AssertUnwindSafe(|| analyzer.validate_config(rules)))
                .map_err(|panic| panicked(id, "validate_config", panic.as_ref()))?
                .map_err(|e| name_failure(id, e))?;
        }

        let scoped = context.with_config(config);
        AssertUnwindSafe(analyzer.analyze(&scoped))
            .catch_unwind()
            .await
            .map_err(|panic| panicked(id, "analyze", panic.as_ref()))?
            .map_err(|e| name_failure(id, e))
    }

    /// Invoke every analyzer's cleanup hook concurrently and wait for all.
    ///
    /// Hook failures are logged; they never stop the remaining hooks.
    pub async fn cleanup(&self) {
        let hooks = self.registry.iter().map(|analyzer| async move {
            (analyzer.id(), analyzer.cleanup().await)
        });

        for (id, outcome) in futures::future::join_all(hooks).await {
            if let Err(e) = outcome {
                warn!(analyzer = %id, error = %e, "Analyzer cleanup failed");
            }
        }
    }
}

/// Wrap an analyzer error so it names the failing analyzer
fn name_failure(analyzer_id: &str, error: AnalysisError) -> AnalysisError {
    let already_named = matches!(
        &error,
        AnalysisError::AnalysisFailed { analyzer_id: failed, .. } if failed == analyzer_id
    );
    if already_named {
        return error;
    }
    AnalysisError::analysis_failed(analyzer_id, error.to_string()).caused_by(error)
}

fn panicked(analyzer_id: &str, step: &str, panic: &(dyn std::any::Any + Send)) -> AnalysisError {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    AnalysisError::analysis_failed(analyzer_id, format!("{} panicked: {}", step, message))
}
