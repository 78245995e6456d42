//! Analyzer registry

use std::sync::Arc;

use sourcegrade_core::application::AnalysisError;
use sourcegrade_core::domain::Analyzer;

/// Registry for analyzers, kept in registration order
#[derive(Default)]
pub struct AnalyzerRegistry {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an analyzer. A repeated id is rejected and the first stays.
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) -> Result<(), AnalysisError> {
        if self.analyzers.iter().any(|a| a.id() == analyzer.id()) {
            return Err(AnalysisError::DuplicateAnalyzer {
                analyzer_id: analyzer.id().to_string(),
            });
        }
        self.analyzers.push(analyzer);
        Ok(())
    }

    /// Get an analyzer by id
    pub fn get(&self, analyzer_id: &str) -> Option<Arc<dyn Analyzer>> {
        self.analyzers.iter().find(|a| a.id() == analyzer_id).cloned()
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Analyzer>> {
        self.analyzers.iter()
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }
}
