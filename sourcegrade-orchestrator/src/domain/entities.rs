//! Orchestrator entities

use sourcegrade_core::domain::{AnalyzerResult, SourceFingerprint};

/// Outcome of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRun {
    /// One result per analyzer that ran, in registration order
    pub results: Vec<AnalyzerResult>,
    /// Results came from the cache; no analyzer was invoked
    pub from_cache: bool,
    pub fingerprint: Option<SourceFingerprint>,
}

impl AnalysisRun {
    pub fn average_score(&self) -> Option<f64> {
        if self.results.is_empty() {
            return None;
        }
        let total: f64 = self.results.iter().map(|r| r.score).sum();
        Some(total / self.results.len() as f64)
    }
}
