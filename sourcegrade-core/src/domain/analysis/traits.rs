//! Analyzer trait definition

use async_trait::async_trait;

use super::entities::{AnalysisContext, AnalyzerResult};
use crate::application::errors::AnalysisError;

/// Trait that all analyzers must implement
///
/// Analyzers are registered with the orchestrator under their [`Analyzer::id`],
/// which must be unique within one orchestrator.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Unique analyzer identifier
    fn id(&self) -> &str;

    /// Analyze the project described by `context`.
    ///
    /// `context.config` carries the configuration resolved for this analyzer.
    async fn analyze(&self, context: &AnalysisContext) -> Result<AnalyzerResult, AnalysisError>;

    /// Reject rule sets this analyzer does not understand
    fn validate_config(
        &self,
        _rules: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), AnalysisError> {
        Ok(())
    }

    /// Release resources held between runs (worker processes, caches, ...)
    async fn cleanup(&self) -> Result<(), AnalysisError> {
        Ok(())
    }
}
