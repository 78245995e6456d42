//! Application setup and wiring

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use sourcegrade_core::Config;
use sourcegrade_core::application::{AcquisitionError, AnalysisError};
use sourcegrade_core::domain::{
    AnalysisContext, Analyzer, AnalyzerConfig, AnalyzerResult, SourceDescriptor,
    SourceFingerprint,
};
use sourcegrade_core::infrastructure::InMemoryResultCache;
use sourcegrade_fetch::SourceDispatcher;
use sourcegrade_orchestrator::AnalysisOrchestrator;
use tracing::{info, warn};

/// Errors surfaced by [`Pipeline`]
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("Failed to scan workspace: {0}")]
    Workspace(#[from] std::io::Error),
}

/// Outcome of [`Pipeline::analyze_source`]
#[derive(Debug, Clone)]
pub struct SourceAnalysis {
    pub fingerprint: Option<SourceFingerprint>,
    pub results: Vec<AnalyzerResult>,
    /// Results were served from the cache
    pub from_cache: bool,
    /// Wall-clock time from acquisition to release
    pub duration: Duration,
}

/// Dispatcher, orchestrator and shared result cache
pub struct Pipeline {
    dispatcher: SourceDispatcher,
    orchestrator: AnalysisOrchestrator,
    cache: Arc<InMemoryResultCache>,
}

/// Build a pipeline with the default backends and an in-memory result cache
pub fn create_pipeline(config: &Config) -> Result<Pipeline, PipelineError> {
    let dispatcher = SourceDispatcher::with_default_backends(&config.fetch)?;
    let cache = Arc::new(InMemoryResultCache::new());
    let orchestrator = AnalysisOrchestrator::from_config(&config.cache, cache.clone());

    info!(
        backends = ?dispatcher.backend_ids(),
        cache_enabled = config.cache.enabled,
        workspace_root = %config.fetch.workspace_root().display(),
        "Pipeline initialized"
    );

    Ok(Pipeline {
        dispatcher,
        orchestrator,
        cache,
    })
}

impl Pipeline {
    pub fn dispatcher(&self) -> &SourceDispatcher {
        &self.dispatcher
    }

    /// Mutable access for registering or overriding backends
    pub fn dispatcher_mut(&mut self) -> &mut SourceDispatcher {
        &mut self.dispatcher
    }

    pub fn orchestrator(&self) -> &AnalysisOrchestrator {
        &self.orchestrator
    }

    pub fn cache(&self) -> &Arc<InMemoryResultCache> {
        &self.cache
    }

    pub fn register_analyzer(&mut self, analyzer: Arc<dyn Analyzer>) -> Result<(), AnalysisError> {
        self.orchestrator.register(analyzer)
    }

    /// Acquire `descriptor`, analyze it and release the workspace.
    ///
    /// The workspace is released whether or not analysis succeeds.
    pub async fn analyze_source(
        &self,
        descriptor: &SourceDescriptor,
        configs: &HashMap<String, AnalyzerConfig>,
    ) -> Result<SourceAnalysis, PipelineError> {
        let started = Instant::now();
        let workspace = self.dispatcher.acquire(descriptor).await?;

        let outcome = async {
            let context = AnalysisContext::from_workspace(&workspace).await?;
            let run = self
                .orchestrator
                .run_analysis_detailed(&context, configs)
                .await?;
            Ok::<_, PipelineError>(run)
        }
        .await;

        workspace.release().await;

        let run = outcome.inspect_err(|e| {
            warn!(source = %descriptor.location(), error = %e, "Source analysis failed");
        })?;

        let duration = started.elapsed();
        info!(
            source = %descriptor.location(),
            analyzers = run.results.len(),
            from_cache = run.from_cache,
            duration_ms = duration.as_millis() as u64,
            "Source analysis complete"
        );

        Ok(SourceAnalysis {
            fingerprint: run.fingerprint,
            results: run.results,
            from_cache: run.from_cache,
            duration,
        })
    }

    /// Release analyzer resources
    pub async fn shutdown(&self) {
        self.orchestrator.cleanup().await;
    }
}
