//! Sourcegrade - Source acquisition and cache-gated analysis
//!
//! Wires the fetch and orchestrator crates into a single [`Pipeline`]: acquire
//! a source into a disposable workspace, run the registered analyzers (or serve
//! fresh cached results) and release the workspace.

mod app;

pub use app::{Pipeline, PipelineError, SourceAnalysis, create_pipeline};
pub use sourcegrade_core::{Config, init_tracing};

// Re-export for convenience
pub use sourcegrade_core;
pub use sourcegrade_fetch;
pub use sourcegrade_orchestrator;
