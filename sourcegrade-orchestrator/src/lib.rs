//! Sourcegrade Orchestrator - Cache-gated analysis runs
//!
//! Runs registered [`Analyzer`](sourcegrade_core::domain::Analyzer)s over an
//! acquired workspace, sequentially and in registration order, and stores the
//! result set under the source fingerprint so an unchanged source is not
//! analyzed twice within the cache's max-age.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::AnalysisOrchestrator;
pub use domain::AnalysisRun;
pub use infrastructure::AnalyzerRegistry;
