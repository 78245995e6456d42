//! Application layer - analysis run orchestration

pub mod orchestrator;

pub use orchestrator::AnalysisOrchestrator;
