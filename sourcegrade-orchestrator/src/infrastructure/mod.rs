//! Infrastructure layer

pub mod analyzer_registry;

pub use analyzer_registry::AnalyzerRegistry;
