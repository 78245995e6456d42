//! Analyzer plugin interface
//!
//! Defines the contract every analyzer implements so the orchestrator can run
//! style, type-safety, complexity or dead-code checks without knowing their
//! internals.

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::*;
pub use traits::*;
pub use value_objects::*;
