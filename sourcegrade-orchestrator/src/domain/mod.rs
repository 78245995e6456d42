//! Orchestrator domain types

pub mod entities;

pub use entities::*;
