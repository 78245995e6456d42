//! Infrastructure layer

pub mod cache;

pub use cache::*;
