//! Result cache implementations

pub mod memory_cache;

pub use memory_cache::{CacheStatistics, InMemoryResultCache};
