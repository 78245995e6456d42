//! Application layer - error taxonomy and the result cache contract

pub mod cache;
pub mod errors;

pub use cache::*;
pub use errors::*;
