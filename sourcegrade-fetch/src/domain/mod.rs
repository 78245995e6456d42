//! Backend contract

pub mod traits;

pub use traits::*;
