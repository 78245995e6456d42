//! Domain layer - source and analysis models

pub mod analysis;
pub mod source;

pub use analysis::{entities::*, traits::*, value_objects::*};
pub use source::{entities::*, value_objects::*};
