//! Source domain module
//!
//! Describes where a project lives ([`SourceDescriptor`]) and what an
//! acquisition hands back to the caller ([`Workspace`]).

pub mod entities;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
