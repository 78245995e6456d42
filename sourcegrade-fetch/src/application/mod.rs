//! Application layer - backend dispatch

pub mod dispatcher;

pub use dispatcher::SourceDispatcher;
