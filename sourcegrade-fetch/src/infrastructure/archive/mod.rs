mod service;

pub use service::{ArchiveBackend, ArchiveBackendConfig, authorization_header};
