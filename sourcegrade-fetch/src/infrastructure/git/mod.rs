mod service;

pub use service::{GitBackend, GitBackendConfig, authenticated_url, is_supported_url};
