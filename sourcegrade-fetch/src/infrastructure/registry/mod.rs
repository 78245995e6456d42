mod service;

pub use service::{RegistryBackend, RegistryBackendConfig};
