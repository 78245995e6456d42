mod service;

pub use service::LocalBackend;
