//! Source dispatcher
//!
//! Holds an insertion-ordered set of backends and forwards each descriptor to
//! the first one that accepts it. Every failure leaving this module is an
//! [`AcquisitionError`], including panics raised inside a backend.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use sourcegrade_core::application::AcquisitionError;
use sourcegrade_core::config::FetchConfig;
use sourcegrade_core::domain::{SourceDescriptor, SourceKind, Workspace};
use tracing::{debug, info, warn};

use crate::domain::SourceBackend;
use crate::infrastructure::{
    ArchiveBackend, ArchiveBackendConfig, GitBackend, GitBackendConfig, LocalBackend,
    RegistryBackend, RegistryBackendConfig,
};

/// Registry of source backends, consulted in registration order
#[derive(Default)]
pub struct SourceDispatcher {
    backends: Vec<(String, Arc<dyn SourceBackend>)>,
}

impl SourceDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with the git, archive, registry and local backends registered
    pub fn with_default_backends(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let mut dispatcher = Self::new();
        dispatcher.register("git", Arc::new(GitBackend::new(GitBackendConfig::from(config))));
        dispatcher.register(
            "archive",
            Arc::new(ArchiveBackend::new(ArchiveBackendConfig::from(config))?),
        );
        dispatcher.register(
            "registry",
            Arc::new(RegistryBackend::new(RegistryBackendConfig::from(config))?),
        );
        dispatcher.register("local", Arc::new(LocalBackend::new(config.workspace_root())));
        Ok(dispatcher)
    }

    /// Register a backend under `id`.
    ///
    /// An existing id is replaced in place and keeps its position.
    pub fn register(&mut self, id: impl Into<String>, backend: Arc<dyn SourceBackend>) {
        let id = id.into();
        match self.backends.iter_mut().find(|(existing, _)| *existing == id) {
            Some(slot) => {
                debug!(backend = %id, "Replacing source backend");
                slot.1 = backend;
            }
            None => {
                debug!(backend = %id, kind = %backend.kind(), "Registered source backend");
                self.backends.push((id, backend));
            }
        }
    }

    /// Registered backend ids in dispatch order
    pub fn backend_ids(&self) -> Vec<&str> {
        self.backends.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Acquire an untyped descriptor, e.g. one decoded from a request body.
    ///
    /// Absent values, values without a known `type` tag and malformed
    /// descriptors fail with `InvalidSource` before any I/O.
    pub async fn acquire_raw(
        &self,
        raw: Option<&serde_json::Value>,
    ) -> Result<Workspace, AcquisitionError> {
        let descriptor = decode_descriptor(raw)?;
        self.acquire(&descriptor).await
    }

    /// Materialize `descriptor` through the first backend that accepts it
    pub async fn acquire(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<Workspace, AcquisitionError> {
        descriptor.validate()?;
        let kind = descriptor.kind();

        let Some((id, backend)) = self
            .backends
            .iter()
            .find(|(_, backend)| backend.can_handle(descriptor))
        else {
            return Err(AcquisitionError::DownloaderNotFound { kind });
        };

        info!(backend = %id, kind = %kind, source = %descriptor.location(), "Acquiring source");

        let workspace = AssertUnwindSafe(backend.acquire(descriptor))
            .catch_unwind()
            .await
            .map_err(|panic| {
                let message = panic_message(panic.as_ref());
                warn!(backend = %id, kind = %kind, panic = %message, "Source backend panicked");
                AcquisitionError::download_failed(
                    kind,
                    format!("backend {} panicked: {}", id, message),
                )
            })??;

        if !descriptor.caching_enabled() {
            return Ok(workspace);
        }

        let fingerprint = AssertUnwindSafe(backend.fingerprint(descriptor, workspace.path()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                warn!(
                    backend = %id,
                    panic = %panic_message(panic.as_ref()),
                    "Fingerprint computation panicked, continuing uncached"
                );
                None
            });

        match fingerprint {
            Some(fingerprint) => {
                debug!(
                    backend = %id,
                    version = %fingerprint.version,
                    "Computed source fingerprint"
                );
                Ok(workspace.with_fingerprint(fingerprint))
            }
            None => Ok(workspace),
        }
    }
}

fn decode_descriptor(
    raw: Option<&serde_json::Value>,
) -> Result<SourceDescriptor, AcquisitionError> {
    let untagged = |message: &str| AcquisitionError::InvalidSource {
        kind: None,
        message: message.to_string(),
    };

    let value = match raw {
        None | Some(serde_json::Value::Null) => return Err(untagged("no source descriptor given")),
        Some(value) => value,
    };

    let tag = value
        .get("type")
        .and_then(|t| t.as_str())
        .ok_or_else(|| untagged("source descriptor has no type tag"))?;

    let kind: SourceKind = serde_json::from_value(serde_json::Value::String(tag.to_string()))
        .map_err(|_| untagged(&format!("unknown source type: {}", tag)))?;

    serde_json::from_value(value.clone()).map_err(|e| {
        AcquisitionError::invalid_source(kind, format!("malformed {} descriptor: {}", kind, e))
    })
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
