//! Source entities

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use super::value_objects::SourceKind;

/// Identifies a specific version of a source; `version` is the result cache key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFingerprint {
    pub version: String,
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Map<String, serde_json::Value>>,
}

impl SourceFingerprint {
    pub fn new(kind: SourceKind, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            kind,
            extra: None,
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }
}

struct ReleaseState {
    target: PathBuf,
    released: AtomicBool,
}

/// Teardown action for an acquisition directory.
///
/// Cloneable and idempotent: the first `release` removes the directory,
/// every later call is a no-op. A directory that is already gone is not
/// an error, and removal failures are logged instead of raised.
#[derive(Clone)]
pub struct ReleaseHandle {
    inner: Arc<ReleaseState>,
}

impl ReleaseHandle {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(ReleaseState {
                target: target.into(),
                released: AtomicBool::new(false),
            }),
        }
    }

    /// Directory removed on release
    pub fn target(&self) -> &Path {
        &self.inner.target
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }

    pub async fn release(&self) {
        if self.inner.released.swap(true, Ordering::AcqRel) {
            debug!(path = %self.inner.target.display(), "Workspace already released");
            return;
        }

        match tokio::fs::remove_dir_all(&self.inner.target).await {
            Ok(()) => {
                debug!(path = %self.inner.target.display(), "Released workspace");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.inner.target.display(), "Workspace directory already removed");
            }
            Err(e) => {
                warn!(
                    path = %self.inner.target.display(),
                    error = %e,
                    "Failed to remove workspace directory"
                );
            }
        }
    }
}

impl std::fmt::Debug for ReleaseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseHandle")
            .field("target", &self.inner.target)
            .field("released", &self.is_released())
            .finish()
    }
}

/// A disposable local materialization of a project's source tree.
///
/// Exclusively owned by the caller that received it until [`Workspace::release`]
/// is invoked; after release `path` must not be read.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    fingerprint: Option<SourceFingerprint>,
    release: ReleaseHandle,
}

impl Workspace {
    pub fn new(path: impl Into<PathBuf>, release: ReleaseHandle) -> Self {
        Self {
            path: path.into(),
            fingerprint: None,
            release,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: SourceFingerprint) -> Self {
        self.fingerprint = Some(fingerprint);
        self
    }

    /// Project root inside the acquisition directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fingerprint(&self) -> Option<&SourceFingerprint> {
        self.fingerprint.as_ref()
    }

    /// Handle that can release this workspace from elsewhere (e.g. after a timeout)
    pub fn release_handle(&self) -> ReleaseHandle {
        self.release.clone()
    }

    pub async fn release(&self) {
        self.release.release().await;
    }
}
