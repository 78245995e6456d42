//! Acquisition directory allocation

use std::path::{Path, PathBuf};

use sourcegrade_core::config::FetchConfig;
use sourcegrade_core::domain::SourceKind;
use tracing::{debug, warn};
use uuid::Uuid;

/// Creates uniquely named acquisition directories under a shared root.
///
/// Every call to [`allocate`](Self::allocate) yields a directory that did not
/// exist before; concurrent acquisitions never share one.
#[derive(Debug, Clone)]
pub struct WorkspaceAllocator {
    root: PathBuf,
}

impl Default for WorkspaceAllocator {
    fn default() -> Self {
        Self::new(FetchConfig::default().workspace_root())
    }
}

impl WorkspaceAllocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create `<root>/sourcegrade-<kind>-<uuid>`
    pub async fn allocate(&self, kind: SourceKind) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self
            .root
            .join(format!("sourcegrade-{}-{}", kind.slug(), Uuid::new_v4()));
        // create_dir fails on an existing leaf, so a directory is never reused
        tokio::fs::create_dir(&path).await?;
        debug!(path = %path.display(), kind = %kind, "Allocated acquisition directory");
        Ok(path)
    }

    /// Best-effort removal after a failed acquisition. Never raises.
    pub async fn discard(&self, path: &Path) {
        match tokio::fs::remove_dir_all(path).await {
            Ok(()) => debug!(path = %path.display(), "Removed partial acquisition directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %path.display(),
                error = %e,
                "Failed to clean up acquisition directory"
            ),
        }
    }
}
