//! Local filesystem backend

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sourcegrade_core::application::AcquisitionError;
use sourcegrade_core::domain::{
    ReleaseHandle, SourceDescriptor, SourceFingerprint, SourceKind, SourceOrigin, Workspace,
};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domain::SourceBackend;
use crate::infrastructure::timestamp_millis;
use crate::infrastructure::workspace_dir::WorkspaceAllocator;

/// Copies a local directory into a fresh acquisition directory.
///
/// Analyzers only ever see the copy, so releasing the workspace never touches
/// the caller's tree.
#[derive(Debug, Default)]
pub struct LocalBackend {
    allocator: WorkspaceAllocator,
}

impl LocalBackend {
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            allocator: WorkspaceAllocator::new(workspace_root),
        }
    }
}

#[async_trait]
impl SourceBackend for LocalBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn acquire(&self, descriptor: &SourceDescriptor) -> Result<Workspace, AcquisitionError> {
        let SourceOrigin::Local { path } = &descriptor.origin else {
            return Err(AcquisitionError::invalid_source(
                descriptor.kind(),
                "local backend only accepts local sources",
            ));
        };

        if path.as_os_str().is_empty() {
            return Err(AcquisitionError::invalid_source(SourceKind::Local, "path is empty"));
        }
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(AcquisitionError::invalid_source(
                SourceKind::Local,
                format!("path does not exist: {}", path.display()),
            ));
        }

        let location = path.display().to_string();
        let target = self
            .allocator
            .allocate(SourceKind::Local)
            .await
            .map_err(|e| {
                AcquisitionError::local_copy_failed(&location, "failed to create copy directory")
                    .caused_by(e)
            })?;

        info!(source = %location, path = %target.display(), "Copying local source");

        let source = path.clone();
        let destination = target.clone();
        let skip = self.allocator.root().to_path_buf();
        let copied = tokio::task::spawn_blocking(move || copy_tree(&source, &destination, &skip))
            .await
            .map_err(|e| {
                AcquisitionError::local_copy_failed(&location, "copy task failed").caused_by(e)
            })
            .and_then(|result| {
                result.map_err(|e| {
                    AcquisitionError::local_copy_failed(&location, e.to_string()).caused_by(e)
                })
            });

        match copied {
            Ok(files) => {
                debug!(source = %location, files = files, "Local copy completed");
                Ok(Workspace::new(&target, ReleaseHandle::new(&target)))
            }
            Err(e) => {
                self.allocator.discard(&target).await;
                Err(e)
            }
        }
    }

    async fn fingerprint(
        &self,
        descriptor: &SourceDescriptor,
        _workspace: &Path,
    ) -> Option<SourceFingerprint> {
        let SourceOrigin::Local { path } = &descriptor.origin else {
            return None;
        };

        let modified = tokio::fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).timestamp_millis());

        let stamp = modified.unwrap_or_else(timestamp_millis);
        Some(SourceFingerprint::new(
            SourceKind::Local,
            format!("{}:{}", path.display(), stamp),
        ))
    }
}

/// Recursively copy `source` into `destination`, returning the file count.
///
/// A single file is copied into `destination` under its own name. Symlinks
/// are recreated rather than followed on unix. Anything under `skip` (the
/// acquisition root) is left out so a source containing that root never
/// copies into itself.
fn copy_tree(source: &Path, destination: &Path, skip: &Path) -> std::io::Result<usize> {
    let metadata = std::fs::metadata(source)?;
    if metadata.is_file() {
        let name = source.file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "source has no file name")
        })?;
        std::fs::copy(source, destination.join(name))?;
        return Ok(1);
    }

    // Walk the canonical tree so entry paths compare against canonical roots
    let source = std::fs::canonicalize(source)?;
    let mut excluded = vec![std::fs::canonicalize(destination)?];
    if let Ok(root) = std::fs::canonicalize(skip)
        && root != source
        && root.starts_with(&source)
    {
        excluded.push(root);
    }

    let mut files = 0;
    let walker = WalkDir::new(&source)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !excluded.iter().any(|root| entry.path().starts_with(root)));
    for entry in walker {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(&source)
            .map_err(std::io::Error::other)?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
            files += 1;
        }
    }
    Ok(files)
}

#[cfg(unix)]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    let pointee = std::fs::read_link(link)?;
    std::os::unix::fs::symlink(pointee, target)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, target: &Path) -> std::io::Result<()> {
    if std::fs::metadata(link)?.is_file() {
        std::fs::copy(link, target)?;
    }
    Ok(())
}
