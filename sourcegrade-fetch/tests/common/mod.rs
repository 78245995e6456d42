//! Shared test doubles and fixtures for sourcegrade-fetch
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use sourcegrade_core::application::AcquisitionError;
use sourcegrade_core::domain::{
    ReleaseHandle, SourceDescriptor, SourceFingerprint, SourceKind, Workspace,
};
use sourcegrade_fetch::SourceBackend;

// ── Recording backend (test double) ──────────────────────────────────────────

/// Accepts every descriptor of its kind and counts invocations
pub struct RecordingBackend {
    pub kind: SourceKind,
    pub label: &'static str,
    pub root: PathBuf,
    pub acquired: AtomicUsize,
    pub fingerprinted: AtomicUsize,
}

impl RecordingBackend {
    pub fn new(kind: SourceKind, label: &'static str, root: &Path) -> Arc<Self> {
        Arc::new(Self {
            kind,
            label,
            root: root.to_path_buf(),
            acquired: AtomicUsize::new(0),
            fingerprinted: AtomicUsize::new(0),
        })
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn fingerprinted(&self) -> usize {
        self.fingerprinted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceBackend for RecordingBackend {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn acquire(&self, _descriptor: &SourceDescriptor) -> Result<Workspace, AcquisitionError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let path = self.root.join(self.label);
        tokio::fs::create_dir_all(&path).await.unwrap();
        Ok(Workspace::new(&path, ReleaseHandle::new(&path)))
    }

    async fn fingerprint(
        &self,
        _descriptor: &SourceDescriptor,
        _workspace: &Path,
    ) -> Option<SourceFingerprint> {
        self.fingerprinted.fetch_add(1, Ordering::SeqCst);
        Some(SourceFingerprint::new(self.kind, format!("{}-v1", self.label)))
    }
}

/// Panics on every acquisition
pub struct PanickingBackend;

#[async_trait]
impl SourceBackend for PanickingBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    async fn acquire(&self, _descriptor: &SourceDescriptor) -> Result<Workspace, AcquisitionError> {
        panic!("disk on fire");
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Write `files` into a fresh directory and pack it with the system `tar`
pub fn make_tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    let source = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = source.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    let out = tempfile::tempdir().unwrap();
    let archive = out.path().join("fixture.tar.gz");
    let status = std::process::Command::new("tar")
        .arg("-czf")
        .arg(&archive)
        .arg("-C")
        .arg(source.path())
        .arg(".")
        .status()
        .unwrap();
    assert!(status.success(), "tar failed to build fixture");
    std::fs::read(archive).unwrap()
}

/// Number of entries directly under `root` (0 when it does not exist)
pub fn entry_count(root: &Path) -> usize {
    std::fs::read_dir(root).map(|d| d.count()).unwrap_or(0)
}
