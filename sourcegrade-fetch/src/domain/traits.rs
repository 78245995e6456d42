//! Source backend trait

use async_trait::async_trait;
use std::path::Path;

use sourcegrade_core::application::AcquisitionError;
use sourcegrade_core::domain::{SourceDescriptor, SourceFingerprint, SourceKind, Workspace};

/// One implementation per origin kind
#[async_trait]
pub trait SourceBackend: Send + Sync {
    /// Origin kind served by this backend
    fn kind(&self) -> SourceKind;

    /// Pure predicate on the descriptor's tag
    fn can_handle(&self, descriptor: &SourceDescriptor) -> bool {
        descriptor.kind() == self.kind()
    }

    /// Materialize the descriptor into a fresh workspace.
    ///
    /// On failure any partially created directory has already been removed.
    async fn acquire(&self, descriptor: &SourceDescriptor) -> Result<Workspace, AcquisitionError>;

    /// Cache fingerprint for an acquired workspace.
    ///
    /// `workspace` is the project root returned by [`SourceBackend::acquire`].
    async fn fingerprint(
        &self,
        _descriptor: &SourceDescriptor,
        _workspace: &Path,
    ) -> Option<SourceFingerprint> {
        None
    }
}
