//! Backend implementations

pub mod archive;
pub mod extract;
pub mod git;
pub mod local;
pub mod registry;
pub mod workspace_dir;

pub use archive::{ArchiveBackend, ArchiveBackendConfig};
pub use extract::{ArchiveFormat, ExtractError};
pub use git::{GitBackend, GitBackendConfig};
pub use local::LocalBackend;
pub use registry::{RegistryBackend, RegistryBackendConfig};
pub use workspace_dir::WorkspaceAllocator;

/// Wall-clock suffix used by fingerprint fallbacks, unique per invocation
pub(crate) fn timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
