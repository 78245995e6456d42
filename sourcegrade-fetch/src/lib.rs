//! Sourcegrade Fetch - Source acquisition
//!
//! Materializes a [`SourceDescriptor`](sourcegrade_core::domain::SourceDescriptor)
//! into a disposable [`Workspace`](sourcegrade_core::domain::Workspace):
//!
//! - **Git**: shallow clone with optional ref checkout and embedded credentials
//! - **Archive**: HTTP(S) download streamed to disk, then extracted
//! - **Registry**: npm packaging tool, tarball extracted to `package/`
//! - **Local**: recursive copy, the original tree is never handed out
//!
//! The [`SourceDispatcher`] picks the first registered backend that accepts a
//! descriptor and normalizes every failure into an
//! [`AcquisitionError`](sourcegrade_core::application::AcquisitionError).

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::SourceDispatcher;
pub use domain::SourceBackend;
pub use infrastructure::{
    ArchiveBackend, ArchiveBackendConfig, GitBackend, GitBackendConfig, LocalBackend,
    RegistryBackend, RegistryBackendConfig, WorkspaceAllocator,
};
