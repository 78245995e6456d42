//! Error taxonomy exposed to callers
//!
//! Two families: [`AcquisitionError`] for the dispatcher and its backends,
//! [`AnalysisError`] for the orchestrator and analyzers. Every variant has a
//! stable [`code`](AcquisitionError::code), an identifying subject (source kind
//! or analyzer id) and, where relevant, the wrapped cause reachable through
//! [`std::error::Error::source`].

use thiserror::Error;

use crate::domain::source::SourceKind;

/// Boxed underlying cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Source acquisition errors
#[derive(Error, Debug)]
pub enum AcquisitionError {
    /// Descriptor is absent, untagged or structurally invalid
    #[error("Invalid source: {message}")]
    InvalidSource {
        kind: Option<SourceKind>,
        message: String,
    },

    /// No registered backend accepts the descriptor
    #[error("No backend registered for {kind} sources")]
    DownloaderNotFound { kind: SourceKind },

    /// Generic wrap for failures that escaped a backend untyped
    #[error("Download of {kind} source failed: {message}")]
    DownloadFailed {
        kind: SourceKind,
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Clone of {location} failed: {message}")]
    CloneFailed {
        location: String,
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Archive download from {location} failed: {message}")]
    ArchiveDownloadFailed {
        location: String,
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Registry download of {location} failed: {message}")]
    RegistryDownloadFailed {
        location: String,
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Copy of {location} failed: {message}")]
    LocalCopyFailed {
        location: String,
        message: String,
        #[source]
        cause: Option<BoxError>,
    },
}

impl AcquisitionError {
    pub fn invalid_source(kind: SourceKind, message: impl Into<String>) -> Self {
        Self::InvalidSource {
            kind: Some(kind),
            message: message.into(),
        }
    }

    pub fn download_failed(kind: SourceKind, message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn clone_failed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CloneFailed {
            location: location.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn archive_download_failed(
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ArchiveDownloadFailed {
            location: location.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn registry_download_failed(
        location: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::RegistryDownloadFailed {
            location: location.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn local_copy_failed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LocalCopyFailed {
            location: location.into(),
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying cause. No-op for variants without one.
    pub fn caused_by(mut self, error: impl Into<BoxError>) -> Self {
        match &mut self {
            Self::DownloadFailed { cause, .. }
            | Self::CloneFailed { cause, .. }
            | Self::ArchiveDownloadFailed { cause, .. }
            | Self::RegistryDownloadFailed { cause, .. }
            | Self::LocalCopyFailed { cause, .. } => *cause = Some(error.into()),
            Self::InvalidSource { .. } | Self::DownloaderNotFound { .. } => {}
        }
        self
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidSource { .. } => "INVALID_SOURCE",
            Self::DownloaderNotFound { .. } => "DOWNLOADER_NOT_FOUND",
            Self::DownloadFailed { .. } => "DOWNLOAD_FAILED",
            Self::CloneFailed { .. } => "CLONE_FAILED",
            Self::ArchiveDownloadFailed { .. } => "ARCHIVE_DOWNLOAD_FAILED",
            Self::RegistryDownloadFailed { .. } => "REGISTRY_DOWNLOAD_FAILED",
            Self::LocalCopyFailed { .. } => "LOCAL_COPY_FAILED",
        }
    }

    /// Originating source kind, when known
    pub fn source_kind(&self) -> Option<SourceKind> {
        match self {
            Self::InvalidSource { kind, .. } => *kind,
            Self::DownloaderNotFound { kind } | Self::DownloadFailed { kind, .. } => Some(*kind),
            Self::CloneFailed { .. } => Some(SourceKind::VersionControl),
            Self::ArchiveDownloadFailed { .. } => Some(SourceKind::Archive),
            Self::RegistryDownloadFailed { .. } => Some(SourceKind::Registry),
            Self::LocalCopyFailed { .. } => Some(SourceKind::Local),
        }
    }

    pub fn is_invalid_source(&self) -> bool {
        matches!(self, Self::InvalidSource { .. })
    }
}

/// Analysis errors
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// An analyzer with this id is already registered
    #[error("Analyzer already registered: {analyzer_id}")]
    DuplicateAnalyzer { analyzer_id: String },

    /// Validation or analysis step failed; aborts the whole run
    #[error("Analyzer {analyzer_id} failed: {message}")]
    AnalysisFailed {
        analyzer_id: String,
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    #[error("Invalid configuration for analyzer {analyzer_id}: {message}")]
    InvalidConfig {
        analyzer_id: String,
        message: String,
    },

    #[error("Analyzer not found: {analyzer_id}")]
    AnalyzerNotFound { analyzer_id: String },
}

impl AnalysisError {
    pub fn analysis_failed(analyzer_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AnalysisFailed {
            analyzer_id: analyzer_id.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn invalid_config(analyzer_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            analyzer_id: analyzer_id.into(),
            message: message.into(),
        }
    }

    /// Attach the underlying cause. No-op for variants without one.
    pub fn caused_by(mut self, error: impl Into<BoxError>) -> Self {
        if let Self::AnalysisFailed { cause, .. } = &mut self {
            *cause = Some(error.into());
        }
        self
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateAnalyzer { .. } => "DUPLICATE_ANALYZER",
            Self::AnalysisFailed { .. } => "ANALYSIS_FAILED",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::AnalyzerNotFound { .. } => "ANALYZER_NOT_FOUND",
        }
    }

    pub fn analyzer_id(&self) -> Option<&str> {
        match self {
            Self::DuplicateAnalyzer { analyzer_id }
            | Self::AnalysisFailed { analyzer_id, .. }
            | Self::InvalidConfig { analyzer_id, .. }
            | Self::AnalyzerNotFound { analyzer_id } => Some(analyzer_id),
        }
    }
}

/// Result cache backend errors
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),
}
