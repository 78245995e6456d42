//! Source value objects

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::application::errors::AcquisitionError;

/// Default clone depth for version-control sources
pub const DEFAULT_CLONE_DEPTH: u32 = 1;

/// Origin kind of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Git remote
    VersionControl,
    /// Archive served over HTTP(S)
    Archive,
    /// Package registry (npm)
    Registry,
    /// Local filesystem path
    Local,
}

impl SourceKind {
    /// Stable snake_case name, matches the serialized tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VersionControl => "version_control",
            Self::Archive => "archive",
            Self::Registry => "registry",
            Self::Local => "local",
        }
    }

    /// Short name used in workspace directory names
    pub fn slug(&self) -> &'static str {
        match self {
            Self::VersionControl => "git",
            Self::Archive => "archive",
            Self::Registry => "registry",
            Self::Local => "local",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credentials attached to a remote source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SourceAuth {
    /// Token-only credentials
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            username: None,
            token: Some(token.into()),
        }
    }

    /// Username + token credentials
    pub fn basic(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            token: Some(token.into()),
        }
    }

    /// Username, ignoring empty strings
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref().filter(|u| !u.is_empty())
    }

    /// Token, ignoring empty strings
    pub fn secret(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// At least one of username/token must be present
    pub fn is_usable(&self) -> bool {
        self.username().is_some() || self.secret().is_some()
    }
}

/// Where a project lives and how to fetch it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceOrigin {
    /// Git remote, cloned shallowly
    VersionControl {
        url: String,
        #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
        reference: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        depth: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth: Option<SourceAuth>,
    },
    /// Archive downloaded over HTTP(S) and extracted
    Archive {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth: Option<SourceAuth>,
    },
    /// Package fetched through the registry tooling
    Registry {
        package_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    /// Directory on the local filesystem
    Local { path: PathBuf },
}

/// Declarative description of a project's origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    #[serde(flatten)]
    pub origin: SourceOrigin,
    /// Whether results for this source may be cached (defaults to enabled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_enabled: Option<bool>,
}

impl SourceDescriptor {
    pub fn new(origin: SourceOrigin) -> Self {
        Self {
            origin,
            cache_enabled: None,
        }
    }

    pub fn version_control(url: impl Into<String>) -> Self {
        Self::new(SourceOrigin::VersionControl {
            url: url.into(),
            reference: None,
            depth: None,
            auth: None,
        })
    }

    pub fn archive(url: impl Into<String>) -> Self {
        Self::new(SourceOrigin::Archive {
            url: url.into(),
            auth: None,
        })
    }

    pub fn registry(package_name: impl Into<String>, version: Option<String>) -> Self {
        Self::new(SourceOrigin::Registry {
            package_name: package_name.into(),
            version,
        })
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::new(SourceOrigin::Local { path: path.into() })
    }

    /// Set the ref to check out (version-control sources only)
    pub fn with_ref(mut self, value: impl Into<String>) -> Self {
        if let SourceOrigin::VersionControl { reference, .. } = &mut self.origin {
            *reference = Some(value.into());
        }
        self
    }

    /// Set the clone depth (version-control sources only)
    pub fn with_depth(mut self, value: u32) -> Self {
        if let SourceOrigin::VersionControl { depth, .. } = &mut self.origin {
            *depth = Some(value);
        }
        self
    }

    /// Attach credentials (version-control and archive sources only)
    pub fn with_auth(mut self, value: SourceAuth) -> Self {
        match &mut self.origin {
            SourceOrigin::VersionControl { auth, .. } | SourceOrigin::Archive { auth, .. } => {
                *auth = Some(value);
            }
            _ => {}
        }
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = Some(enabled);
        self
    }

    pub fn kind(&self) -> SourceKind {
        match self.origin {
            SourceOrigin::VersionControl { .. } => SourceKind::VersionControl,
            SourceOrigin::Archive { .. } => SourceKind::Archive,
            SourceOrigin::Registry { .. } => SourceKind::Registry,
            SourceOrigin::Local { .. } => SourceKind::Local,
        }
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache_enabled.unwrap_or(true)
    }

    /// Human-readable location used in logs and error messages.
    /// Never includes credentials.
    pub fn location(&self) -> String {
        match &self.origin {
            SourceOrigin::VersionControl { url, .. } | SourceOrigin::Archive { url, .. } => {
                url.clone()
            }
            SourceOrigin::Registry {
                package_name,
                version,
            } => match version {
                Some(v) => format!("{}@{}", package_name, v),
                None => package_name.clone(),
            },
            SourceOrigin::Local { path } => path.display().to_string(),
        }
    }

    /// Structural validation, performed before any I/O.
    pub fn validate(&self) -> Result<(), AcquisitionError> {
        let kind = self.kind();
        match &self.origin {
            SourceOrigin::VersionControl {
                url, depth, auth, ..
            } => {
                require_non_empty(kind, "url", url)?;
                if *depth == Some(0) {
                    return Err(AcquisitionError::invalid_source(
                        kind,
                        "clone depth must be at least 1",
                    ));
                }
                validate_auth(kind, auth.as_ref())
            }
            SourceOrigin::Archive { url, auth } => {
                require_non_empty(kind, "url", url)?;
                validate_auth(kind, auth.as_ref())
            }
            SourceOrigin::Registry { package_name, .. } => {
                require_non_empty(kind, "package name", package_name)?;
                if package_name.chars().any(char::is_whitespace) {
                    return Err(AcquisitionError::invalid_source(
                        kind,
                        format!("package name contains whitespace: {:?}", package_name),
                    ));
                }
                Ok(())
            }
            SourceOrigin::Local { path } => {
                if path.as_os_str().is_empty() {
                    return Err(AcquisitionError::invalid_source(kind, "path is empty"));
                }
                Ok(())
            }
        }
    }

    /// Auto-detect a descriptor from a single string argument
    ///
    /// - `npm:lodash@4.17.21` → Registry
    /// - `git@github.com:user/repo.git`, `ssh://...`, `*.git` → VersionControl
    /// - `https://example.com/project.tar.gz` → Archive
    /// - `https://github.com/user/repo` → VersionControl
    /// - anything else → Local
    pub fn parse(input: &str) -> Result<Self, AcquisitionError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AcquisitionError::InvalidSource {
                kind: None,
                message: "empty source argument".to_string(),
            });
        }

        if let Some(spec) = input.strip_prefix("npm:") {
            let (name, version) = split_package_spec(spec);
            return Ok(Self::registry(name, version.map(str::to_string)));
        }

        let lower = input.to_lowercase();
        let is_http = lower.starts_with("https://") || lower.starts_with("http://");

        if is_http && is_archive_path(&lower) {
            return Ok(Self::archive(input));
        }

        if is_http
            || lower.starts_with("ssh://")
            || lower.starts_with("git+ssh://")
            || lower.starts_with("git@")
            || lower.ends_with(".git")
        {
            return Ok(Self::version_control(input));
        }

        Ok(Self::local(input))
    }
}

/// Split `name@version` into its parts, keeping the leading `@` of scoped names.
///
/// ```
/// use sourcegrade_core::domain::split_package_spec;
///
/// assert_eq!(split_package_spec("left-pad@1.3.0"), ("left-pad", Some("1.3.0")));
/// assert_eq!(split_package_spec("@scope/pkg"), ("@scope/pkg", None));
/// ```
pub fn split_package_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.rfind('@') {
        Some(idx) if idx > 0 => {
            let (name, version) = (&spec[..idx], &spec[idx + 1..]);
            if version.is_empty() {
                (name, None)
            } else {
                (name, Some(version))
            }
        }
        _ => (spec, None),
    }
}

/// Whether a URL or path points at a supported archive format
pub fn is_archive_path(value: &str) -> bool {
    let path = value.split(['?', '#']).next().unwrap_or(value).to_lowercase();
    [".zip", ".tar", ".tar.gz", ".tgz", ".tar.bz2", ".tbz2", ".tar.xz", ".txz"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

fn require_non_empty(kind: SourceKind, field: &str, value: &str) -> Result<(), AcquisitionError> {
    if value.trim().is_empty() {
        return Err(AcquisitionError::invalid_source(
            kind,
            format!("{} is empty", field),
        ));
    }
    Ok(())
}

fn validate_auth(kind: SourceKind, auth: Option<&SourceAuth>) -> Result<(), AcquisitionError> {
    match auth {
        Some(auth) if !auth.is_usable() => Err(AcquisitionError::invalid_source(
            kind,
            "auth requires a username or a token",
        )),
        _ => Ok(()),
    }
}
