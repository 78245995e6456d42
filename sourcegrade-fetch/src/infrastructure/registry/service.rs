//! Package registry backend (npm)

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use sourcegrade_core::application::AcquisitionError;
use sourcegrade_core::config::FetchConfig;
use sourcegrade_core::domain::{
    ReleaseHandle, SourceDescriptor, SourceFingerprint, SourceKind, SourceOrigin, Workspace,
};
use tokio::process::Command;
use tracing::{debug, info};

use crate::domain::SourceBackend;
use crate::infrastructure::extract::{self, ArchiveFormat};
use crate::infrastructure::timestamp_millis;
use crate::infrastructure::workspace_dir::WorkspaceAllocator;

/// Directory npm tarballs unpack into
const PACKAGE_DIR: &str = "package";

/// Configuration for the registry backend
#[derive(Debug, Clone)]
pub struct RegistryBackendConfig {
    pub workspace_root: PathBuf,
    /// Registry base URL, also passed to the packaging tool
    pub registry_url: String,
    /// Packaging tool binary
    pub tool: String,
    /// Timeout for version resolution requests
    pub timeout: Duration,
}

impl Default for RegistryBackendConfig {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RegistryBackendConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            workspace_root: config.workspace_root(),
            registry_url: config.registry_url.clone(),
            tool: config.registry_tool.clone(),
            timeout: config.http_timeout(),
        }
    }
}

/// Fetches packages through the registry's packaging tool
#[derive(Debug)]
pub struct RegistryBackend {
    client: Client,
    allocator: WorkspaceAllocator,
    config: RegistryBackendConfig,
}

impl RegistryBackend {
    pub fn new(config: RegistryBackendConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            allocator: WorkspaceAllocator::new(&config.workspace_root),
            config,
        })
    }

    /// Download, unpack and return the nested package directory
    async fn fetch_package(&self, spec: &str, target: &Path) -> Result<PathBuf, AcquisitionError> {
        let output = Command::new(&self.config.tool)
            .arg("pack")
            .arg(spec)
            .arg("--pack-destination")
            .arg(target)
            .arg("--registry")
            .arg(&self.config.registry_url)
            .current_dir(target)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                AcquisitionError::registry_download_failed(
                    spec,
                    format!("failed to run {}", self.config.tool),
                )
                .caused_by(e)
            })?;

        if !output.status.success() {
            return Err(AcquisitionError::registry_download_failed(
                spec,
                format!(
                    "{} pack exited with {}: {}",
                    self.config.tool,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        let tarball = find_tarball(target).await.map_err(|e| {
            AcquisitionError::registry_download_failed(spec, "failed to list pack output")
                .caused_by(e)
        })?;
        let Some(tarball) = tarball else {
            return Err(AcquisitionError::registry_download_failed(
                spec,
                "packaging tool produced no tarball",
            ));
        };
        debug!(tarball = %tarball.display(), "Package tarball fetched");

        extract::extract(&tarball, ArchiveFormat::TarGz, target)
            .await
            .map_err(|e| {
                AcquisitionError::registry_download_failed(spec, "extraction failed").caused_by(e)
            })?;

        tokio::fs::remove_file(&tarball).await.map_err(|e| {
            AcquisitionError::registry_download_failed(spec, "failed to remove tarball")
                .caused_by(e)
        })?;

        let package_dir = target.join(PACKAGE_DIR);
        if !tokio::fs::metadata(&package_dir)
            .await
            .is_ok_and(|m| m.is_dir())
        {
            return Err(AcquisitionError::registry_download_failed(
                spec,
                "tarball has no package/ directory",
            ));
        }
        Ok(package_dir)
    }

    /// `GET <registry>/<name>/latest` and read its `version`
    pub async fn resolve_latest_version(&self, name: &str) -> Option<String> {
        let url = format!(
            "{}/{}/latest",
            self.config.registry_url.trim_end_matches('/'),
            name.replace('/', "%2F")
        );

        let response = match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!(package = name, status = %response.status(), "Registry lookup rejected");
                return None;
            }
            Err(e) => {
                debug!(package = name, error = %e, "Registry lookup failed");
                return None;
            }
        };

        let body: serde_json::Value = response.json().await.ok()?;
        body.get("version")
            .and_then(|v| v.as_str())
            .map(str::to_string)
    }
}

#[async_trait]
impl SourceBackend for RegistryBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Registry
    }

    async fn acquire(&self, descriptor: &SourceDescriptor) -> Result<Workspace, AcquisitionError> {
        let SourceOrigin::Registry { .. } = &descriptor.origin else {
            return Err(AcquisitionError::invalid_source(
                descriptor.kind(),
                "registry backend only accepts registry sources",
            ));
        };
        let spec = descriptor.location();

        let target = self
            .allocator
            .allocate(SourceKind::Registry)
            .await
            .map_err(|e| {
                AcquisitionError::registry_download_failed(
                    &spec,
                    "failed to create download directory",
                )
                .caused_by(e)
            })?;

        info!(
            package = %spec,
            tool = %self.config.tool,
            path = %target.display(),
            "Fetching package"
        );

        match self.fetch_package(&spec, &target).await {
            Ok(package_dir) => {
                info!(package = %spec, path = %package_dir.display(), "Package unpacked");
                Ok(Workspace::new(package_dir, ReleaseHandle::new(&target)))
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
        let SourceOrigin::Registry {
            package_name,
            version,
        } = &descriptor.origin
        else {
            return None;
        };

        let version = match version {
            Some(v) => Some(v.clone()),
            None => self.resolve_latest_version(package_name).await,
        };
        let key = match version {
            Some(v) => format!("{}@{}", package_name, v),
            None => format!("{}:{}", package_name, timestamp_millis()),
        };
        Some(SourceFingerprint::new(SourceKind::Registry, key))
    }
}

async fn find_tarball(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tgz") {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
