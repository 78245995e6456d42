//! Archive-over-HTTP backend

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::StreamExt;
use reqwest::{Client, header};
use sourcegrade_core::application::AcquisitionError;
use sourcegrade_core::config::FetchConfig;
use sourcegrade_core::domain::{
    ReleaseHandle, SourceAuth, SourceDescriptor, SourceFingerprint, SourceKind, SourceOrigin,
    Workspace,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::domain::SourceBackend;
use crate::infrastructure::extract::{self, ArchiveFormat};
use crate::infrastructure::timestamp_millis;
use crate::infrastructure::workspace_dir::WorkspaceAllocator;

/// Name of the downloaded file inside the acquisition directory
const DOWNLOAD_STEM: &str = ".sourcegrade-download";

/// Configuration for the archive backend
#[derive(Debug, Clone)]
pub struct ArchiveBackendConfig {
    pub workspace_root: PathBuf,
    /// Whole-request timeout
    pub timeout: Duration,
    /// Maximum body size in bytes (safety limit)
    pub max_bytes: u64,
}

impl Default for ArchiveBackendConfig {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for ArchiveBackendConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            workspace_root: config.workspace_root(),
            timeout: config.http_timeout(),
            max_bytes: config.max_archive_bytes,
        }
    }
}

/// Downloads an archive over HTTP(S) and extracts it into a fresh directory
#[derive(Debug)]
pub struct ArchiveBackend {
    client: Client,
    allocator: WorkspaceAllocator,
    config: ArchiveBackendConfig,
}

/// Cache validators reported by the server
#[derive(Debug, Default)]
struct Validators {
    etag: Option<String>,
    last_modified: Option<String>,
}

impl ArchiveBackend {
    pub fn new(config: ArchiveBackendConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            allocator: WorkspaceAllocator::new(&config.workspace_root),
            config,
        })
    }

    async fn download_and_extract(
        &self,
        url: &url::Url,
        auth: Option<&SourceAuth>,
        target: &Path,
    ) -> Result<(), AcquisitionError> {
        let location = url.as_str();
        let mut request = self.client.get(url.clone());
        if let Some(value) = auth.and_then(authorization_header) {
            request = request.header(header::AUTHORIZATION, value);
        }

        let response = request.send().await.map_err(|e| {
            AcquisitionError::archive_download_failed(location, "request failed").caused_by(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::archive_download_failed(
                location,
                format!("server responded with {}", status),
            ));
        }

        let format_hint = ArchiveFormat::from_name(url.path());
        let file_name = match format_hint {
            Some(format) => format!("{}.{}", DOWNLOAD_STEM, format.extension()),
            None => DOWNLOAD_STEM.to_string(),
        };
        let archive_path = target.join(file_name);

        let bytes = self.stream_to_file(response, &archive_path, location).await?;
        if bytes == 0 {
            return Err(AcquisitionError::archive_download_failed(
                location,
                "response body is empty",
            ));
        }
        debug!(url = %location, bytes = bytes, "Archive downloaded");

        let format = match format_hint {
            Some(format) => format,
            None => ArchiveFormat::detect(&archive_path).await.map_err(|e| {
                AcquisitionError::archive_download_failed(location, e.to_string()).caused_by(e)
            })?,
        };

        extract::extract(&archive_path, format, target)
            .await
            .map_err(|e| {
                AcquisitionError::archive_download_failed(location, "extraction failed")
                    .caused_by(e)
            })?;

        tokio::fs::remove_file(&archive_path).await.map_err(|e| {
            AcquisitionError::archive_download_failed(location, "failed to remove archive file")
                .caused_by(e)
        })?;

        Ok(())
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        path: &Path,
        location: &str,
    ) -> Result<u64, AcquisitionError> {
        let io_error = |e: std::io::Error| {
            AcquisitionError::archive_download_failed(location, "failed to write archive")
                .caused_by(e)
        };

        if let Some(length) = response.content_length()
            && length > self.config.max_bytes
        {
            return Err(AcquisitionError::archive_download_failed(
                location,
                format!(
                    "archive is {} bytes, limit is {}",
                    length, self.config.max_bytes
                ),
            ));
        }

        let mut file = tokio::fs::File::create(path).await.map_err(io_error)?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AcquisitionError::archive_download_failed(location, "download interrupted")
                    .caused_by(e)
            })?;
            written += chunk.len() as u64;
            if written > self.config.max_bytes {
                warn!(url = %location, max = self.config.max_bytes, "Archive exceeds size limit");
                return Err(AcquisitionError::archive_download_failed(
                    location,
                    format!("archive exceeds {} bytes", self.config.max_bytes),
                ));
            }
            file.write_all(&chunk).await.map_err(io_error)?;
        }

        file.flush().await.map_err(io_error)?;
        Ok(written)
    }

    async fn probe_validators(&self, url: &str, auth: Option<&SourceAuth>) -> Validators {
        let mut request = self.client.head(url);
        if let Some(value) = auth.and_then(authorization_header) {
            request = request.header(header::AUTHORIZATION, value);
        }
        match request.send().await {
            Ok(response) if response.status().is_success() => Validators {
                etag: header_value(response.headers(), header::ETAG),
                last_modified: header_value(response.headers(), header::LAST_MODIFIED),
            },
            Ok(response) => {
                debug!(url = %url, status = %response.status(), "HEAD probe rejected");
                Validators::default()
            }
            Err(e) => {
                debug!(url = %url, error = %e, "HEAD probe failed");
                Validators::default()
            }
        }
    }
}

#[async_trait]
impl SourceBackend for ArchiveBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::Archive
    }

    async fn acquire(&self, descriptor: &SourceDescriptor) -> Result<Workspace, AcquisitionError> {
        let SourceOrigin::Archive { url, auth } = &descriptor.origin else {
            return Err(AcquisitionError::invalid_source(
                descriptor.kind(),
                "archive backend only accepts archive sources",
            ));
        };
        let parsed = parse_http_url(url)?;

        let target = self
            .allocator
            .allocate(SourceKind::Archive)
            .await
            .map_err(|e| {
                AcquisitionError::archive_download_failed(
                    url,
                    "failed to create download directory",
                )
                .caused_by(e)
            })?;

        info!(url = %url, path = %target.display(), "Starting archive download");

        if let Err(e) = self
            .download_and_extract(&parsed, auth.as_ref(), &target)
            .await
        {
            self.allocator.discard(&target).await;
            return Err(e);
        }

        info!(url = %url, path = %target.display(), "Archive extracted");
        Ok(Workspace::new(&target, ReleaseHandle::new(&target)))
    }

    async fn fingerprint(
        &self,
        descriptor: &SourceDescriptor,
        _workspace: &Path,
    ) -> Option<SourceFingerprint> {
        let SourceOrigin::Archive { url, auth } = &descriptor.origin else {
            return None;
        };

        let validators = self.probe_validators(url, auth.as_ref()).await;
        let version = match (&validators.etag, &validators.last_modified) {
            (Some(etag), _) => format!("{}#{}", url, etag),
            (None, Some(modified)) => format!("{}#{}", url, modified),
            (None, None) => format!("{}:{}", url, timestamp_millis()),
        };
        Some(SourceFingerprint::new(SourceKind::Archive, version))
    }
}

/// `Authorization` header value for archive credentials.
///
/// Username and token give `Basic base64(user:token)`, a token alone gives
/// `Bearer token`, anything else gives no header.
pub fn authorization_header(auth: &SourceAuth) -> Option<String> {
    match (auth.username(), auth.secret()) {
        (Some(user), Some(token)) => Some(format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", user, token))
        )),
        (None, Some(token)) => Some(format!("Bearer {}", token)),
        _ => None,
    }
}

fn parse_http_url(url: &str) -> Result<url::Url, AcquisitionError> {
    let parsed = url::Url::parse(url).map_err(|e| {
        AcquisitionError::invalid_source(SourceKind::Archive, format!("invalid URL {}: {}", url, e))
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(AcquisitionError::invalid_source(
            SourceKind::Archive,
            format!("unsupported archive URL scheme: {}", other),
        )),
    }
}

fn header_value(headers: &header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
