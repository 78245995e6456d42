use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, FetchOptions, RemoteCallbacks, Repository, opts};
use sourcegrade_core::application::AcquisitionError;
use sourcegrade_core::config::FetchConfig;
use sourcegrade_core::domain::{
    DEFAULT_CLONE_DEPTH, ReleaseHandle, SourceAuth, SourceDescriptor, SourceFingerprint,
    SourceKind, SourceOrigin, Workspace,
};
use tracing::{debug, info};

use crate::domain::SourceBackend;
use crate::infrastructure::timestamp_millis;
use crate::infrastructure::workspace_dir::WorkspaceAllocator;

/// libgit2 gives up after this many rejected credential attempts
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Configuration for the Git backend.
#[derive(Debug, Clone)]
pub struct GitBackendConfig {
    /// Parent directory for checkouts
    pub workspace_root: PathBuf,
    /// Depth used when the descriptor does not set one
    pub default_depth: u32,
    /// Timeout applied to network fetches (passed down to libgit2)
    pub fetch_timeout: Duration,
}

impl Default for GitBackendConfig {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for GitBackendConfig {
    fn from(config: &FetchConfig) -> Self {
        Self {
            workspace_root: config.workspace_root(),
            default_depth: config.default_clone_depth.max(DEFAULT_CLONE_DEPTH),
            fetch_timeout: config.git_fetch_timeout(),
        }
    }
}

/// Clones version-control sources into fresh acquisition directories
#[derive(Debug)]
pub struct GitBackend {
    allocator: WorkspaceAllocator,
    config: GitBackendConfig,
}

/// Everything the blocking clone needs, owned so it can cross `spawn_blocking`
struct CloneRequest {
    url: String,
    reference: Option<String>,
    depth: u32,
    credentials: Option<(String, Option<String>)>,
}

impl GitBackend {
    pub fn new(config: GitBackendConfig) -> Self {
        Self {
            allocator: WorkspaceAllocator::new(&config.workspace_root),
            config,
        }
    }

    async fn clone_into(
        &self,
        destination: &Path,
        request: CloneRequest,
    ) -> Result<(), AcquisitionError> {
        let location = redact(&request.url);
        let destination = destination.to_path_buf();

        Self::configure_git_timeouts(self.config.fetch_timeout).map_err(|e| {
            AcquisitionError::clone_failed(&location, "failed to configure git timeouts")
                .caused_by(e)
        })?;

        tokio::task::spawn_blocking(move || Self::perform_clone(&destination, &request))
            .await
            .map_err(|e| {
                AcquisitionError::clone_failed(&location, "clone task failed").caused_by(e)
            })?
    }

    fn perform_clone(destination: &Path, request: &CloneRequest) -> Result<(), AcquisitionError> {
        let redacted = redact(&request.url);
        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options(request.credentials.clone(), request.depth));

        let repo = builder.clone(&request.url, destination).map_err(|e| {
            AcquisitionError::clone_failed(&redacted, e.message().to_string()).caused_by(e)
        })?;

        if let Some(reference) = &request.reference {
            checkout_ref(&repo, reference, request).map_err(|e| {
                AcquisitionError::clone_failed(
                    &redacted,
                    format!("failed to check out {}: {}", reference, e.message()),
                )
                .caused_by(e)
            })?;
        }

        Ok(())
    }

    fn configure_git_timeouts(fetch_timeout: Duration) -> Result<(), git2::Error> {
        let timeout_ms = fetch_timeout.as_millis().clamp(1, i32::MAX as u128) as i32;
        unsafe {
            opts::set_server_connect_timeout_in_milliseconds(timeout_ms)?;
            opts::set_server_timeout_in_milliseconds(timeout_ms)?;
        }
        Ok(())
    }

    fn head_commit(path: &Path) -> Option<String> {
        let repo = Repository::open(path).ok()?;
        let head = repo.head().ok()?;
        head.target().map(|oid| oid.to_string())
    }
}

#[async_trait]
impl SourceBackend for GitBackend {
    fn kind(&self) -> SourceKind {
        SourceKind::VersionControl
    }

    async fn acquire(&self, descriptor: &SourceDescriptor) -> Result<Workspace, AcquisitionError> {
        let SourceOrigin::VersionControl {
            url,
            reference,
            depth,
            auth,
        } = &descriptor.origin
        else {
            return Err(AcquisitionError::invalid_source(
                descriptor.kind(),
                "git backend only accepts version_control sources",
            ));
        };

        if !is_supported_url(url) {
            return Err(AcquisitionError::invalid_source(
                SourceKind::VersionControl,
                format!(
                    "unsupported git URL scheme for {}; \
                     use https://, ssh://, git+ssh:// or user@host:path",
                    redact(url)
                ),
            ));
        }

        // Credentials go on a copy; the caller's descriptor is never touched
        let clone_url = authenticated_url(url, auth.as_ref())?;
        let request = CloneRequest {
            url: clone_url,
            reference: reference.clone(),
            depth: depth.unwrap_or(self.config.default_depth),
            credentials: auth.as_ref().and_then(credential_pair),
        };

        let target = self
            .allocator
            .allocate(SourceKind::VersionControl)
            .await
            .map_err(|e| {
                AcquisitionError::clone_failed(redact(url), "failed to create checkout directory")
                    .caused_by(e)
            })?;

        info!(
            repository = %redact(url),
            reference = ?reference,
            depth = request.depth,
            path = %target.display(),
            "Starting Git clone"
        );

        if let Err(e) = self.clone_into(&target, request).await {
            self.allocator.discard(&target).await;
            return Err(e);
        }

        debug!(path = %target.display(), "Git clone completed");
        Ok(Workspace::new(&target, ReleaseHandle::new(&target)))
    }

    async fn fingerprint(
        &self,
        descriptor: &SourceDescriptor,
        workspace: &Path,
    ) -> Option<SourceFingerprint> {
        let SourceOrigin::VersionControl { url, reference, .. } = &descriptor.origin else {
            return None;
        };

        let path = workspace.to_path_buf();
        let head = tokio::task::spawn_blocking(move || Self::head_commit(&path))
            .await
            .ok()
            .flatten();

        let mut fingerprint = match head {
            Some(commit) => SourceFingerprint::new(SourceKind::VersionControl, commit),
            None => {
                let base = match reference {
                    Some(r) => format!("{}:{}", redact(url), r),
                    None => redact(url),
                };
                SourceFingerprint::new(
                    SourceKind::VersionControl,
                    format!("{}:{}", base, timestamp_millis()),
                )
            }
        };
        if let Some(r) = reference {
            fingerprint = fingerprint.with_extra("ref", serde_json::Value::String(r.clone()));
        }
        Some(fingerprint)
    }
}

/// Whether a URL uses a secure or SSH-style transport
pub fn is_supported_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    if lower.starts_with("https://")
        || lower.starts_with("ssh://")
        || lower.starts_with("git+ssh://")
    {
        return true;
    }
    is_scp_like(url)
}

/// `user@host:path`, with no scheme separator
fn is_scp_like(url: &str) -> bool {
    if url.contains("://") {
        return false;
    }
    match (url.find('@'), url.find(':')) {
        (Some(at), Some(colon)) => at > 0 && colon > at + 1 && colon + 1 < url.len(),
        _ => false,
    }
}

/// Embed credentials into a copy of an HTTPS clone URL.
///
/// A token alone becomes the URL username; username and token become
/// `user:token`. SSH-style URLs are returned unchanged.
pub fn authenticated_url(url: &str, auth: Option<&SourceAuth>) -> Result<String, AcquisitionError> {
    let Some(auth) = auth else {
        return Ok(url.to_string());
    };
    if !url.to_lowercase().starts_with("https://") {
        return Ok(url.to_string());
    }

    let mut parsed = url::Url::parse(url).map_err(|e| {
        AcquisitionError::invalid_source(SourceKind::VersionControl, format!("invalid URL: {}", e))
    })?;

    let embed = match (auth.username(), auth.secret()) {
        (Some(user), Some(token)) => parsed
            .set_username(user)
            .and_then(|_| parsed.set_password(Some(token))),
        (None, Some(token)) => parsed.set_username(token),
        (Some(user), None) => parsed.set_username(user),
        (None, None) => Ok(()),
    };
    embed.map_err(|_| {
        AcquisitionError::invalid_source(
            SourceKind::VersionControl,
            "URL cannot carry credentials",
        )
    })?;

    Ok(parsed.to_string())
}

fn credential_pair(auth: &SourceAuth) -> Option<(String, Option<String>)> {
    match (auth.username(), auth.secret()) {
        (Some(user), token) => Some((user.to_string(), token.map(str::to_string))),
        (None, Some(token)) => Some((token.to_string(), None)),
        (None, None) => None,
    }
}

/// Strip userinfo before a URL reaches logs or error messages
fn redact(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if !parsed.username().is_empty() || parsed.password().is_some() => {
            let _ = parsed.set_username("");
            let _ = parsed.set_password(None);
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

fn fetch_options(
    credentials: Option<(String, Option<String>)>,
    depth: u32,
) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0usize;
    callbacks.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication rejected"));
        }

        if allowed.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
            if let Some((user, password)) = &credentials {
                return Cred::userpass_plaintext(user, password.as_deref().unwrap_or(""));
            }
        }
        if allowed.contains(git2::CredentialType::SSH_KEY) {
            let user = username_from_url
                .or(credentials.as_ref().map(|(u, _)| u.as_str()))
                .unwrap_or("git");
            return Cred::ssh_key_from_agent(user);
        }
        Cred::default()
    });

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);
    fetch_options.download_tags(git2::AutotagOption::None);
    fetch_options.update_fetchhead(true);
    fetch_options.proxy_options(git2::ProxyOptions::new());
    fetch_options.depth(depth.min(i32::MAX as u32) as i32);
    fetch_options
}

/// Check out `reference` as a detached HEAD, fetching it when the shallow
/// clone does not contain it
fn checkout_ref(
    repo: &Repository,
    reference: &str,
    request: &CloneRequest,
) -> Result<(), git2::Error> {
    let object = match repo
        .revparse_single(reference)
        .or_else(|_| repo.revparse_single(&format!("origin/{}", reference)))
    {
        Ok(object) => object,
        Err(_) => {
            debug!(reference = reference, "Ref not in shallow clone, fetching explicitly");
            let mut remote = repo.find_remote("origin")?;
            let mut options = fetch_options(request.credentials.clone(), request.depth);
            remote.fetch(&[reference], Some(&mut options), None)?;
            repo.find_reference("FETCH_HEAD")?.peel(git2::ObjectType::Commit)?
        }
    };

    let commit = object.peel_to_commit()?;
    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))?;
    repo.set_head_detached(commit.id())?;
    Ok(())
}
