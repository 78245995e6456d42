//! Integration tests for the registry backend

mod common;

use std::time::Duration;

use common::entry_count;
use serde_json::json;
use sourcegrade_core::domain::{SourceDescriptor, SourceKind};
use sourcegrade_fetch::{RegistryBackend, RegistryBackendConfig, SourceBackend};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(root: &std::path::Path, registry_url: &str, tool: &str) -> RegistryBackend {
    RegistryBackend::new(RegistryBackendConfig {
        workspace_root: root.to_path_buf(),
        registry_url: registry_url.to_string(),
        tool: tool.to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_fingerprint_uses_explicit_version() {
    let root = tempfile::tempdir().unwrap();
    let backend = backend(root.path(), "http://127.0.0.1:1", "npm");

    let fingerprint = backend
        .fingerprint(
            &SourceDescriptor::registry("left-pad", Some("1.3.0".into())),
            root.path(),
        )
        .await
        .unwrap();

    assert_eq!(fingerprint.kind, SourceKind::Registry);
    assert_eq!(fingerprint.version, "left-pad@1.3.0");
}

#[tokio::test]
async fn test_fingerprint_resolves_latest_version() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/left-pad/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "left-pad",
            "version": "1.3.0"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let backend = backend(root.path(), &mock_server.uri(), "npm");

    let fingerprint = backend
        .fingerprint(&SourceDescriptor::registry("left-pad", None), root.path())
        .await
        .unwrap();

    assert_eq!(fingerprint.version, "left-pad@1.3.0");
}

#[tokio::test]
async fn test_fingerprint_falls_back_when_registry_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let backend = backend(root.path(), &mock_server.uri(), "npm");

    let fingerprint = backend
        .fingerprint(&SourceDescriptor::registry("ghost-pkg", None), root.path())
        .await
        .unwrap();

    let suffix = fingerprint.version.strip_prefix("ghost-pkg:").unwrap();
    assert!(suffix.parse::<i64>().is_ok());
}

#[tokio::test]
async fn test_missing_tool_fails_and_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let backend = backend(
        root.path(),
        "http://127.0.0.1:1",
        "sourcegrade-no-such-packaging-tool",
    );

    let err = backend
        .acquire(&SourceDescriptor::registry("left-pad", Some("1.3.0".into())))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "REGISTRY_DOWNLOAD_FAILED");
    assert!(err.to_string().contains("left-pad@1.3.0"));
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(entry_count(root.path()), 0);
}

/// Packaging tool that replaces its destination directory with a plain file
/// and fails, so the backend's cleanup cannot remove it
#[cfg(unix)]
fn failing_pack_tool(dir: &std::path::Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let tool = dir.join("fake-pack");
    std::fs::write(
        &tool,
        "#!/bin/sh\nrm -rf \"$4\"\necho locked > \"$4\"\necho 'registry unreachable' >&2\nexit 1\n",
    )
    .unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();
    tool
}

#[cfg(unix)]
#[tokio::test]
async fn test_cleanup_failure_keeps_original_error() {
    let tools = tempfile::tempdir().unwrap();
    let tool = failing_pack_tool(tools.path());
    let root = tempfile::tempdir().unwrap();
    let backend = backend(root.path(), "http://127.0.0.1:1", tool.to_str().unwrap());

    let err = backend
        .acquire(&SourceDescriptor::registry("left-pad", Some("1.3.0".into())))
        .await
        .unwrap_err();

    assert_eq!(err.code(), "REGISTRY_DOWNLOAD_FAILED");
    assert_eq!(err.source_kind(), Some(SourceKind::Registry));
    assert!(err.to_string().contains("registry unreachable"));
    // The leftover is a file where the directory was; discard could not remove it
    assert_eq!(entry_count(root.path()), 1);
}
