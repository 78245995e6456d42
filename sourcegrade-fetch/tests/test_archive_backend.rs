//! Integration tests for the archive backend against a mock HTTP server

mod common;

use std::time::Duration;

use common::{entry_count, make_tar_gz};
use sourcegrade_core::domain::{SourceAuth, SourceDescriptor, SourceKind};
use sourcegrade_fetch::{ArchiveBackend, ArchiveBackendConfig, SourceBackend};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(root: &std::path::Path) -> ArchiveBackend {
    ArchiveBackend::new(ArchiveBackendConfig {
        workspace_root: root.to_path_buf(),
        timeout: Duration::from_secs(10),
        max_bytes: 1024 * 1024,
    })
    .unwrap()
}

#[tokio::test]
async fn test_download_and_extract_tarball() {
    let mock_server = MockServer::start().await;
    let body = make_tar_gz(&[("src/index.ts", "export const x = 1;"), ("package.json", "{}")]);

    Mock::given(method("GET"))
        .and(path("/releases/project.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let backend = backend(root.path());
    let descriptor =
        SourceDescriptor::archive(format!("{}/releases/project.tar.gz", mock_server.uri()));

    let workspace = backend.acquire(&descriptor).await.unwrap();

    assert_eq!(
        std::fs::read_to_string(workspace.path().join("src/index.ts")).unwrap(),
        "export const x = 1;"
    );
    // The downloaded archive itself is removed after extraction
    let leftovers: Vec<_> = std::fs::read_dir(workspace.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".sourcegrade-download"))
        .collect();
    assert!(leftovers.is_empty());

    workspace.release().await;
    assert_eq!(entry_count(root.path()), 0);
}

#[tokio::test]
async fn test_token_is_sent_as_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private.tar.gz"))
        .and(header("Authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(make_tar_gz(&[("a.js", "1")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let descriptor = SourceDescriptor::archive(format!("{}/private.tar.gz", mock_server.uri()))
        .with_auth(SourceAuth::token("s3cret"));

    let workspace = backend(root.path()).acquire(&descriptor).await.unwrap();
    assert!(workspace.path().join("a.js").is_file());
}

#[tokio::test]
async fn test_username_and_token_are_sent_as_basic() {
    let mock_server = MockServer::start().await;

    // base64("ci:s3cret")
    Mock::given(method("GET"))
        .and(path("/private.tar.gz"))
        .and(header("Authorization", "Basic Y2k6czNjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(make_tar_gz(&[("a.js", "1")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let descriptor = SourceDescriptor::archive(format!("{}/private.tar.gz", mock_server.uri()))
        .with_auth(SourceAuth::basic("ci", "s3cret"));

    assert!(backend(root.path()).acquire(&descriptor).await.is_ok());
}

#[tokio::test]
async fn test_error_status_cleans_up_directory() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/broken.tar.gz"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let descriptor = SourceDescriptor::archive(format!("{}/broken.tar.gz", mock_server.uri()));

    let err = backend(root.path()).acquire(&descriptor).await.unwrap_err();

    assert_eq!(err.code(), "ARCHIVE_DOWNLOAD_FAILED");
    assert!(err.to_string().contains("500"));
    assert_eq!(entry_count(root.path()), 0);
}

#[tokio::test]
async fn test_empty_body_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty.tar.gz"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let descriptor = SourceDescriptor::archive(format!("{}/empty.tar.gz", mock_server.uri()));

    let err = backend(root.path()).acquire(&descriptor).await.unwrap_err();
    assert!(err.to_string().contains("empty"));
    assert_eq!(entry_count(root.path()), 0);
}

#[tokio::test]
async fn test_oversized_archive_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/huge.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4096]))
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let backend = ArchiveBackend::new(ArchiveBackendConfig {
        workspace_root: root.path().to_path_buf(),
        timeout: Duration::from_secs(10),
        max_bytes: 1024,
    })
    .unwrap();
    let descriptor = SourceDescriptor::archive(format!("{}/huge.tar.gz", mock_server.uri()));

    let err = backend.acquire(&descriptor).await.unwrap_err();
    assert_eq!(err.code(), "ARCHIVE_DOWNLOAD_FAILED");
    assert_eq!(entry_count(root.path()), 0);
}

#[tokio::test]
async fn test_non_http_url_is_invalid_source() {
    let root = tempfile::tempdir().unwrap();
    let err = backend(root.path())
        .acquire(&SourceDescriptor::archive("ftp://example.com/a.tar.gz"))
        .await
        .unwrap_err();

    assert!(err.is_invalid_source());
    assert_eq!(entry_count(root.path()), 0);
}

#[tokio::test]
async fn test_fingerprint_uses_etag_when_available() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/tagged.tar.gz"))
        .respond_with(ResponseTemplate::new(200).insert_header("ETag", "\"abc123\""))
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let url = format!("{}/tagged.tar.gz", mock_server.uri());
    let fingerprint = backend(root.path())
        .fingerprint(&SourceDescriptor::archive(&url), root.path())
        .await
        .unwrap();

    assert_eq!(fingerprint.kind, SourceKind::Archive);
    assert_eq!(fingerprint.version, format!("{}#\"abc123\"", url));
}

#[tokio::test]
async fn test_fingerprint_falls_back_to_timestamp() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(405))
        .mount(&mock_server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let url = format!("{}/untagged.tar.gz", mock_server.uri());
    let fingerprint = backend(root.path())
        .fingerprint(&SourceDescriptor::archive(&url), root.path())
        .await
        .unwrap();

    let suffix = fingerprint
        .version
        .strip_prefix(&format!("{}:", url))
        .unwrap();
    assert!(suffix.parse::<i64>().is_ok());
}
