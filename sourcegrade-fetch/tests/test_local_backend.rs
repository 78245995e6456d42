//! Integration tests for the local copy backend

mod common;

use common::entry_count;
use sourcegrade_core::domain::{SourceDescriptor, SourceKind};
use sourcegrade_fetch::{LocalBackend, SourceBackend};

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("package.json"), r#"{"name":"demo"}"#).unwrap();
    std::fs::write(dir.path().join("src/main.ts"), "console.log(1);").unwrap();
    dir
}

#[tokio::test]
async fn test_copies_tree_and_leaves_original_intact() {
    let source = project();
    let root = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new(root.path());

    let workspace = backend
        .acquire(&SourceDescriptor::local(source.path()))
        .await
        .unwrap();

    assert_ne!(workspace.path(), source.path());
    assert!(workspace.path().starts_with(root.path()));
    assert_eq!(
        std::fs::read_to_string(workspace.path().join("src/main.ts")).unwrap(),
        "console.log(1);"
    );

    workspace.release().await;
    workspace.release().await;

    assert!(!workspace.path().exists());
    assert!(source.path().join("src/main.ts").is_file());
}

#[tokio::test]
async fn test_concurrent_acquisitions_get_distinct_directories() {
    let source = project();
    let root = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new(root.path());
    let descriptor = SourceDescriptor::local(source.path());

    let (a, b) = tokio::join!(backend.acquire(&descriptor), backend.acquire(&descriptor));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.path(), b.path());
    assert!(a.path().join("package.json").is_file());
    assert!(b.path().join("package.json").is_file());

    a.release().await;
    assert!(b.path().join("package.json").is_file());
    b.release().await;
    assert_eq!(entry_count(root.path()), 0);
}

#[tokio::test]
async fn test_missing_path_is_invalid_source() {
    let root = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new(root.path());

    let err = backend
        .acquire(&SourceDescriptor::local(root.path().join("does-not-exist")))
        .await
        .unwrap_err();

    assert!(err.is_invalid_source());
    assert_eq!(err.source_kind(), Some(SourceKind::Local));
    assert_eq!(entry_count(root.path()), 0);
}

#[tokio::test]
async fn test_fingerprint_is_path_and_mtime() {
    let source = project();
    let root = tempfile::tempdir().unwrap();
    let backend = LocalBackend::new(root.path());
    let descriptor = SourceDescriptor::local(source.path());

    let first = backend.fingerprint(&descriptor, root.path()).await.unwrap();
    let second = backend.fingerprint(&descriptor, root.path()).await.unwrap();

    assert_eq!(first.kind, SourceKind::Local);
    assert!(first.version.starts_with(&format!("{}:", source.path().display())));
    // Unchanged tree, unchanged key
    assert_eq!(first.version, second.version);
}

#[tokio::test]
async fn test_source_containing_workspace_root_is_not_copied_into_itself() {
    let source = project();
    let root = source.path().join(".sourcegrade");
    let backend = LocalBackend::new(&root);

    let workspace = backend
        .acquire(&SourceDescriptor::local(source.path()))
        .await
        .unwrap();

    assert!(workspace.path().starts_with(&root));
    assert!(workspace.path().join("src/main.ts").is_file());
    assert!(!workspace.path().join(".sourcegrade").exists());

    workspace.release().await;
    assert_eq!(entry_count(&root), 0);
}
