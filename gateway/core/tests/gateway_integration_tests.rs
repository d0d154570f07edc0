// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for the client administration service and the file
//! operation gateway.
//!
//! These tests verify:
//! 1. Path containment for every file operation
//! 2. Quota ledger accounting across uploads, overwrites and deletes
//! 3. Client lifecycle on disk (create, rename, delete) and its rollbacks
//! 4. Per-client serialisation of file operations against each other and
//!    against admin rename/delete of the client
//!
//! The free-space probe is a fixed-capacity mock; storage lives in a
//! temporary directory.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use strongbox_core::application::client_service::{ClientService, StandardClientService};
use strongbox_core::application::error::GatewayError;
use strongbox_core::application::file_gateway::{FileGateway, StandardFileGateway};
use strongbox_core::application::quota_ledger::QuotaLedger;
use strongbox_core::application::tenant_locks::TenantLocks;
use strongbox_core::domain::client::{Client, ClientId, NewClient};
use strongbox_core::domain::repository::{ClientRepository, RepositoryError, SummableField};
use strongbox_core::domain::space_probe::{ProbeError, SpaceProbe};
use strongbox_core::infrastructure::repositories::InMemoryClientRepository;
use tempfile::TempDir;

// Mock space probe with a fixed capacity
struct FixedProbe(u64);

impl SpaceProbe for FixedProbe {
    fn available_bytes(&self, _root: &Path) -> Result<u64, ProbeError> {
        Ok(self.0)
    }
}

// Repository whose updates can be switched to fail
struct FlakyRepository {
    inner: InMemoryClientRepository,
    fail_updates: AtomicBool,
}

impl FlakyRepository {
    fn new() -> Self {
        Self {
            inner: InMemoryClientRepository::new(),
            fail_updates: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl ClientRepository for FlakyRepository {
    async fn create(&self, client: NewClient) -> Result<Client, RepositoryError> {
        self.inner.create(client).await
    }

    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_auth_code(&self, auth_code: &str) -> Result<Option<Client>, RepositoryError> {
        self.inner.find_by_auth_code(auth_code).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Client>, RepositoryError> {
        self.inner.find_by_name(name).await
    }

    async fn list_all(&self) -> Result<Vec<Client>, RepositoryError> {
        self.inner.list_all().await
    }

    async fn update(&self, client: &Client) -> Result<(), RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database("simulated write failure".to_string()));
        }
        self.inner.update(client).await
    }

    async fn delete(&self, id: ClientId) -> Result<(), RepositoryError> {
        self.inner.delete(id).await
    }

    async fn sum_by(&self, field: SummableField) -> Result<u64, RepositoryError> {
        self.inner.sum_by(field).await
    }
}

struct Harness {
    _tmp: TempDir,
    root: std::path::PathBuf,
    repo: Arc<FlakyRepository>,
    locks: Arc<TenantLocks>,
    clients: StandardClientService,
    files: StandardFileGateway,
}

impl Harness {
    fn new(capacity: u64) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("storages");
        std::fs::create_dir_all(&root).unwrap();
        Self::at(tmp, root, capacity)
    }

    fn at(tmp: TempDir, root: std::path::PathBuf, capacity: u64) -> Self {
        let repo = Arc::new(FlakyRepository::new());
        let locks = Arc::new(TenantLocks::new());
        let ledger = Arc::new(QuotaLedger::new(
            Arc::new(FixedProbe(capacity)),
            repo.clone(),
            root.clone(),
        ));
        let clients = StandardClientService::new(repo.clone(), ledger, locks.clone());
        let files = StandardFileGateway::new(repo.clone(), locks.clone(), root.clone());
        Self {
            _tmp: tmp,
            root,
            repo,
            locks,
            clients,
            files,
        }
    }

    async fn used(&self, id: ClientId) -> u64 {
        self.clients.get_client(id).await.unwrap().used_space
    }
}

#[tokio::test]
async fn test_client_names_with_parent_token_are_rejected() {
    let h = Harness::new(1_000_000);

    for bad in ["..", "../escape", "a..b", "a/b", ""] {
        let result = h.clients.create_client(bad.to_string(), 10).await;
        assert!(
            matches!(result, Err(GatewayError::InvalidName(_))),
            "expected {bad:?} to be rejected, got {result:?}"
        );
    }
    assert!(h.clients.list_clients().await.unwrap().is_empty());
    assert!(!h.root.parent().unwrap().join("escape").exists());
}

#[tokio::test]
async fn test_create_provisions_directory_and_enforces_unique_names() {
    let h = Harness::new(1_000);
    let alice = h.clients.create_client("alice".into(), 400).await.unwrap();
    assert!(h.root.join("alice").is_dir());
    assert_eq!(alice.used_space, 0);
    assert_eq!(alice.auth_code.len(), 64);

    let dup = h.clients.create_client("alice".into(), 1).await;
    assert!(matches!(dup, Err(GatewayError::NameConflict(_))));
}

#[tokio::test]
async fn test_global_reservation_is_bounded_by_free_space() {
    let h = Harness::new(1_000);
    h.clients.create_client("a".into(), 600).await.unwrap();
    h.clients.create_client("b".into(), 400).await.unwrap();

    let over = h.clients.create_client("c".into(), 1).await;
    assert!(matches!(over, Err(GatewayError::QuotaExceeded { .. })));
    assert_eq!(h.clients.total_quota().await.unwrap(), 1_000);
    assert_eq!(h.clients.storage_size().await.unwrap(), 1_000);
}

#[tokio::test]
async fn test_create_rolls_back_record_when_directory_fails() {
    let tmp = tempfile::tempdir().unwrap();
    // The storage root is a regular file, so no client directory can be made
    let root = tmp.path().join("not-a-dir");
    std::fs::write(&root, b"x").unwrap();
    let h = Harness::at(tmp, root, 1_000);

    let result = h.clients.create_client("alice".into(), 10).await;
    assert!(matches!(result, Err(GatewayError::Io { .. })), "{result:?}");
    assert!(h.repo.find_by_name("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn test_path_traversal_rejected_for_every_operation() {
    let h = Harness::new(1_000_000);
    let alice = h.clients.create_client("alice".into(), 1_000).await.unwrap();
    let bob = h.clients.create_client("bob".into(), 1_000).await.unwrap();
    h.files
        .upload(&bob, "/secret", Bytes::from_static(b"bob-data"))
        .await
        .unwrap();

    for bad in ["../bob/secret", "/../bob/secret", "chunks/../../bob/secret", "..", "a..b"] {
        let up = h.files.upload(&alice, bad, Bytes::from_static(b"x")).await;
        assert!(matches!(up, Err(GatewayError::InvalidPath(_))), "upload {bad}");

        let down = h.files.download(&alice, bad).await;
        assert!(matches!(down, Err(GatewayError::InvalidPath(_))), "download {bad}");

        let stat = h.files.stat(&alice, bad).await;
        assert!(matches!(stat, Err(GatewayError::InvalidPath(_))), "stat {bad}");

        let mkdir = h.files.mkdir(&alice, bad).await;
        assert!(matches!(mkdir, Err(GatewayError::InvalidPath(_))), "mkdir {bad}");

        let del = h.files.delete_file(&alice, bad).await;
        assert!(matches!(del, Err(GatewayError::InvalidPath(_))), "delete {bad}");
    }

    // Nothing was performed
    assert_eq!(std::fs::read(h.root.join("bob").join("secret")).unwrap(), b"bob-data");
    assert_eq!(h.used(alice.id).await, 0);
}

#[tokio::test]
async fn test_absolute_paths_stay_inside_client_root() {
    let h = Harness::new(1_000_000);
    let alice = h.clients.create_client("alice".into(), 1_000).await.unwrap();

    let receipt = h
        .files
        .upload(&alice, "/etc/passwd", Bytes::from_static(b"hi"))
        .await
        .unwrap();
    assert_eq!(receipt.path, "/etc/passwd");
    assert!(h.root.join("alice").join("etc").join("passwd").is_file());
}

#[tokio::test]
async fn test_upload_overwrite_delete_scenario() {
    let h = Harness::new(10_000_000_000);
    let client = h
        .clients
        .create_client("backup".into(), 1_000_000_000)
        .await
        .unwrap();

    let first = h
        .files
        .upload(&client, "/chunks/a", Bytes::from_static(b"0123456789"))
        .await
        .unwrap();
    assert_eq!(first.delta, 10);
    assert_eq!(h.used(client.id).await, 10);

    let second = h
        .files
        .upload(&client, "/chunks/a", Bytes::from_static(b"01X34Y678Z"))
        .await
        .unwrap();
    assert_eq!(second.delta, 3);
    assert_eq!(h.used(client.id).await, 13);

    let stat = h.files.stat(&client, "chunks/a").await.unwrap();
    assert_eq!(stat.size, 10);
    assert_eq!(stat.path, "/chunks/a");

    let deleted = h.files.delete_file(&client, "/chunks/a").await.unwrap();
    assert_eq!(deleted.freed, 10);
    // Decremented by the file's size, clamped at zero
    assert_eq!(h.used(client.id).await, 3);
    assert!(!h.root.join("backup").join("chunks").join("a").exists());
}

#[tokio::test]
async fn test_upload_download_round_trip() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 1_000).await.unwrap();
    let payload: Vec<u8> = (0..=255u8).cycle().take(700).collect();

    h.files
        .upload(&client, "index/latest", Bytes::from(payload.clone()))
        .await
        .unwrap();
    assert_eq!(h.files.download(&client, "/index/latest").await.unwrap(), payload);
}

#[tokio::test]
async fn test_upload_quota_boundary() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 100).await.unwrap();
    h.files
        .upload(&client, "a", Bytes::from(vec![1u8; 40]))
        .await
        .unwrap();

    let too_big = h.files.upload(&client, "b", Bytes::from(vec![1u8; 61])).await;
    assert!(matches!(
        too_big,
        Err(GatewayError::QuotaExceeded {
            requested_bytes: 61,
            available_bytes: 60
        })
    ));
    assert!(!h.root.join("c").join("b").exists());

    h.files
        .upload(&client, "b", Bytes::from(vec![1u8; 60]))
        .await
        .unwrap();
    assert_eq!(h.used(client.id).await, 100);
}

#[tokio::test]
async fn test_empty_upload_is_rejected() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 100).await.unwrap();
    let result = h.files.upload(&client, "a", Bytes::new()).await;
    assert!(matches!(result, Err(GatewayError::EmptyUpload)));
    assert!(!h.root.join("c").join("a").exists());
}

#[tokio::test]
async fn test_used_space_is_clamped_sum_of_deltas() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 1_000).await.unwrap();

    let mut expected: u64 = 0;
    for content in [&b"aaaaaaaa"[..], b"aaaabbbbcc", b"zz", b"zzzzzzzzzzzzzzzz"] {
        let receipt = h
            .files
            .upload(&client, "blob", Bytes::copy_from_slice(content))
            .await
            .unwrap();
        expected = if receipt.delta >= 0 {
            expected + receipt.delta as u64
        } else {
            expected.saturating_sub(receipt.delta.unsigned_abs())
        };
        let used = h.used(client.id).await;
        assert_eq!(used, expected);
        assert!(used <= 1_000);
    }
}

#[tokio::test]
async fn test_resize_respects_used_space() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 100).await.unwrap();
    h.files
        .upload(&client, "a", Bytes::from(vec![7u8; 50]))
        .await
        .unwrap();

    let shrink = h.clients.update_client(client.id, "c".into(), 49).await;
    assert!(matches!(
        shrink,
        Err(GatewayError::QuotaShrinkBelowUsage {
            quota: 49,
            used_space: 50
        })
    ));

    let exact = h.clients.update_client(client.id, "c".into(), 50).await.unwrap();
    assert_eq!(exact.quota, 50);
    assert_eq!(exact.used_space, 50);
}

#[tokio::test]
async fn test_resize_is_bounded_by_free_space_plus_own_quota() {
    let h = Harness::new(1_000);
    let a = h.clients.create_client("a".into(), 300).await.unwrap();
    h.clients.create_client("b".into(), 500).await.unwrap();

    // free 1000, reserved 800, a holds 300: a may grow to 500
    assert!(h.clients.update_client(a.id, "a".into(), 500).await.is_ok());
    let over = h.clients.update_client(a.id, "a".into(), 501).await;
    assert!(matches!(over, Err(GatewayError::QuotaExceeded { .. })));
}

#[tokio::test]
async fn test_rename_moves_subtree() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("old".into(), 100).await.unwrap();
    h.files
        .upload(&client, "keep/me", Bytes::from_static(b"data"))
        .await
        .unwrap();

    let renamed = h.clients.update_client(client.id, "new".into(), 100).await.unwrap();
    assert_eq!(renamed.name, "new");
    assert!(!h.root.join("old").exists());
    assert_eq!(std::fs::read(h.root.join("new").join("keep").join("me")).unwrap(), b"data");

    // The bearer credential keeps working under the new name
    assert_eq!(h.files.download(&renamed, "keep/me").await.unwrap(), b"data");
}

#[tokio::test]
async fn test_rename_to_taken_name_conflicts() {
    let h = Harness::new(1_000_000);
    let a = h.clients.create_client("a".into(), 10).await.unwrap();
    h.clients.create_client("b".into(), 10).await.unwrap();
    let result = h.clients.update_client(a.id, "b".into(), 10).await;
    assert!(matches!(result, Err(GatewayError::NameConflict(_))));
    assert!(h.root.join("a").is_dir());
}

#[tokio::test]
async fn test_rename_is_reversed_when_persisting_fails() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("old".into(), 100).await.unwrap();

    h.repo.fail_updates.store(true, Ordering::SeqCst);
    let result = h.clients.update_client(client.id, "new".into(), 100).await;
    assert!(matches!(result, Err(GatewayError::Repository(_))));
    assert!(h.root.join("old").is_dir());
    assert!(!h.root.join("new").exists());
}

#[tokio::test]
async fn test_update_missing_client_is_not_found() {
    let h = Harness::new(1_000);
    let result = h.clients.update_client(ClientId(42), "x".into(), 1).await;
    assert!(matches!(result, Err(GatewayError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_client_removes_record_and_subtree() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("gone".into(), 100).await.unwrap();
    h.files
        .upload(&client, "deep/nested/file", Bytes::from_static(b"x"))
        .await
        .unwrap();

    h.clients.delete_client(client.id).await.unwrap();
    assert!(!h.root.join("gone").exists());
    assert!(matches!(
        h.clients.get_client(client.id).await,
        Err(GatewayError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_delete_client_tolerates_missing_subtree() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 100).await.unwrap();
    std::fs::remove_dir_all(h.root.join("c")).unwrap();
    h.clients.delete_client(client.id).await.unwrap();
    assert!(h.clients.list_clients().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mkdir_is_idempotent() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 100).await.unwrap();

    assert_eq!(h.files.mkdir(&client, "a/b/c").await.unwrap(), "/a/b/c");
    assert_eq!(h.files.mkdir(&client, "/a/b/c").await.unwrap(), "/a/b/c");
    assert!(h.root.join("c").join("a").join("b").join("c").is_dir());
    assert_eq!(h.used(client.id).await, 0);
}

#[tokio::test]
async fn test_deleting_a_directory_is_refused() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 100).await.unwrap();
    h.files
        .upload(&client, "dir/file", Bytes::from_static(b"12345"))
        .await
        .unwrap();

    let result = h.files.delete_file(&client, "dir").await;
    assert!(matches!(result, Err(GatewayError::CannotDeleteDirectory(_))));
    assert_eq!(h.used(client.id).await, 5);
    assert!(h.root.join("c").join("dir").join("file").is_file());
}

#[tokio::test]
async fn test_missing_entries_are_not_found() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 100).await.unwrap();
    h.files.mkdir(&client, "dir").await.unwrap();

    assert!(matches!(h.files.download(&client, "nope").await, Err(GatewayError::NotFound(_))));
    assert!(matches!(h.files.download(&client, "dir").await, Err(GatewayError::NotFound(_))));
    assert!(matches!(h.files.stat(&client, "nope").await, Err(GatewayError::NotFound(_))));
    assert!(matches!(h.files.delete_file(&client, "nope").await, Err(GatewayError::NotFound(_))));
}

#[tokio::test]
async fn test_failed_ledger_write_restores_previous_content() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 100).await.unwrap();
    h.files
        .upload(&client, "f", Bytes::from_static(b"original"))
        .await
        .unwrap();

    h.repo.fail_updates.store(true, Ordering::SeqCst);

    let overwrite = h.files.upload(&client, "f", Bytes::from_static(b"replaced!")).await;
    assert!(matches!(overwrite, Err(GatewayError::Repository(_))));
    assert_eq!(std::fs::read(h.root.join("c").join("f")).unwrap(), b"original");

    let fresh = h.files.upload(&client, "g", Bytes::from_static(b"new")).await;
    assert!(fresh.is_err());
    assert!(!h.root.join("c").join("g").exists());

    let delete = h.files.delete_file(&client, "f").await;
    assert!(delete.is_err());
    assert_eq!(std::fs::read(h.root.join("c").join("f")).unwrap(), b"original");

    h.repo.fail_updates.store(false, Ordering::SeqCst);
    assert_eq!(h.used(client.id).await, 8);
}

#[tokio::test]
async fn test_failed_ledger_write_removes_created_directories() {
    let h = Harness::new(1_000_000);
    let client = h.clients.create_client("c".into(), 100).await.unwrap();
    h.files.mkdir(&client, "existing").await.unwrap();

    h.repo.fail_updates.store(true, Ordering::SeqCst);

    let nested = h.files.upload(&client, "fresh/deeper/f", Bytes::from_static(b"x")).await;
    assert!(matches!(nested, Err(GatewayError::Repository(_))));
    assert!(!h.root.join("c").join("fresh").exists());

    let inside = h.files.upload(&client, "existing/sub/f", Bytes::from_static(b"x")).await;
    assert!(inside.is_err());
    assert!(h.root.join("c").join("existing").is_dir());
    assert!(!h.root.join("c").join("existing").join("sub").exists());
    assert!(h.root.join("c").is_dir());
}

#[tokio::test]
async fn test_upload_queued_behind_rename_lands_under_new_name() {
    let h = Arc::new(Harness::new(1_000_000));
    let stale = h.clients.create_client("old".into(), 100).await.unwrap();

    let held = h.locks.lock(stale.id).await;

    let rename = {
        let h = h.clone();
        let id = stale.id;
        tokio::spawn(async move { h.clients.update_client(id, "new".into(), 100).await })
    };
    tokio::task::yield_now().await;

    let upload = {
        let h = h.clone();
        let stale = stale.clone();
        tokio::spawn(async move {
            let stored = h
                .files
                .upload(&stale, "chunks/a", Bytes::from_static(b"0123456789"))
                .await?;
            h.files.mkdir(&stale, "later").await?;
            Ok::<_, GatewayError>(stored)
        })
    };
    tokio::task::yield_now().await;

    drop(held);

    assert_eq!(rename.await.unwrap().unwrap().name, "new");
    let receipt = upload.await.unwrap().unwrap();
    assert_eq!(receipt.path, "/chunks/a");

    assert!(!h.root.join("old").exists());
    assert_eq!(
        std::fs::read(h.root.join("new").join("chunks").join("a")).unwrap(),
        b"0123456789"
    );
    assert!(h.root.join("new").join("later").is_dir());
    assert_eq!(h.used(stale.id).await, 10);

    // A stale record still reads from the current subtree
    assert_eq!(h.files.download(&stale, "chunks/a").await.unwrap(), b"0123456789");
    assert_eq!(h.files.stat(&stale, "chunks/a").await.unwrap().size, 10);
}

#[tokio::test]
async fn test_upload_queued_behind_client_delete_is_not_found() {
    let h = Arc::new(Harness::new(1_000_000));
    let stale = h.clients.create_client("gone".into(), 100).await.unwrap();

    let held = h.locks.lock(stale.id).await;

    let delete = {
        let h = h.clone();
        let id = stale.id;
        tokio::spawn(async move { h.clients.delete_client(id).await })
    };
    tokio::task::yield_now().await;

    let upload = {
        let h = h.clone();
        let stale = stale.clone();
        tokio::spawn(async move {
            h.files
                .upload(&stale, "chunks/a", Bytes::from_static(b"0123456789"))
                .await
        })
    };
    tokio::task::yield_now().await;

    drop(held);

    delete.await.unwrap().unwrap();
    assert!(matches!(upload.await.unwrap(), Err(GatewayError::NotFound(_))));
    assert!(!h.root.join("gone").exists());
    assert!(matches!(h.files.mkdir(&stale, "x").await, Err(GatewayError::NotFound(_))));
    assert!(!h.root.join("gone").exists());
}

#[tokio::test]
async fn test_concurrent_uploads_never_exceed_quota() {
    let h = Arc::new(Harness::new(1_000_000));
    let client = h.clients.create_client("c".into(), 100).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let h = h.clone();
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            h.files
                .upload(&client, &format!("chunk-{i}"), Bytes::from(vec![i as u8 + 1; 10]))
                .await
        }));
    }

    let mut succeeded = 0u64;
    for task in tasks {
        match task.await.unwrap() {
            Ok(receipt) => {
                assert_eq!(receipt.delta, 10);
                succeeded += 1;
            }
            Err(GatewayError::QuotaExceeded { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(h.used(client.id).await, 100);
    assert_eq!(h.clients.used_space().await.unwrap(), 100);
}
