// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! File Operation Gateway
//!
//! Client-scoped file operations: upload, download, stat, mkdir and delete.
//! Every path goes through the `PathSanitizer` against the caller's own
//! subtree before the filesystem is touched.
//!
//! Ledger mutations follow one rule: the filesystem change happens first,
//! `used_space` is persisted only after it succeeded, and if persisting
//! fails the filesystem change is undone. All of it runs under the client's
//! lock from `TenantLocks`. The client record is re-read under the lock and
//! paths are resolved against that fresh record, so an admin rename or delete
//! that won the lock first is never undone by a stale caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use crate::application::error::{GatewayError, GatewayResult};
use crate::application::tenant_locks::TenantLocks;
use crate::domain::client::{Client, ClientId};
use crate::domain::ledger;
use crate::domain::path_sanitizer::{PathSanitizer, PathSanitizerError};
use crate::domain::repository::ClientRepository;

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Client-relative path that was written
    pub path: String,
    /// Change applied to the client's used space
    pub delta: i64,
}

/// Result of a stat call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Client-relative path
    pub path: String,
    pub size: u64,
}

/// Result of a file deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub path: String,
    /// Bytes returned to the client's quota
    pub freed: u64,
}

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait FileGateway: Send + Sync {
    /// Store `content` at `path`, replacing any previous content
    async fn upload(&self, client: &Client, path: &str, content: Bytes)
        -> GatewayResult<UploadReceipt>;

    /// Read the file at `path`
    async fn download(&self, client: &Client, path: &str) -> GatewayResult<Vec<u8>>;

    /// Size of the entry at `path`
    async fn stat(&self, client: &Client, path: &str) -> GatewayResult<FileStat>;

    /// Create `path` and any missing parents
    async fn mkdir(&self, client: &Client, path: &str) -> GatewayResult<String>;

    /// Remove the file at `path` and release its bytes
    async fn delete_file(&self, client: &Client, path: &str) -> GatewayResult<DeleteReceipt>;
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct StandardFileGateway {
    repository: Arc<dyn ClientRepository>,
    locks: Arc<TenantLocks>,
    sanitizer: PathSanitizer,
    storage_root: PathBuf,
}

impl StandardFileGateway {
    pub fn new(
        repository: Arc<dyn ClientRepository>,
        locks: Arc<TenantLocks>,
        storage_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repository,
            locks,
            sanitizer: PathSanitizer::new(),
            storage_root: storage_root.into(),
        }
    }

    fn client_root(&self, client: &Client) -> PathBuf {
        self.storage_root.join(&client.name)
    }

    /// Resolve `requested` inside the client's subtree.
    fn resolve(&self, client: &Client, requested: &str) -> GatewayResult<(PathBuf, PathBuf)> {
        let root = self.client_root(client);
        match self.sanitizer.resolve(&root, requested) {
            Ok(path) => Ok((root, path)),
            Err(e) => {
                warn!(client_id = %client.id, path = %requested, error = %e, "Rejected client path");
                Err(e.into())
            }
        }
    }

    fn display(&self, root: &Path, path: &Path) -> GatewayResult<String> {
        Ok(self.sanitizer.display_path(path, root)?)
    }

    /// Take the client's lock and re-read its record under it.
    async fn lock_fresh(&self, id: ClientId) -> GatewayResult<(OwnedMutexGuard<()>, Client)> {
        let guard = self.locks.lock(id).await;
        let client = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("client {}", id)))?;
        Ok((guard, client))
    }

    async fn metadata(path: &Path) -> GatewayResult<Option<std::fs::Metadata>> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(Some(meta)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GatewayError::io(path, e)),
        }
    }

    /// Topmost directory on the way from `root` (exclusive) to `dir` that
    /// does not exist yet.
    async fn first_missing_dir(root: &Path, dir: &Path) -> GatewayResult<Option<PathBuf>> {
        let mut missing = None;
        let mut current = dir;
        while current != root && current.starts_with(root) {
            if Self::metadata(current).await?.is_some() {
                break;
            }
            missing = Some(current.to_path_buf());
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Ok(missing)
    }

    /// Put the previous state of `path` back after a failed ledger write.
    ///
    /// With no previous content the new file is removed, together with the
    /// directories the upload created for it.
    async fn restore(
        &self,
        client_id: ClientId,
        path: &Path,
        previous: Option<&[u8]>,
        created_dir: Option<&Path>,
        cause: GatewayError,
    ) -> GatewayError {
        let restored = match (previous, created_dir) {
            (Some(content), _) => tokio::fs::write(path, content).await,
            (None, None) => tokio::fs::remove_file(path).await,
            (None, Some(dir)) => tokio::fs::remove_dir_all(dir).await,
        };
        match restored {
            Ok(()) => {
                warn!(
                    client_id = %client_id,
                    path = %path.display(),
                    error = %cause,
                    "Ledger update failed; file restored"
                );
                cause
            }
            Err(e) => {
                error!(
                    client_id = %client_id,
                    path = %path.display(),
                    ledger_error = %cause,
                    restore_error = %e,
                    "Ledger update failed and file could not be restored"
                );
                GatewayError::LedgerOutOfSync {
                    client_id: client_id.0,
                    detail: format!("{} (restore failed: {})", cause, e),
                }
            }
        }
    }
}

fn is_a_directory(path: &str) -> GatewayError {
    GatewayError::InvalidPath(PathSanitizerError::InvalidPath(format!(
        "{} is a directory",
        path
    )))
}

#[async_trait]
impl FileGateway for StandardFileGateway {
    async fn upload(
        &self,
        client: &Client,
        path: &str,
        content: Bytes,
    ) -> GatewayResult<UploadReceipt> {
        let (_guard, client) = self.lock_fresh(client.id).await?;
        let (root, target) = self.resolve(&client, path)?;
        if content.is_empty() {
            return Err(GatewayError::EmptyUpload);
        }
        ledger::check_write(client.quota, client.used_space, content.len() as u64)?;

        let mut created_dir = None;
        if let Some(parent) = target.parent() {
            created_dir = Self::first_missing_dir(&root, parent).await?;
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(GatewayError::io_at(parent))?;
        }

        let previous = match Self::metadata(&target).await? {
            Some(meta) if meta.is_dir() => return Err(is_a_directory(path)),
            Some(_) => Some(
                tokio::fs::read(&target)
                    .await
                    .map_err(GatewayError::io_at(&target))?,
            ),
            None => None,
        };

        tokio::fs::write(&target, &content)
            .await
            .map_err(GatewayError::io_at(&target))?;

        let delta = ledger::positional_delta(previous.as_deref().unwrap_or_default(), &content);
        let mut updated = client.clone();
        updated.used_space = ledger::apply_delta(client.used_space, delta);

        if let Err(e) = self.repository.update(&updated).await {
            return Err(self
                .restore(
                    client.id,
                    &target,
                    previous.as_deref(),
                    created_dir.as_deref(),
                    e.into(),
                )
                .await);
        }

        metrics::counter!("strongbox_uploads_total").increment(1);
        metrics::counter!("strongbox_upload_bytes_total").increment(content.len() as u64);

        let shown = self.display(&root, &target)?;
        info!(
            client_id = %client.id,
            path = %shown,
            size = content.len(),
            delta,
            used_space = updated.used_space,
            "Stored file"
        );
        Ok(UploadReceipt {
            path: shown,
            delta,
        })
    }

    async fn download(&self, client: &Client, path: &str) -> GatewayResult<Vec<u8>> {
        let (_guard, client) = self.lock_fresh(client.id).await?;
        let (_root, target) = self.resolve(&client, path)?;

        match Self::metadata(&target).await? {
            Some(meta) if meta.is_file() => {}
            _ => return Err(GatewayError::NotFound(path.to_string())),
        }

        let content = tokio::fs::read(&target)
            .await
            .map_err(GatewayError::io_at(&target))?;
        debug!(client_id = %client.id, path = %path, size = content.len(), "Read file");
        Ok(content)
    }

    async fn stat(&self, client: &Client, path: &str) -> GatewayResult<FileStat> {
        let (_guard, client) = self.lock_fresh(client.id).await?;
        let (root, target) = self.resolve(&client, path)?;

        let meta = Self::metadata(&target)
            .await?
            .ok_or_else(|| GatewayError::NotFound(path.to_string()))?;

        Ok(FileStat {
            path: self.display(&root, &target)?,
            size: meta.len(),
        })
    }

    async fn mkdir(&self, client: &Client, path: &str) -> GatewayResult<String> {
        let (_guard, client) = self.lock_fresh(client.id).await?;
        let (root, target) = self.resolve(&client, path)?;

        tokio::fs::create_dir_all(&target)
            .await
            .map_err(GatewayError::io_at(&target))?;

        let shown = self.display(&root, &target)?;
        debug!(client_id = %client.id, path = %shown, "Created directory");
        Ok(shown)
    }

    async fn delete_file(&self, client: &Client, path: &str) -> GatewayResult<DeleteReceipt> {
        let (_guard, client) = self.lock_fresh(client.id).await?;
        let (root, target) = self.resolve(&client, path)?;

        match Self::metadata(&target).await? {
            None => return Err(GatewayError::NotFound(path.to_string())),
            Some(meta) if meta.is_dir() => {
                warn!(client_id = %client.id, path = %path, "Refusing to delete a directory");
                return Err(GatewayError::CannotDeleteDirectory(path.to_string()));
            }
            Some(_) => {}
        }

        let previous = tokio::fs::read(&target)
            .await
            .map_err(GatewayError::io_at(&target))?;
        tokio::fs::remove_file(&target)
            .await
            .map_err(GatewayError::io_at(&target))?;

        let freed = previous.len() as u64;
        let mut updated = client.clone();
        updated.used_space = client.used_space.saturating_sub(freed);

        if let Err(e) = self.repository.update(&updated).await {
            return Err(self
                .restore(client.id, &target, Some(&previous), None, e.into())
                .await);
        }

        metrics::counter!("strongbox_deletes_total").increment(1);

        let shown = self.display(&root, &target)?;
        info!(
            client_id = %client.id,
            path = %shown,
            freed,
            used_space = updated.used_space,
            "Deleted file"
        );
        Ok(DeleteReceipt {
            path: shown,
            freed,
        })
    }
}
