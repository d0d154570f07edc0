// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Client Administration Service
//!
//! Orchestrates the client lifecycle, coordinating:
//! - Domain layer: `Client` aggregate, name rules, ledger rules
//! - Infrastructure layer: `ClientRepository`, the client's storage subtree
//! - Quota ledger: reservation checks against live free space
//!
//! Registry and filesystem are kept in step with compensating actions: a
//! record whose directory cannot be created is removed again, and a rename
//! whose record cannot be persisted is reversed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::application::error::{GatewayError, GatewayResult};
use crate::application::quota_ledger::QuotaLedger;
use crate::application::tenant_locks::TenantLocks;
use crate::domain::client::{validate_client_name, Client, ClientId, NewClient};
use crate::domain::repository::{ClientRepository, RepositoryError};

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait ClientService: Send + Sync {
    /// Register a client and provision its storage directory
    async fn create_client(&self, name: String, quota: u64) -> GatewayResult<Client>;

    /// Get client by ID
    async fn get_client(&self, id: ClientId) -> GatewayResult<Client>;

    /// List all clients
    async fn list_clients(&self) -> GatewayResult<Vec<Client>>;

    /// Rename and/or requota a client
    async fn update_client(&self, id: ClientId, name: String, quota: u64) -> GatewayResult<Client>;

    /// Remove a client record together with its whole subtree
    async fn delete_client(&self, id: ClientId) -> GatewayResult<()>;

    /// Raw free space of the storage root
    async fn storage_size(&self) -> GatewayResult<u64>;

    /// Sum of used space over all clients
    async fn used_space(&self) -> GatewayResult<u64>;

    /// Sum of quotas over all clients
    async fn total_quota(&self) -> GatewayResult<u64>;
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct StandardClientService {
    repository: Arc<dyn ClientRepository>,
    ledger: Arc<QuotaLedger>,
    locks: Arc<TenantLocks>,
    storage_root: PathBuf,
}

impl StandardClientService {
    pub fn new(
        repository: Arc<dyn ClientRepository>,
        ledger: Arc<QuotaLedger>,
        locks: Arc<TenantLocks>,
    ) -> Self {
        let storage_root = ledger.storage_root().to_path_buf();
        Self {
            repository,
            ledger,
            locks,
            storage_root,
        }
    }

    fn client_dir(&self, name: &str) -> PathBuf {
        self.storage_root.join(name)
    }

    async fn ensure_name_free(&self, name: &str, except: Option<ClientId>) -> GatewayResult<()> {
        if let Some(existing) = self.repository.find_by_name(name).await? {
            if Some(existing.id) != except {
                warn!(name = %name, "Client name already taken");
                return Err(GatewayError::NameConflict(name.to_string()));
            }
        }
        Ok(())
    }

    async fn load(&self, id: ClientId) -> GatewayResult<Client> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::NotFound(format!("client {}", id)))
    }

    /// Move the subtree to its new name unless something already lives
    /// there. Returns whether a rename happened.
    async fn move_subtree(&self, from: &Path, to: &Path) -> GatewayResult<bool> {
        if tokio::fs::try_exists(to).await.map_err(GatewayError::io_at(to))? {
            warn!(
                target_dir = %to.display(),
                "Directory for new client name already exists; keeping it in place"
            );
            return Ok(false);
        }

        if tokio::fs::try_exists(from).await.map_err(GatewayError::io_at(from))? {
            tokio::fs::rename(from, to).await.map_err(GatewayError::io_at(to))?;
            Ok(true)
        } else {
            tokio::fs::create_dir_all(to).await.map_err(GatewayError::io_at(to))?;
            Ok(false)
        }
    }
}

fn name_conflict(name: &str) -> impl FnOnce(RepositoryError) -> GatewayError + '_ {
    move |e| match e {
        RepositoryError::Conflict(_) => GatewayError::NameConflict(name.to_string()),
        other => other.into(),
    }
}

#[async_trait]
impl ClientService for StandardClientService {
    async fn create_client(&self, name: String, quota: u64) -> GatewayResult<Client> {
        let _reservations = self.locks.lock_reservations().await;

        self.ledger.check_create(quota).await?;
        validate_client_name(&name)?;
        self.ensure_name_free(&name, None).await?;

        let client = self
            .repository
            .create(NewClient::new(name.clone(), quota))
            .await
            .map_err(name_conflict(&name))?;

        let dir = self.client_dir(&client.name);
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            error!(
                client_id = %client.id,
                dir = %dir.display(),
                error = %e,
                "Failed to create client directory; removing client record"
            );
            if let Err(rollback) = self.repository.delete(client.id).await {
                error!(client_id = %client.id, error = %rollback, "Rollback of client record failed");
            }
            return Err(GatewayError::io(dir, e));
        }

        info!(client_id = %client.id, name = %client.name, quota, "Created client");
        Ok(client)
    }

    async fn get_client(&self, id: ClientId) -> GatewayResult<Client> {
        self.load(id).await
    }

    async fn list_clients(&self) -> GatewayResult<Vec<Client>> {
        Ok(self.repository.list_all().await?)
    }

    async fn update_client(&self, id: ClientId, name: String, quota: u64) -> GatewayResult<Client> {
        let _reservations = self.locks.lock_reservations().await;
        let _client_lock = self.locks.lock(id).await;

        let current = self.load(id).await?;
        self.ledger
            .check_resize(current.quota, quota, current.used_space)
            .await?;
        validate_client_name(&name)?;

        let renaming = name != current.name;
        let mut moved = false;
        let old_dir = self.client_dir(&current.name);
        let new_dir = self.client_dir(&name);
        if renaming {
            self.ensure_name_free(&name, Some(id)).await?;
            moved = self.move_subtree(&old_dir, &new_dir).await?;
        }

        let mut updated = current.clone();
        updated.name = name.clone();
        updated.quota = quota;

        if let Err(e) = self.repository.update(&updated).await {
            if moved {
                if let Err(undo) = tokio::fs::rename(&new_dir, &old_dir).await {
                    error!(
                        client_id = %id,
                        from = %new_dir.display(),
                        to = %old_dir.display(),
                        error = %undo,
                        "Failed to reverse client directory rename"
                    );
                }
            }
            return Err(name_conflict(&name)(e));
        }

        info!(
            client_id = %id,
            name = %updated.name,
            old_quota = current.quota,
            quota,
            "Updated client"
        );
        self.load(id).await
    }

    async fn delete_client(&self, id: ClientId) -> GatewayResult<()> {
        let client_lock = self.locks.lock(id).await;

        let client = self.load(id).await?;
        let dir = self.client_dir(&client.name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!(dir = %dir.display(), "Removed client subtree"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "Client subtree already absent")
            }
            Err(e) => return Err(GatewayError::io(dir, e)),
        }

        self.repository.delete(id).await?;
        drop(client_lock);
        self.locks.forget(id);

        info!(client_id = %id, name = %client.name, "Deleted client");
        Ok(())
    }

    async fn storage_size(&self) -> GatewayResult<u64> {
        self.ledger.available_space().await
    }

    async fn used_space(&self) -> GatewayResult<u64> {
        self.ledger.total_used_space().await
    }

    async fn total_quota(&self) -> GatewayResult<u64> {
        self.ledger.total_quota().await
    }
}
