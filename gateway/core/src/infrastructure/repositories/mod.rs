// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the `ClientRepository` abstraction
//! defined in the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve client records
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **SqliteClientRepository** - durable registry backed by SQLite
//! - **InMemoryClientRepository** - thread-safe HashMap-backed storage for
//!   tests and throwaway deployments
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use strongbox_core::infrastructure::db::Database;
//! use strongbox_core::infrastructure::repositories::SqliteClientRepository;
//! use strongbox_core::domain::repository::ClientRepository;
//!
//! let db = Database::connect_and_migrate("sqlite://strongbox.db").await?;
//! let repo = SqliteClientRepository::new(db.get_pool().clone());
//! let clients = repo.list_all().await?;
//! # Ok(())
//! # }
//! ```

pub mod sqlite_client;

pub use sqlite_client::SqliteClientRepository;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use async_trait::async_trait;
use chrono::Utc;
use crate::domain::client::{Client, ClientId, NewClient};
use crate::domain::repository::{ClientRepository, RepositoryError, StorageBackend, SummableField};
use crate::infrastructure::db::Database;

/// Build the repository selected by the configured backend.
pub async fn build_client_repository(
    backend: &StorageBackend,
) -> anyhow::Result<Arc<dyn ClientRepository>> {
    match backend {
        StorageBackend::InMemory => {
            tracing::warn!("Using in-memory client registry; clients are lost on restart");
            Ok(Arc::new(InMemoryClientRepository::new()))
        }
        StorageBackend::Sqlite(config) => {
            let db = Database::connect_and_migrate(&config.connection_string).await?;
            Ok(Arc::new(SqliteClientRepository::new(db.get_pool().clone())))
        }
    }
}

#[derive(Default)]
struct Registry {
    next_id: i64,
    clients: BTreeMap<ClientId, Client>,
}

#[derive(Clone, Default)]
pub struct InMemoryClientRepository {
    registry: Arc<RwLock<Registry>>,
}

impl InMemoryClientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Registry>, RepositoryError> {
        self.registry
            .read()
            .map_err(|_| RepositoryError::Database("registry lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Registry>, RepositoryError> {
        self.registry
            .write()
            .map_err(|_| RepositoryError::Database("registry lock poisoned".to_string()))
    }
}

#[async_trait]
impl ClientRepository for InMemoryClientRepository {
    async fn create(&self, client: NewClient) -> Result<Client, RepositoryError> {
        let mut registry = self.write()?;

        if registry.clients.values().any(|c| c.name == client.name) {
            return Err(RepositoryError::Conflict(format!("name {}", client.name)));
        }
        if registry.clients.values().any(|c| c.auth_code == client.auth_code) {
            return Err(RepositoryError::Conflict("auth_code".to_string()));
        }

        registry.next_id += 1;
        let now = Utc::now();
        let created = Client {
            id: ClientId(registry.next_id),
            name: client.name,
            auth_code: client.auth_code,
            quota: client.quota,
            used_space: 0,
            created_at: now,
            updated_at: now,
        };
        registry.clients.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        Ok(self.read()?.clients.get(&id).cloned())
    }

    async fn find_by_auth_code(&self, auth_code: &str) -> Result<Option<Client>, RepositoryError> {
        Ok(self
            .read()?
            .clients
            .values()
            .find(|c| c.auth_code == auth_code)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Client>, RepositoryError> {
        Ok(self.read()?.clients.values().find(|c| c.name == name).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Client>, RepositoryError> {
        Ok(self.read()?.clients.values().cloned().collect())
    }

    async fn update(&self, client: &Client) -> Result<(), RepositoryError> {
        let mut registry = self.write()?;

        if registry
            .clients
            .values()
            .any(|c| c.id != client.id && c.name == client.name)
        {
            return Err(RepositoryError::Conflict(format!("name {}", client.name)));
        }

        let stored = registry
            .clients
            .get_mut(&client.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("client {}", client.id)))?;
        stored.name = client.name.clone();
        stored.quota = client.quota;
        stored.used_space = client.used_space;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: ClientId) -> Result<(), RepositoryError> {
        self.write()?.clients.remove(&id);
        Ok(())
    }

    async fn sum_by(&self, field: SummableField) -> Result<u64, RepositoryError> {
        let registry = self.read()?;
        Ok(registry
            .clients
            .values()
            .map(|c| match field {
                SummableField::Quota => c.quota,
                SummableField::UsedSpace => c.used_space,
            })
            .fold(0u64, u64::saturating_add))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let repo = InMemoryClientRepository::new();
        let a = repo.create(NewClient::new("a", 10)).await.unwrap();
        let b = repo.create(NewClient::new("b", 20)).await.unwrap();
        assert!(b.id > a.id);
        assert_eq!(a.used_space, 0);
        assert_eq!(repo.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let repo = InMemoryClientRepository::new();
        repo.create(NewClient::new("a", 10)).await.unwrap();
        let err = repo.create(NewClient::new("a", 10)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_and_sums() {
        let repo = InMemoryClientRepository::new();
        let mut a = repo.create(NewClient::new("a", 10)).await.unwrap();
        repo.create(NewClient::new("b", 20)).await.unwrap();

        a.used_space = 7;
        a.name = "renamed".into();
        repo.update(&a).await.unwrap();

        let stored = repo.find_by_name("renamed").await.unwrap().unwrap();
        assert_eq!(stored.used_space, 7);
        assert_eq!(repo.sum_by(SummableField::Quota).await.unwrap(), 30);
        assert_eq!(repo.sum_by(SummableField::UsedSpace).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let repo = InMemoryClientRepository::new();
        let mut a = repo.create(NewClient::new("a", 10)).await.unwrap();
        repo.delete(a.id).await.unwrap();
        repo.delete(a.id).await.unwrap();
        a.quota = 5;
        assert!(matches!(repo.update(&a).await, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_auth_code() {
        let repo = InMemoryClientRepository::new();
        let a = repo.create(NewClient::new("a", 10)).await.unwrap();
        let found = repo.find_by_auth_code(&a.auth_code).await.unwrap();
        assert_eq!(found.map(|c| c.id), Some(a.id));
        assert!(repo.find_by_auth_code("nope").await.unwrap().is_none());
    }
}
