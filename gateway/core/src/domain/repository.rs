// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contract for the `Client` aggregate, following the DDD
//! Repository pattern: the interface lives in the domain layer and is
//! implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `ClientRepository` | `Client` | `InMemoryClientRepository`, `SqliteClientRepository` |
//!
//! ## Storage Backend Abstraction
//!
//! The concrete implementation is selected at startup from the gateway
//! configuration. The in-memory repository backs tests and throwaway
//! deployments; SQLite is the durable registry.

use async_trait::async_trait;
use crate::domain::client::{Client, ClientId, NewClient};

/// Storage backend enum for pluggable persistence
#[derive(Debug, Clone)]
pub enum StorageBackend {
    InMemory,
    Sqlite(SqliteConfig),
}

#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub connection_string: String,
}

impl StorageBackend {
    /// `memory` selects the in-memory registry, anything else is treated as
    /// a SQLite connection string.
    pub fn from_url(url: &str) -> Self {
        if url == "memory" {
            Self::InMemory
        } else {
            Self::Sqlite(SqliteConfig {
                connection_string: url.to_string(),
            })
        }
    }
}

/// Numeric client fields the ledger aggregates over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummableField {
    Quota,
    UsedSpace,
}

/// Repository interface for Client aggregates
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Insert a new client; the repository assigns the id
    async fn create(&self, client: NewClient) -> Result<Client, RepositoryError>;

    /// Find client by ID
    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError>;

    /// Find client by bearer credential
    async fn find_by_auth_code(&self, auth_code: &str) -> Result<Option<Client>, RepositoryError>;

    /// Find client by name
    async fn find_by_name(&self, name: &str) -> Result<Option<Client>, RepositoryError>;

    /// List all clients ordered by id
    async fn list_all(&self) -> Result<Vec<Client>, RepositoryError>;

    /// Overwrite name, quota and used space of an existing client
    async fn update(&self, client: &Client) -> Result<(), RepositoryError>;

    /// Delete client by ID (absent ids are not an error)
    async fn delete(&self, id: ClientId) -> Result<(), RepositoryError>;

    /// Sum a numeric field over all clients
    async fn sum_by(&self, field: SummableField) -> Result<u64, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Stored value out of range: {0}")]
    OutOfRange(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.message().to_string())
            }
            _ => RepositoryError::Database(err.to_string()),
        }
    }
}
