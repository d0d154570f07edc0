// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # SQLite Connection Pool
//!
//! Wraps `sqlx::sqlite::SqlitePool` in a thin `Database` newtype that is
//! injected into the SQLite client registry. `migrate` creates the schema on
//! first start and is safe to run on every start.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS clients (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL UNIQUE,
    auth_code   TEXT    NOT NULL UNIQUE,
    quota       INTEGER NOT NULL CHECK (quota >= 0),
    used_space  INTEGER NOT NULL DEFAULT 0 CHECK (used_space >= 0),
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
)
"#;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(connection_string: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(connection_string)
            .with_context(|| format!("Invalid SQLite connection string: {}", connection_string))?
            .create_if_missing(true);

        // An in-memory database exists per connection, so it must not be
        // spread over a pool.
        let max_connections = if connection_string.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("Failed to open client registry")?;

        Ok(Self { pool })
    }

    /// Open the registry and make sure the schema exists.
    pub async fn connect_and_migrate(connection_string: &str) -> Result<Self> {
        let db = Self::new(connection_string).await?;
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .context("Failed to create clients table")?;
        tracing::debug!("Client registry schema ready");
        Ok(())
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }
}
