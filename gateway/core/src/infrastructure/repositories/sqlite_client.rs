// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SQLite Client Registry
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Durable `ClientRepository` over the `clients` table

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use crate::domain::client::{Client, ClientId, NewClient};
use crate::domain::repository::{ClientRepository, RepositoryError, SummableField};

const SELECT_COLUMNS: &str =
    "SELECT id, name, auth_code, quota, used_space, created_at, updated_at FROM clients";

pub struct SqliteClientRepository {
    pool: SqlitePool,
}

impl SqliteClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn find_one(
        &self,
        filter: &str,
        value: &str,
    ) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE {} = ?", SELECT_COLUMNS, filter))
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        row.map(parse_client_row).transpose()
    }
}

fn to_db(value: u64, field: &str) -> Result<i64, RepositoryError> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::OutOfRange(format!("{} = {}", field, value)))
}

fn from_db(value: i64, field: &str) -> Result<u64, RepositoryError> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::OutOfRange(format!("{} = {}", field, value)))
}

fn parse_client_row(row: SqliteRow) -> Result<Client, RepositoryError> {
    let quota: i64 = row.try_get("quota")?;
    let used_space: i64 = row.try_get("used_space")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(Client {
        id: ClientId(row.try_get("id")?),
        name: row.try_get("name")?,
        auth_code: row.try_get("auth_code")?,
        quota: from_db(quota, "quota")?,
        used_space: from_db(used_space, "used_space")?,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl ClientRepository for SqliteClientRepository {
    async fn create(&self, client: NewClient) -> Result<Client, RepositoryError> {
        let now = Utc::now();
        let quota = to_db(client.quota, "quota")?;

        let result = sqlx::query(
            r#"
            INSERT INTO clients (name, auth_code, quota, used_space, created_at, updated_at)
            VALUES (?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&client.name)
        .bind(&client.auth_code)
        .bind(quota)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(Client {
            id: ClientId(result.last_insert_rowid()),
            name: client.name,
            auth_code: client.auth_code,
            quota: client.quota,
            used_space: 0,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_id(&self, id: ClientId) -> Result<Option<Client>, RepositoryError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.map(parse_client_row).transpose()
    }

    async fn find_by_auth_code(&self, auth_code: &str) -> Result<Option<Client>, RepositoryError> {
        self.find_one("auth_code", auth_code).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Client>, RepositoryError> {
        self.find_one("name", name).await
    }

    async fn list_all(&self) -> Result<Vec<Client>, RepositoryError> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(parse_client_row).collect()
    }

    async fn update(&self, client: &Client) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE clients
            SET name = ?, quota = ?, used_space = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&client.name)
        .bind(to_db(client.quota, "quota")?)
        .bind(to_db(client.used_space, "used_space")?)
        .bind(Utc::now())
        .bind(client.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("client {}", client.id)));
        }
        Ok(())
    }

    async fn delete(&self, id: ClientId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn sum_by(&self, field: SummableField) -> Result<u64, RepositoryError> {
        let column = match field {
            SummableField::Quota => "quota",
            SummableField::UsedSpace => "used_space",
        };

        let total: i64 = sqlx::query(&format!(
            "SELECT COALESCE(SUM({}), 0) AS total FROM clients",
            column
        ))
        .fetch_one(&self.pool)
        .await?
        .try_get("total")?;

        from_db(total, column)
    }
}
