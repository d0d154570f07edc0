// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Client Aggregate
//!
//! A client is one tenant of the gateway: it owns a quota, a bearer
//! credential and a single subdirectory of the storage root named after it.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Tenant record, identifiers and name rules

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length in bytes of a freshly generated auth code (hex-encoded on the wire).
pub const AUTH_CODE_BYTES: usize = 32;

// ============================================================================
// Value Objects
// ============================================================================

/// Registry-assigned identifier of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub i64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ClientId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientNameError {
    #[error("client name must not be empty")]
    Empty,

    #[error("client name contains a parent-directory token: {0}")]
    ParentTraversal(String),

    #[error("client name contains a path separator or NUL byte: {0}")]
    IllegalCharacter(String),
}

/// Validate a client name before it is used as a directory name.
///
/// The name becomes `<storage_root>/<name>`, so anything that could make the
/// join land outside the storage root (or nest below another client) is
/// rejected.
pub fn validate_client_name(name: &str) -> Result<(), ClientNameError> {
    if name.is_empty() || name == "." {
        return Err(ClientNameError::Empty);
    }

    if name.contains("..") {
        tracing::warn!(name = %name, "Rejected client name containing '..'");
        return Err(ClientNameError::ParentTraversal(name.to_string()));
    }

    if name.contains(['/', '\\', '\0']) {
        tracing::warn!(name = %name, "Rejected client name containing a separator");
        return Err(ClientNameError::IllegalCharacter(name.to_string()));
    }

    Ok(())
}

/// Generate a fresh high-entropy bearer credential.
pub fn generate_auth_code() -> String {
    let mut bytes = [0u8; AUTH_CODE_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// ============================================================================
// Aggregate
// ============================================================================

/// Persisted tenant record.
///
/// `used_space` is only ever changed by the file gateway, and always stays
/// within `0..=quota`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub auth_code: String,
    pub quota: u64,
    pub used_space: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Bytes the client may still write before hitting its quota.
    pub fn remaining(&self) -> u64 {
        self.quota.saturating_sub(self.used_space)
    }
}

/// Values needed to register a new client; the registry assigns the id.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub auth_code: String,
    pub quota: u64,
}

impl NewClient {
    pub fn new(name: impl Into<String>, quota: u64) -> Self {
        Self {
            name: name.into(),
            auth_code: generate_auth_code(),
            quota,
        }
    }
}
