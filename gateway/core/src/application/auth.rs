// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Authentication Gate
//!
//! Two disjoint schemes, never mixed on the same route:
//!
//! - **Admin** – HTTP Basic. The username is compared in constant time, the
//!   secret is verified against the configured argon2 PHC hash.
//! - **Client** – `Authorization: Bearer <auth_code>`, looked up in the
//!   client registry.
//!
//! Header parsing lives here as well so the presentation layer only has to
//! hand over raw header values.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::ConstantTimeEq;

use crate::application::error::{GatewayError, GatewayResult};
use crate::domain::client::Client;
use crate::domain::repository::ClientRepository;

/// Hash an admin secret into an argon2id PHC string with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Split a `Basic` header value into `(username, secret)`.
pub fn parse_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, secret) = decoded.split_once(':')?;
    Some((user.to_string(), secret.to_string()))
}

/// Extract the token from a `Bearer` header value.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

pub struct AuthenticationGate {
    admin_username: String,
    admin_password_hash: Arc<str>,
    repository: Arc<dyn ClientRepository>,
}

impl AuthenticationGate {
    pub fn new(
        admin_username: impl Into<String>,
        admin_password_hash: impl Into<String>,
        repository: Arc<dyn ClientRepository>,
    ) -> Self {
        Self {
            admin_username: admin_username.into(),
            admin_password_hash: Arc::from(admin_password_hash.into()),
            repository,
        }
    }

    /// Check an admin Basic credential. The hash is always verified, even
    /// when the username already mismatched.
    pub async fn authenticate_admin(&self, username: &str, secret: &str) -> GatewayResult<()> {
        let user_ok: bool = username
            .as_bytes()
            .ct_eq(self.admin_username.as_bytes())
            .into();

        let hash = self.admin_password_hash.clone();
        let secret = secret.to_string();
        let secret_ok = tokio::task::spawn_blocking(move || {
            PasswordHash::new(&hash)
                .map(|parsed| {
                    Argon2::default()
                        .verify_password(secret.as_bytes(), &parsed)
                        .is_ok()
                })
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false);

        if user_ok && secret_ok {
            Ok(())
        } else {
            tracing::warn!(username = %username, "Admin authentication failed");
            metrics::counter!("strongbox_auth_failures_total", "scheme" => "basic").increment(1);
            Err(GatewayError::NotAuthenticated)
        }
    }

    /// Check a raw `Authorization` header value as an admin credential.
    pub async fn authenticate_admin_header(&self, header: Option<&str>) -> GatewayResult<()> {
        match header.and_then(parse_basic) {
            Some((user, secret)) => self.authenticate_admin(&user, &secret).await,
            None => {
                tracing::debug!("Missing or malformed Basic credential");
                metrics::counter!("strongbox_auth_failures_total", "scheme" => "basic")
                    .increment(1);
                Err(GatewayError::NotAuthenticated)
            }
        }
    }

    /// Resolve a bearer token to its client.
    pub async fn authenticate_client(&self, token: &str) -> GatewayResult<Client> {
        match self.repository.find_by_auth_code(token).await? {
            Some(client) => {
                tracing::debug!(client_id = %client.id, "Client authenticated");
                Ok(client)
            }
            None => {
                tracing::warn!("Client authentication failed: unknown auth code");
                metrics::counter!("strongbox_auth_failures_total", "scheme" => "bearer")
                    .increment(1);
                Err(GatewayError::NotAuthenticated)
            }
        }
    }

    /// Check a raw `Authorization` header value as a client credential.
    pub async fn authenticate_client_header(&self, header: Option<&str>) -> GatewayResult<Client> {
        match header.and_then(parse_bearer) {
            Some(token) => self.authenticate_client(token).await,
            None => {
                tracing::debug!("Missing or malformed Bearer credential");
                metrics::counter!("strongbox_auth_failures_total", "scheme" => "bearer")
                    .increment(1);
                Err(GatewayError::NotAuthenticated)
            }
        }
    }
}
