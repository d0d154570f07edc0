// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Gateway Errors
//!
//! The single error type returned by every application service. Lower
//! layers keep their own `thiserror` enums; they are folded in here via
//! `From` so services can use `?` throughout. The presentation layer maps
//! each variant to an HTTP status.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::client::ClientNameError;
use crate::domain::ledger::LedgerError;
use crate::domain::path_sanitizer::PathSanitizerError;
use crate::domain::repository::RepositoryError;
use crate::domain::space_probe::ProbeError;
use crate::infrastructure::certs::CertificateError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathSanitizerError),

    #[error("Invalid client name: {0}")]
    InvalidName(#[from] ClientNameError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Refusing to store empty content")]
    EmptyUpload,

    #[error("Quota exceeded: requested {requested_bytes} bytes, available {available_bytes} bytes")]
    QuotaExceeded {
        requested_bytes: u64,
        available_bytes: u64,
    },

    #[error("Quota of {quota} bytes is below the {used_space} bytes already in use")]
    QuotaShrinkBelowUsage { quota: u64, used_space: u64 },

    #[error("Cannot delete a directory: {0}")]
    CannotDeleteDirectory(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("A client named '{0}' already exists")]
    NameConflict(String),

    #[error("Free space probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry error: {0}")]
    Repository(RepositoryError),

    #[error("Ledger out of sync with storage for client {client_id}: {detail}")]
    LedgerOutOfSync { client_id: i64, detail: String },

    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),
}

impl GatewayError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Helper for `map_err` at filesystem call sites
    pub fn io_at(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::io(path, source)
    }
}

impl From<LedgerError> for GatewayError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::QuotaExceeded {
                requested_bytes,
                available_bytes,
            } => Self::QuotaExceeded {
                requested_bytes,
                available_bytes,
            },
            LedgerError::QuotaShrinkBelowUsage { quota, used_space } => {
                Self::QuotaShrinkBelowUsage { quota, used_space }
            }
        }
    }
}

impl From<RepositoryError> for GatewayError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => Self::NotFound(what),
            other => Self::Repository(other),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
