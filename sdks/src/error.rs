// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Gateway answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("TLS setup failed: {0}")]
    Tls(#[from] rustls::Error),

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SdkError {
    /// True for a 404 from the gateway
    pub fn is_not_found(&self) -> bool {
        matches!(self, SdkError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

pub type Result<T> = std::result::Result<T, SdkError>;
