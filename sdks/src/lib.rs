// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Strongbox Rust SDK
//!
//! Client side of a Strongbox gateway: bearer-authenticated file operations
//! and the trust-on-first-use certificate bootstrap.
//!
//! ```no_run
//! # async fn demo() -> strongbox_sdk::Result<()> {
//! use strongbox_sdk::{CertificatePin, StrongboxClient};
//!
//! let token = "…";
//! let pin = CertificatePin::fetch("http://backup.lan:42024", token).await?;
//! pin.persist(std::path::Path::new("gateway.pem"))?;
//!
//! let client = StrongboxClient::with_pin("https://backup.lan:42025", token, &pin)?;
//! client.upload("/chunks/a", b"hello".to_vec()).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod pinning;
pub mod types;

pub use client::{StrongboxClient, CHUNK_INDEX_PATH};
pub use error::{Result, SdkError};
pub use pinning::{CertificatePin, PinnedCertVerifier};
pub use types::*;
