// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Space Probe Trait
//!
//! Reports the physical free space behind the storage root. One
//! implementation exists per operating system family (see
//! `crate::infrastructure::space_probe`); the concrete type is chosen at
//! compile time and injected once when the service graph is built.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Storage root {path} is not statable: {source}")]
    Unstatable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Storage root path {0} cannot be passed to the OS")]
    InvalidRoot(PathBuf),
}

/// Free-space capability for a storage root
pub trait SpaceProbe: Send + Sync {
    /// Bytes available to unprivileged writers under `root`
    fn available_bytes(&self, root: &Path) -> Result<u64, ProbeError>;
}
