// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Sanitizer Domain Service
//!
//! Resolves client-supplied paths into absolute paths inside that client's
//! sandbox root. This is a domain service (not infrastructure) because
//! containment is the core rule that lets tenants share one filesystem.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Path containment for every file operation

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Path sanitization errors
#[derive(Debug, Error)]
pub enum PathSanitizerError {
    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path outside sandbox boundary: {0}")]
    OutsideBoundary(String),

    #[error("Path too long: {0}")]
    PathTooLong(String),
}

/// Path sanitizer domain service
///
/// Every requested path is checked twice and both checks must agree:
///
/// 1. a literal scan of the raw string for `..` (and NUL bytes);
/// 2. a computed check: the path is re-rooted at the sandbox root and the
///    relative path from the root to the result must exist.
///
/// # Security Guarantees
/// - Rejects any request containing `..`, in any position
/// - Treats every request as absolute from the sandbox root; leading
///   separators, drive prefixes and `.` components are discarded
/// - The returned path always starts with the sandbox root
pub struct PathSanitizer {
    /// Maximum allowed path length (default: 4096)
    max_path_len: usize,
}

impl PathSanitizer {
    /// Create a new path sanitizer with default settings
    pub fn new() -> Self {
        Self { max_path_len: 4096 }
    }

    /// Create a path sanitizer with custom max length
    pub fn with_max_length(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    /// Resolve `requested` inside `sandbox_root`
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Absolute path guaranteed to lie inside `sandbox_root`
    /// * `Err(PathSanitizerError)` - Path is unsafe or invalid
    ///
    /// # Examples
    /// ```
    /// use strongbox_core::domain::path_sanitizer::PathSanitizer;
    /// use std::path::{Path, PathBuf};
    ///
    /// let sanitizer = PathSanitizer::new();
    /// let root = Path::new("/srv/storages/alice");
    ///
    /// let safe = sanitizer.resolve(root, "chunks/index").unwrap();
    /// assert_eq!(safe, PathBuf::from("/srv/storages/alice/chunks/index"));
    ///
    /// assert!(sanitizer.resolve(root, "../bob/chunks/index").is_err());
    /// ```
    pub fn resolve(
        &self,
        sandbox_root: &Path,
        requested: &str,
    ) -> Result<PathBuf, PathSanitizerError> {
        self.validate(requested)?;

        let rooted = format!("/{}", requested);
        let mut resolved = sandbox_root.to_path_buf();
        for component in Path::new(&rooted).components() {
            match component {
                Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
                Component::Normal(part) => resolved.push(part),
                Component::ParentDir => {
                    // Already rejected by validate, but double-check
                    return Err(PathSanitizerError::PathTraversal(requested.to_string()));
                }
            }
        }

        let relative = self.strip_sandbox_root(&resolved, sandbox_root)?;
        if relative.components().any(|c| c == Component::ParentDir) {
            return Err(PathSanitizerError::OutsideBoundary(requested.to_string()));
        }

        Ok(resolved)
    }

    /// Validate a path without resolving it (lightweight check)
    pub fn validate(&self, path: &str) -> Result<(), PathSanitizerError> {
        if path.len() > self.max_path_len {
            return Err(PathSanitizerError::PathTooLong(path.to_string()));
        }

        if path.contains("..") {
            tracing::warn!(
                path = %path,
                "Path traversal attempt detected: contains '..'"
            );
            metrics::counter!("strongbox_path_rejections_total").increment(1);
            return Err(PathSanitizerError::PathTraversal(path.to_string()));
        }

        if path.contains('\0') {
            tracing::warn!(
                path = %path,
                "Path contains null byte (potential security issue)"
            );
            metrics::counter!("strongbox_path_rejections_total").increment(1);
            return Err(PathSanitizerError::InvalidPath(
                "Path contains null byte".to_string(),
            ));
        }

        Ok(())
    }

    /// Extract the sandbox-relative path from an absolute path
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - Relative path (e.g., "chunks/index")
    /// * `Err(PathSanitizerError)` - Path is not under the sandbox root
    pub fn strip_sandbox_root(
        &self,
        absolute_path: &Path,
        sandbox_root: &Path,
    ) -> Result<PathBuf, PathSanitizerError> {
        absolute_path
            .strip_prefix(sandbox_root)
            .map(|p| p.to_path_buf())
            .map_err(|_| {
                tracing::warn!(
                    path = %absolute_path.display(),
                    root = %sandbox_root.display(),
                    "Path outside sandbox boundary detected"
                );
                PathSanitizerError::OutsideBoundary(absolute_path.display().to_string())
            })
    }

    /// Client-facing form of a resolved path: `/` followed by the
    /// sandbox-relative components.
    pub fn display_path(
        &self,
        absolute_path: &Path,
        sandbox_root: &Path,
    ) -> Result<String, PathSanitizerError> {
        let relative = self.strip_sandbox_root(absolute_path, sandbox_root)?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Ok(format!("/{}", parts.join("/")))
    }
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new()
    }
}
