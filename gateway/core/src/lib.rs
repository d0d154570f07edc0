// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Strongbox Core
//!
//! Multi-tenant storage gateway: per-client sandboxes, quota accounting,
//! admin and client authentication, and the HTTP surface that exposes them.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain rules, application services, infrastructure
//!   adapters and the axum presentation layer

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
