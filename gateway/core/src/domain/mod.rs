// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Tenants, quota rules, path containment and the persistence and
//! free-space contracts the outer layers implement.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types and rules; no I/O besides the traits it declares

pub mod client;
pub mod gateway_config;
pub mod ledger;
pub mod path_sanitizer;
pub mod repository;
pub mod space_probe;
