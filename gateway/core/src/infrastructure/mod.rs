// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure Layer
//!
//! Adapters behind the domain traits: the SQLite client registry, the
//! per-OS free-space probes and certificate provisioning.

pub mod certs;
pub mod db;
pub mod repositories;
pub mod space_probe;
