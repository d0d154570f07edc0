// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`strongbox-core`)
//!
//! HTTP surface that translates external requests into application service
//! calls. **No business logic lives here**; all real work is delegated to
//! application services in `crate::application`.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`api`] | axum router, authentication extractors and handlers |
//! | [`error`] | `GatewayError` to HTTP status / JSON body mapping |

pub mod api;
pub mod error;
