// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod auth;
pub mod client_service;
pub mod error;
pub mod file_gateway;
pub mod quota_ledger;
pub mod tenant_locks;

// Re-export services for convenience
pub use auth::AuthenticationGate;
pub use client_service::{ClientService, StandardClientService};
pub use error::{GatewayError, GatewayResult};
pub use file_gateway::{DeleteReceipt, FileGateway, FileStat, StandardFileGateway, UploadReceipt};
pub use quota_ledger::QuotaLedger;
pub use tenant_locks::TenantLocks;
