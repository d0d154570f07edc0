// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Per-client serialisation of ledger mutations.
//!
//! Every read-modify-write of a client's `used_space` (and every admin
//! rename/delete of that client) runs while holding the client's lock, so
//! two uploads for the same client cannot both pass the quota check against
//! the same stale value. Operations on different clients do not contend.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::client::ClientId;

#[derive(Default)]
pub struct TenantLocks {
    locks: DashMap<ClientId, Arc<Mutex<()>>>,
    reservations: Mutex<()>,
}

impl TenantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `client_id`, waiting for any operation in flight.
    pub async fn lock(&self, client_id: ClientId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the DashMap shard guard is released before
        // awaiting.
        let lock = self
            .locks
            .entry(client_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Lock guarding changes to the sum of quotas (client create/update).
    pub async fn lock_reservations(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.reservations.lock().await
    }

    /// Drop the lock entry of a deleted client.
    pub fn forget(&self, client_id: ClientId) {
        self.locks.remove(&client_id);
    }
}
