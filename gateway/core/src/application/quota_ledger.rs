// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Quota Ledger Application Service
//!
//! Combines the pure rules in `domain::ledger` with the two live inputs
//! they need: the free space of the storage root (asked fresh on every
//! call, never cached) and the sums of quota and used space in the registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::error::{GatewayError, GatewayResult};
use crate::domain::ledger::Capacity;
use crate::domain::repository::{ClientRepository, SummableField};
use crate::domain::space_probe::SpaceProbe;

pub struct QuotaLedger {
    probe: Arc<dyn SpaceProbe>,
    repository: Arc<dyn ClientRepository>,
    storage_root: PathBuf,
}

impl QuotaLedger {
    pub fn new(
        probe: Arc<dyn SpaceProbe>,
        repository: Arc<dyn ClientRepository>,
        storage_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            probe,
            repository,
            storage_root: storage_root.into(),
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Raw physical free bytes of the storage root.
    pub async fn available_space(&self) -> GatewayResult<u64> {
        let probe = self.probe.clone();
        let root = self.storage_root.clone();
        // statvfs/GetDiskFreeSpaceExW block; keep them off the reactor.
        let available = tokio::task::spawn_blocking(move || probe.available_bytes(&root))
            .await
            .map_err(|e| GatewayError::io(&self.storage_root, std::io::Error::other(e)))??;
        Ok(available)
    }

    pub async fn total_quota(&self) -> GatewayResult<u64> {
        Ok(self.repository.sum_by(SummableField::Quota).await?)
    }

    pub async fn total_used_space(&self) -> GatewayResult<u64> {
        Ok(self.repository.sum_by(SummableField::UsedSpace).await?)
    }

    /// Current capacity snapshot: free space and total reservations.
    pub async fn capacity(&self) -> GatewayResult<Capacity> {
        let available = self.available_space().await?;
        let reserved = self.total_quota().await?;
        Ok(Capacity {
            available,
            reserved,
        })
    }

    pub async fn available_minus_reserved(&self) -> GatewayResult<u64> {
        Ok(self.capacity().await?.available_minus_reserved())
    }

    pub async fn available_plus_one_client(&self, quota: u64) -> GatewayResult<u64> {
        Ok(self.capacity().await?.available_plus_one_client(quota))
    }

    pub async fn check_create(&self, quota: u64) -> GatewayResult<()> {
        let capacity = self.capacity().await?;
        if let Err(e) = capacity.check_create(quota) {
            tracing::warn!(
                quota,
                available = capacity.available,
                reserved = capacity.reserved,
                "Rejected client quota"
            );
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn check_resize(
        &self,
        old_quota: u64,
        new_quota: u64,
        used_space: u64,
    ) -> GatewayResult<()> {
        let capacity = self.capacity().await?;
        if let Err(e) = capacity.check_resize(old_quota, new_quota, used_space) {
            tracing::warn!(
                old_quota,
                new_quota,
                used_space,
                available = capacity.available,
                reserved = capacity.reserved,
                "Rejected quota change"
            );
            return Err(e.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::client::NewClient;
    use crate::domain::space_probe::ProbeError;
    use crate::infrastructure::repositories::InMemoryClientRepository;

    struct FixedProbe(u64);

    impl SpaceProbe for FixedProbe {
        fn available_bytes(&self, _root: &Path) -> Result<u64, ProbeError> {
            Ok(self.0)
        }
    }

    struct BrokenProbe;

    impl SpaceProbe for BrokenProbe {
        fn available_bytes(&self, root: &Path) -> Result<u64, ProbeError> {
            Err(ProbeError::Unstatable {
                path: root.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    #[tokio::test]
    async fn test_reservations_reduce_available() {
        let repo = Arc::new(InMemoryClientRepository::new());
        repo.create(NewClient::new("a", 300)).await.unwrap();
        let ledger = QuotaLedger::new(Arc::new(FixedProbe(1_000)), repo, "/srv");

        assert_eq!(ledger.available_space().await.unwrap(), 1_000);
        assert_eq!(ledger.available_minus_reserved().await.unwrap(), 700);
        assert_eq!(ledger.available_plus_one_client(300).await.unwrap(), 1_000);
        assert!(ledger.check_create(700).await.is_ok());
        assert!(matches!(
            ledger.check_create(701).await,
            Err(GatewayError::QuotaExceeded { .. })
        ));
    }

    #[tokio::test]
    async fn test_probe_failure_surfaces() {
        let repo = Arc::new(InMemoryClientRepository::new());
        let ledger = QuotaLedger::new(Arc::new(BrokenProbe), repo, "/srv");
        assert!(matches!(ledger.check_create(1).await, Err(GatewayError::Probe(_))));
    }
}
