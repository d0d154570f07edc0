// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Quota Ledger Rules
//!
//! Pure accounting rules shared by the admin and file paths. Nothing here
//! touches the filesystem or the registry; the application-level
//! `QuotaLedger` feeds these functions with current values.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Quota checks, overwrite delta and clamped usage updates

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Quota exceeded: requested {requested_bytes} bytes, available {available_bytes} bytes")]
    QuotaExceeded {
        requested_bytes: u64,
        available_bytes: u64,
    },

    #[error("Quota of {quota} bytes is below the {used_space} bytes already in use")]
    QuotaShrinkBelowUsage { quota: u64, used_space: u64 },
}

/// Snapshot of the host's capacity and the sum of all client reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    /// Raw physical free bytes of the storage root
    pub available: u64,
    /// Sum of `quota` over all clients
    pub reserved: u64,
}

impl Capacity {
    /// Free space not yet promised to any client; zero when overcommitted.
    pub fn available_minus_reserved(&self) -> u64 {
        clamp_to_u64(i128::from(self.available) - i128::from(self.reserved))
    }

    /// Free space as seen by a client whose current reservation `quota`
    /// is given back before comparing against its new quota.
    pub fn available_plus_one_client(&self, quota: u64) -> u64 {
        clamp_to_u64(
            i128::from(self.available) - i128::from(self.reserved) + i128::from(quota),
        )
    }

    pub fn check_create(&self, quota: u64) -> Result<(), LedgerError> {
        let available = self.available_minus_reserved();
        if quota > available {
            return Err(LedgerError::QuotaExceeded {
                requested_bytes: quota,
                available_bytes: available,
            });
        }
        Ok(())
    }

    pub fn check_resize(
        &self,
        old_quota: u64,
        new_quota: u64,
        used_space: u64,
    ) -> Result<(), LedgerError> {
        let available = self.available_plus_one_client(old_quota);
        if new_quota > available {
            return Err(LedgerError::QuotaExceeded {
                requested_bytes: new_quota,
                available_bytes: available,
            });
        }
        if new_quota < used_space {
            return Err(LedgerError::QuotaShrinkBelowUsage {
                quota: new_quota,
                used_space,
            });
        }
        Ok(())
    }
}

fn clamp_to_u64(value: i128) -> u64 {
    value.clamp(0, i128::from(u64::MAX)) as u64
}

/// Reject a write of `incoming_size` bytes that does not fit in what is left
/// of the quota.
pub fn check_write(quota: u64, used_space: u64, incoming_size: u64) -> Result<(), LedgerError> {
    let remaining = quota.saturating_sub(used_space);
    if remaining < incoming_size {
        return Err(LedgerError::QuotaExceeded {
            requested_bytes: incoming_size,
            available_bytes: remaining,
        });
    }
    Ok(())
}

/// Apply a signed delta to a usage counter with a floor of zero.
pub fn apply_delta(used_space: u64, delta: i64) -> u64 {
    if delta >= 0 {
        used_space.saturating_add(delta.unsigned_abs())
    } else {
        used_space.saturating_sub(delta.unsigned_abs())
    }
}

/// Storage cost of replacing `old` with `new`.
///
/// Counts the byte positions whose value differs over the length of the
/// shorter buffer, then adds `new.len() - old.len()`. An empty `old` means
/// "no prior content" and costs the full new length. This deliberately is
/// not `new.len() - old.len()`: an in-place rewrite of equal length still
/// costs one byte per changed position.
pub fn positional_delta(old: &[u8], new: &[u8]) -> i64 {
    if new.is_empty() || old.is_empty() {
        return new.len() as i64;
    }

    let changed = old
        .iter()
        .zip(new.iter())
        .filter(|(a, b)| a != b)
        .count() as i64;

    changed + (new.len() as i64 - old.len() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_fresh_file_is_full_length() {
        assert_eq!(positional_delta(b"", b"0123456789"), 10);
    }

    #[test]
    fn test_delta_same_length_counts_changed_positions() {
        let old = b"0123456789";
        let new = b"01X34Y678Z";
        assert_eq!(positional_delta(old, new), 3);
    }

    #[test]
    fn test_delta_identical_content_is_zero() {
        assert_eq!(positional_delta(b"abcdef", b"abcdef"), 0);
    }

    #[test]
    fn test_delta_growing_and_shrinking() {
        // one differing position in the common prefix, plus 2 extra bytes
        assert_eq!(positional_delta(b"abc", b"abXde"), 3);
        // identical prefix, shrinking by 3
        assert_eq!(positional_delta(b"abcdef", b"abc"), -3);
        // everything changes and shrinks: 3 changed - 3 shorter
        assert_eq!(positional_delta(b"abcdef", b"xyz"), 0);
    }

    #[test]
    fn test_apply_delta_clamps_at_zero() {
        assert_eq!(apply_delta(10, 3), 13);
        assert_eq!(apply_delta(13, -10), 3);
        assert_eq!(apply_delta(3, -10), 0);
        assert_eq!(apply_delta(u64::MAX, 1), u64::MAX);
        assert_eq!(apply_delta(5, i64::MIN), 0);
    }

    #[test]
    fn test_check_write_boundary() {
        assert!(check_write(100, 40, 60).is_ok());
        assert_eq!(
            check_write(100, 40, 61),
            Err(LedgerError::QuotaExceeded {
                requested_bytes: 61,
                available_bytes: 60
            })
        );
    }

    #[test]
    fn test_check_create_against_unreserved_space() {
        let capacity = Capacity { available: 1_000, reserved: 600 };
        assert_eq!(capacity.available_minus_reserved(), 400);
        assert!(capacity.check_create(400).is_ok());
        assert!(capacity.check_create(401).is_err());
    }

    #[test]
    fn test_overcommitted_capacity_clamps() {
        let capacity = Capacity { available: 100, reserved: 600 };
        assert_eq!(capacity.available_minus_reserved(), 0);
        assert_eq!(capacity.available_plus_one_client(550), 50);
        assert!(capacity.check_create(1).is_err());
    }

    #[test]
    fn test_check_resize() {
        let capacity = Capacity { available: 1_000, reserved: 600 };
        // client holds 200 of the 600 reserved: it may grow to 600
        assert!(capacity.check_resize(200, 600, 0).is_ok());
        assert!(matches!(
            capacity.check_resize(200, 601, 0),
            Err(LedgerError::QuotaExceeded { .. })
        ));
        assert!(capacity.check_resize(200, 50, 50).is_ok());
        assert_eq!(
            capacity.check_resize(200, 49, 50),
            Err(LedgerError::QuotaShrinkBelowUsage { quota: 49, used_space: 50 })
        );
    }
}
