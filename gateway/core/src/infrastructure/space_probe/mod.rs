// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Platform Space Probes
//!
//! One `SpaceProbe` implementation per operating system family. The
//! `PlatformSpaceProbe` alias names the one compiled for the current target;
//! startup constructs it once and injects it into the quota ledger.

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::StatvfsProbe;
#[cfg(windows)]
pub use windows::DiskFreeSpaceProbe;

#[cfg(unix)]
pub type PlatformSpaceProbe = StatvfsProbe;
#[cfg(windows)]
pub type PlatformSpaceProbe = DiskFreeSpaceProbe;
