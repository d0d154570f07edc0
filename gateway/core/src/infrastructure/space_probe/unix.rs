// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::ffi::CString;
use std::io;
use std::mem::MaybeUninit;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::domain::space_probe::{ProbeError, SpaceProbe};

/// `statvfs(3)` backed probe: blocks available to unprivileged users times
/// the fragment size.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatvfsProbe;

impl StatvfsProbe {
    pub fn new() -> Self {
        Self
    }
}

impl SpaceProbe for StatvfsProbe {
    fn available_bytes(&self, root: &Path) -> Result<u64, ProbeError> {
        let c_path = CString::new(root.as_os_str().as_bytes())
            .map_err(|_| ProbeError::InvalidRoot(root.to_path_buf()))?;

        let mut stat = MaybeUninit::<libc::statvfs>::uninit();
        // SAFETY: `c_path` is a valid NUL-terminated string and `stat` points
        // to writable memory of the right size; it is only read on success.
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
        if rc != 0 {
            return Err(ProbeError::Unstatable {
                path: root.to_path_buf(),
                source: io::Error::last_os_error(),
            });
        }
        // SAFETY: statvfs returned 0, so the struct is initialised.
        let stat = unsafe { stat.assume_init() };

        #[allow(clippy::unnecessary_cast)]
        let available = (stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64);
        tracing::trace!(root = %root.display(), available, "statvfs");
        Ok(available)
    }
}
