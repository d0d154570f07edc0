// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::io;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

use windows_sys::Win32::Storage::FileSystem::GetDiskFreeSpaceExW;

use crate::domain::space_probe::{ProbeError, SpaceProbe};

/// `GetDiskFreeSpaceExW` backed probe: bytes available to the calling user.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFreeSpaceProbe;

impl DiskFreeSpaceProbe {
    pub fn new() -> Self {
        Self
    }
}

impl SpaceProbe for DiskFreeSpaceProbe {
    fn available_bytes(&self, root: &Path) -> Result<u64, ProbeError> {
        let wide: Vec<u16> = root.as_os_str().encode_wide().chain(Some(0)).collect();
        if wide[..wide.len() - 1].contains(&0) {
            return Err(ProbeError::InvalidRoot(root.to_path_buf()));
        }

        let mut free_to_caller: u64 = 0;
        // SAFETY: `wide` is NUL-terminated; the out pointers are valid or null.
        let ok = unsafe {
            GetDiskFreeSpaceExW(
                wide.as_ptr(),
                &mut free_to_caller,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
            )
        };
        if ok == 0 {
            return Err(ProbeError::Unstatable {
                path: root.to_path_buf(),
                source: io::Error::last_os_error(),
            });
        }
        Ok(free_to_caller)
    }
}
