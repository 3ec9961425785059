// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Seams to the kernel-mode driver and OS abstraction. The driver core only
//! ever talks to these traits; concrete implementations live outside this
//! crate.

use crate::PlatformKey;

/// GT topology as reported by the kernel-mode driver.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GtSystemInfo {
    pub slice_count: u32,
    pub subslice_count: u32,
    pub eu_count: u32,
}

/// State-heap manager behavior requested for a session.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HeapMode {
    #[default]
    Standard,
    Simulated,
}

/// OS/device handle given to every construction path.
pub trait OsInterface {
    /// Platform this device node belongs to.
    fn platform(&self) -> PlatformKey;

    /// Queries GT topology. `None` if the kernel-mode query failed.
    fn gt_system_info(&self) -> Option<GtSystemInfo>;
}

/// Raw buffer-object handle of a GPU resource.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoHandle(pub u64);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SurfaceFormat {
    Nv12,
    P010,
    Buffer,
    Buffer2d,
}

/// A GPU resource descriptor, the unit handed to the hardware-submission
/// layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OsResource {
    pub bo: BoHandle,
    pub format: SurfaceFormat,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) struct FakeOs {
        pub platform: PlatformKey,
        pub gt: Option<GtSystemInfo>,
    }

    impl FakeOs {
        pub(crate) fn new(platform: PlatformKey) -> Self {
            Self {
                platform,
                gt: Some(GtSystemInfo {
                    slice_count: 1,
                    subslice_count: 8,
                    eu_count: 64,
                }),
            }
        }
    }

    impl OsInterface for FakeOs {
        fn platform(&self) -> PlatformKey {
            self.platform
        }

        fn gt_system_info(&self) -> Option<GtSystemInfo> {
            self.gt
        }
    }
}
