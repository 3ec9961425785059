// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Core of a media driver stack for Intel integrated graphics.
//!
//! The crate covers hardware-abstraction (MHW) bundle construction, the
//! per-subsystem device façades, the codec device selector and the
//! VAAPI-facing VP9 encode DDI state machine. Command-buffer programming,
//! kernel-mode services and surface management are external collaborators
//! reached through the seams in [`os`] and [`ddi`].

pub mod codechal;
pub mod ddi;
pub mod device;
pub mod gen;
pub mod mhw;
pub mod os;
pub mod registry;

use thiserror::Error;

/// Opaque identifier of a hardware generation/SKU, used only as a registry
/// lookup key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlatformKey(pub u32);

impl PlatformKey {
    pub const SKYLAKE: PlatformKey = PlatformKey(0x0900);
    pub const ICELAKE_LP: PlatformKey = PlatformKey(0x0b01);
}

/// Hardware generation implemented by this crate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Generation {
    Gen9,
    Gen11,
}

impl Generation {
    pub fn name(self) -> &'static str {
        match self {
            Generation::Gen9 => "gen9",
            Generation::Gen11 => "gen11",
        }
    }
}

/// Status codes surfaced across the driver boundary. `Ok(())` stands in for
/// the success code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaStatus {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("invalid buffer: {0}")]
    InvalidBuffer(&'static str),
    #[error("invalid context: {0}")]
    InvalidContext(&'static str),
    #[error("allocation failed: {0}")]
    AllocationFailed(&'static str),
    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),
    #[error("encoding error")]
    EncodingError,
}

pub type MediaResult<T> = Result<T, MediaStatus>;
