// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-subsystem device façades.
//!
//! Every façade follows the same contract: validate the collaborators it was
//! handed, construct exactly one owned device, and either return it fully
//! initialized or return an error with nothing left behind. A façade with a
//! secondary initialization step drops the half-built device on failure; no
//! partially-initialized device is ever exposed.

use thiserror::Error;

use crate::codechal::CodecHwInterface;
use crate::mhw::MhwBundle;
use crate::os::GtSystemInfo;
use crate::os::HeapMode;
use crate::os::OsInterface;
use crate::Generation;
use crate::MediaStatus;
use crate::PlatformKey;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("invalid argument: missing {0}")]
    MissingCollaborator(&'static str),
    #[error("allocation failed: {0}")]
    OutOfSpace(&'static str),
    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

impl From<DeviceError> for MediaStatus {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::MissingCollaborator(what) => MediaStatus::InvalidParameter(what),
            DeviceError::OutOfSpace(what) => MediaStatus::AllocationFailed(what),
            DeviceError::Unsupported(what) => MediaStatus::InvalidParameter(what),
        }
    }
}

/// Video-post-processing state owned by a VPHAL session.
#[derive(Debug)]
pub struct VphalState {
    pub gen: Generation,
    pub platform: PlatformKey,
}

pub trait VphalFactory {
    fn create(&self, os: &dyn OsInterface) -> Result<VphalState, DeviceError>;
}

#[derive(Debug)]
pub struct RenderHalDevice {
    pub gen: Generation,
}

pub trait RenderHalFactory {
    fn create(&self) -> Result<RenderHalDevice, DeviceError>;
}

#[derive(Debug)]
pub struct MosUtilDevice {
    pub gen: Generation,
    initialized: bool,
}

impl MosUtilDevice {
    fn new(gen: Generation) -> Self {
        Self {
            gen,
            initialized: false,
        }
    }

    /// Secondary initialization step. The factory drops the device if this
    /// fails.
    fn initialize(&mut self) -> Result<(), DeviceError> {
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

pub trait MosUtilFactory {
    fn create(&self) -> Result<MosUtilDevice, DeviceError>;
}

pub(crate) fn create_mosutil(gen: Generation) -> Result<MosUtilDevice, DeviceError> {
    let mut device = MosUtilDevice::new(gen);
    device.initialize()?;
    Ok(device)
}

/// Media-memory-decompression device.
#[derive(Debug)]
pub struct MmdDevice {
    pub gen: Generation,
}

pub trait MmdFactory {
    fn create(&self, os: &dyn OsInterface, mhw: &MhwBundle) -> Result<MmdDevice, DeviceError>;
}

pub(crate) fn create_mmd(
    gen: Generation,
    _os: &dyn OsInterface,
    mhw: &MhwBundle,
) -> Result<MmdDevice, DeviceError> {
    let Some(render) = mhw.render.as_ref() else {
        return Err(DeviceError::MissingCollaborator("render interface"));
    };

    // Decompression kernels run out of the hardware state heap.
    if render.heap_mode == HeapMode::Simulated {
        log::error!("mmd: device initialization failed with a simulated state heap");
        return Err(DeviceError::OutOfSpace("media decompression device"));
    }

    Ok(MmdDevice { gen })
}

/// GT tier stamped on the CM device.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GtTier {
    Gt1,
    Gt2,
    Gt3,
    Gt4,
}

/// Runtime state of a CM (media compute) session.
#[derive(Debug)]
pub struct CmState {
    pub platform: PlatformKey,
    pub gt: GtSystemInfo,
}

/// CM device carrying fixed per-generation identity and behavioral toggles.
#[derive(Debug)]
pub struct CmHalDevice {
    pub gen: Generation,
    pub platform_family: u32,
    pub gt_tier: GtTier,
    pub platform_name: &'static str,
    pub supported_cisa_ids: Vec<u32>,
    pub override_power_option_per_gpu_context: bool,
    pub request_shutdown_subslices_for_vme: bool,
    pub decompress_enabled: bool,
}

impl CmHalDevice {
    pub(crate) fn new(gen: Generation, family: u32, tier: GtTier, name: &'static str) -> Self {
        Self {
            gen,
            platform_family: family,
            gt_tier: tier,
            platform_name: name,
            supported_cisa_ids: Vec::new(),
            override_power_option_per_gpu_context: false,
            request_shutdown_subslices_for_vme: false,
            decompress_enabled: false,
        }
    }

    pub(crate) fn add_supported_cisa_ids(&mut self, ids: &[u32]) {
        self.supported_cisa_ids.extend_from_slice(ids);
    }

    pub(crate) fn set_override_power_option_per_gpu_context(&mut self, enable: bool) {
        self.override_power_option_per_gpu_context = enable;
    }

    pub(crate) fn set_request_shutdown_subslices_for_vme_usage(&mut self, enable: bool) {
        self.request_shutdown_subslices_for_vme = enable;
    }

    pub(crate) fn set_decompress_flag(&mut self, enable: bool) {
        self.decompress_enabled = enable;
    }
}

pub trait CmHalFactory {
    fn create(&self, state: &CmState) -> Result<CmHalDevice, DeviceError>;
}

/// Engine a decode histogram is collected on; gen9 uses the render engine,
/// gen11 moved collection to VEBOX.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HistogramEngine {
    Render,
    Vebox,
}

#[derive(Debug)]
pub struct DecodeHistogramDevice {
    pub gen: Generation,
    pub engine: HistogramEngine,
}

pub trait DecodeHistogramFactory {
    fn create(
        &self,
        hw: &CodecHwInterface,
        os: &dyn OsInterface,
    ) -> Result<DecodeHistogramDevice, DeviceError>;
}

#[derive(Debug)]
pub struct Nv12ToP010Device {
    pub gen: Generation,
}

pub trait Nv12ToP010Factory {
    fn create(&self, os: &dyn OsInterface) -> Result<Nv12ToP010Device, DeviceError>;
}
