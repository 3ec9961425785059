// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Gen9 (Skylake) factories.

use crate::codechal::create_codec_device;
use crate::codechal::CodecDevice;
use crate::codechal::CodecDeviceFactory;
use crate::codechal::CodecError;
use crate::codechal::CodecHwInterface;
use crate::codechal::CodecSettings;
use crate::codechal::GenCodecParams;
use crate::codechal::HucProductFamily;
use crate::codechal::KernelBase;
use crate::codechal::StandardInfo;
use crate::device::create_mmd;
use crate::device::create_mosutil;
use crate::device::CmHalDevice;
use crate::device::CmHalFactory;
use crate::device::CmState;
use crate::device::DecodeHistogramDevice;
use crate::device::DecodeHistogramFactory;
use crate::device::DeviceError;
use crate::device::GtTier;
use crate::device::HistogramEngine;
use crate::device::MmdDevice;
use crate::device::MmdFactory;
use crate::device::MosUtilDevice;
use crate::device::MosUtilFactory;
use crate::device::Nv12ToP010Device;
use crate::device::Nv12ToP010Factory;
use crate::device::RenderHalDevice;
use crate::device::RenderHalFactory;
use crate::device::VphalFactory;
use crate::device::VphalState;
use crate::mhw::build_bundle;
use crate::mhw::MhwBundle;
use crate::mhw::MhwConfig;
use crate::mhw::MhwError;
use crate::mhw::MhwFactory;
use crate::os::OsInterface;
use crate::registry::MediaRegistries;
use crate::Generation;
use crate::PlatformKey;

const GEN: Generation = Generation::Gen9;

pub(crate) const CODEC_PARAMS: GenCodecParams = GenCodecParams {
    gen: GEN,
    huc_family: HucProductFamily::Skylake,
    slice_power_gate: false,
    kernel_base: KernelBase("igcodeckrn_g9"),
};

const CM_PLATFORM_FAMILY: u32 = 8;
const CM_PLATFORM_NAME: &str = "SKL";
const CM_SUPPORTED_CISA_IDS: [u32; 1] = [9];

pub struct Gen9Mhw;

impl MhwFactory for Gen9Mhw {
    fn build(&self, os: &dyn OsInterface, config: &MhwConfig) -> Result<MhwBundle, MhwError> {
        build_bundle(GEN, os, config)
    }
}

pub struct Gen9Codec;

impl CodecDeviceFactory for Gen9Codec {
    fn create(
        &self,
        info: &StandardInfo,
        settings: Option<&CodecSettings>,
        mhw: &MhwBundle,
        os: &dyn OsInterface,
    ) -> Result<CodecDevice, CodecError> {
        create_codec_device(&CODEC_PARAMS, info, settings, mhw, os)
    }
}

pub struct Gen9Vphal;

impl VphalFactory for Gen9Vphal {
    fn create(&self, os: &dyn OsInterface) -> Result<VphalState, DeviceError> {
        Ok(VphalState {
            gen: GEN,
            platform: os.platform(),
        })
    }
}

pub struct Gen9RenderHal;

impl RenderHalFactory for Gen9RenderHal {
    fn create(&self) -> Result<RenderHalDevice, DeviceError> {
        Ok(RenderHalDevice { gen: GEN })
    }
}

pub struct Gen9MosUtil;

impl MosUtilFactory for Gen9MosUtil {
    fn create(&self) -> Result<MosUtilDevice, DeviceError> {
        create_mosutil(GEN)
    }
}

pub struct Gen9CmHal;

impl CmHalFactory for Gen9CmHal {
    fn create(&self, _state: &CmState) -> Result<CmHalDevice, DeviceError> {
        let mut device = CmHalDevice::new(GEN, CM_PLATFORM_FAMILY, GtTier::Gt2, CM_PLATFORM_NAME);
        device.add_supported_cisa_ids(&CM_SUPPORTED_CISA_IDS);
        Ok(device)
    }
}

pub struct Gen9Mmd;

impl MmdFactory for Gen9Mmd {
    fn create(&self, os: &dyn OsInterface, mhw: &MhwBundle) -> Result<MmdDevice, DeviceError> {
        create_mmd(GEN, os, mhw)
    }
}

pub struct Gen9DecodeHistogram;

impl DecodeHistogramFactory for Gen9DecodeHistogram {
    fn create(
        &self,
        _hw: &CodecHwInterface,
        _os: &dyn OsInterface,
    ) -> Result<DecodeHistogramDevice, DeviceError> {
        Ok(DecodeHistogramDevice {
            gen: GEN,
            engine: HistogramEngine::Render,
        })
    }
}

pub struct Gen9Nv12ToP010;

impl Nv12ToP010Factory for Gen9Nv12ToP010 {
    fn create(&self, _os: &dyn OsInterface) -> Result<Nv12ToP010Device, DeviceError> {
        Ok(Nv12ToP010Device { gen: GEN })
    }
}

/// Registers every gen9 factory under the Skylake platform key.
pub fn register(registries: &mut MediaRegistries) {
    let key = PlatformKey::SKYLAKE;
    registries.mhw.register(key, Box::new(Gen9Mhw));
    registries.codec.register(key, Box::new(Gen9Codec));
    registries.vphal.register(key, Box::new(Gen9Vphal));
    registries.renderhal.register(key, Box::new(Gen9RenderHal));
    registries.mosutil.register(key, Box::new(Gen9MosUtil));
    registries.cmhal.register(key, Box::new(Gen9CmHal));
    registries.mmd.register(key, Box::new(Gen9Mmd));
    registries
        .decode_histogram
        .register(key, Box::new(Gen9DecodeHistogram));
    registries
        .nv12_to_p010
        .register(key, Box::new(Gen9Nv12ToP010));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::tests::FakeOs;

    #[test]
    fn cm_device_carries_the_skl_identity() {
        let os = FakeOs::new(PlatformKey::SKYLAKE);
        let state = CmState {
            platform: os.platform(),
            gt: os.gt.unwrap(),
        };
        let device = Gen9CmHal.create(&state).unwrap();
        assert_eq!(device.platform_family, 8);
        assert_eq!(device.platform_name, "SKL");
        assert_eq!(device.supported_cisa_ids, vec![9]);
        assert!(!device.override_power_option_per_gpu_context);
        assert!(!device.request_shutdown_subslices_for_vme);
        assert!(!device.decompress_enabled);
    }

    #[test]
    fn p010_conversion_is_offered() {
        let os = FakeOs::new(PlatformKey::SKYLAKE);
        assert!(Gen9Nv12ToP010.create(&os).is_ok());
    }
}
