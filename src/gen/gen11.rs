// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Gen11 (Ice Lake LP) factories.

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

const GEN: Generation = Generation::Gen11;

pub(crate) const CODEC_PARAMS: GenCodecParams = GenCodecParams {
    gen: GEN,
    huc_family: HucProductFamily::Icelake,
    slice_power_gate: true,
    kernel_base: KernelBase("igcodeckrn_g11"),
};

const CM_PLATFORM_FAMILY: u32 = 13;
const CM_PLATFORM_NAME: &str = "ICLLP";
const CM_SUPPORTED_CISA_IDS: [u32; 1] = [10];

pub struct Gen11Mhw;

impl MhwFactory for Gen11Mhw {
    fn build(&self, os: &dyn OsInterface, config: &MhwConfig) -> Result<MhwBundle, MhwError> {
        build_bundle(GEN, os, config)
    }
}

pub struct Gen11Codec;

impl CodecDeviceFactory for Gen11Codec {
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

pub struct Gen11Vphal;

impl VphalFactory for Gen11Vphal {
    fn create(&self, os: &dyn OsInterface) -> Result<VphalState, DeviceError> {
        Ok(VphalState {
            gen: GEN,
            platform: os.platform(),
        })
    }
}

pub struct Gen11RenderHal;

impl RenderHalFactory for Gen11RenderHal {
    fn create(&self) -> Result<RenderHalDevice, DeviceError> {
        Ok(RenderHalDevice { gen: GEN })
    }
}

pub struct Gen11MosUtil;

impl MosUtilFactory for Gen11MosUtil {
    fn create(&self) -> Result<MosUtilDevice, DeviceError> {
        create_mosutil(GEN)
    }
}

pub struct Gen11CmHal;

impl CmHalFactory for Gen11CmHal {
    fn create(&self, _state: &CmState) -> Result<CmHalDevice, DeviceError> {
        let mut device = CmHalDevice::new(GEN, CM_PLATFORM_FAMILY, GtTier::Gt2, CM_PLATFORM_NAME);
        device.add_supported_cisa_ids(&CM_SUPPORTED_CISA_IDS);
        device.set_override_power_option_per_gpu_context(true);
        device.set_request_shutdown_subslices_for_vme_usage(true);
        device.set_decompress_flag(true);
        Ok(device)
    }
}

pub struct Gen11Mmd;

impl MmdFactory for Gen11Mmd {
    fn create(&self, os: &dyn OsInterface, mhw: &MhwBundle) -> Result<MmdDevice, DeviceError> {
        create_mmd(GEN, os, mhw)
    }
}

pub struct Gen11DecodeHistogram;

impl DecodeHistogramFactory for Gen11DecodeHistogram {
    fn create(
        &self,
        _hw: &CodecHwInterface,
        _os: &dyn OsInterface,
    ) -> Result<DecodeHistogramDevice, DeviceError> {
        // Histogram collection moved off the render engine on gen11.
        Ok(DecodeHistogramDevice {
            gen: GEN,
            engine: HistogramEngine::Vebox,
        })
    }
}

pub struct Gen11Nv12ToP010;

impl Nv12ToP010Factory for Gen11Nv12ToP010 {
    fn create(&self, _os: &dyn OsInterface) -> Result<Nv12ToP010Device, DeviceError> {
        Err(DeviceError::Unsupported("nv12 to p010 conversion"))
    }
}

/// Registers every gen11 factory under the Ice Lake LP platform key.
pub fn register(registries: &mut MediaRegistries) {
    let key = PlatformKey::ICELAKE_LP;
    registries.mhw.register(key, Box::new(Gen11Mhw));
    registries.codec.register(key, Box::new(Gen11Codec));
    registries.vphal.register(key, Box::new(Gen11Vphal));
    registries.renderhal.register(key, Box::new(Gen11RenderHal));
    registries.mosutil.register(key, Box::new(Gen11MosUtil));
    registries.cmhal.register(key, Box::new(Gen11CmHal));
    registries.mmd.register(key, Box::new(Gen11Mmd));
    registries
        .decode_histogram
        .register(key, Box::new(Gen11DecodeHistogram));
    registries
        .nv12_to_p010
        .register(key, Box::new(Gen11Nv12ToP010));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::tests::FakeOs;

    #[test]
    fn cm_device_carries_the_icllp_identity() {
        let os = FakeOs::new(PlatformKey::ICELAKE_LP);
        let state = CmState {
            platform: os.platform(),
            gt: os.gt.unwrap(),
        };
        let device = Gen11CmHal.create(&state).unwrap();
        assert_eq!(device.platform_family, 13);
        assert_eq!(device.gt_tier, GtTier::Gt2);
        assert_eq!(device.platform_name, "ICLLP");
        assert_eq!(device.supported_cisa_ids, vec![10]);
        assert!(device.override_power_option_per_gpu_context);
        assert!(device.request_shutdown_subslices_for_vme);
        assert!(device.decompress_enabled);
    }

    #[test]
    fn p010_conversion_is_not_offered() {
        let os = FakeOs::new(PlatformKey::ICELAKE_LP);
        match Gen11Nv12ToP010.create(&os) {
            Err(DeviceError::Unsupported(_)) => (),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
