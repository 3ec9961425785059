// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! End-to-end device selection through the public API: registry setup,
//! platform probe, bundle construction and codec device dispatch.

use igfx_media::codechal::create_codec_for_platform;
use igfx_media::codechal::CodecDevice;
use igfx_media::codechal::CodecFunction;
use igfx_media::codechal::CodecMode;
use igfx_media::codechal::DecoderKind;
use igfx_media::codechal::EncoderKind;
use igfx_media::codechal::HucProductFamily;
use igfx_media::codechal::StandardInfo;
use igfx_media::os::GtSystemInfo;
use igfx_media::os::OsInterface;
use igfx_media::registry::MediaRegistries;
use igfx_media::MediaStatus;
use igfx_media::PlatformKey;

struct TestOs {
    platform: PlatformKey,
}

impl OsInterface for TestOs {
    fn platform(&self) -> PlatformKey {
        self.platform
    }

    fn gt_system_info(&self) -> Option<GtSystemInfo> {
        Some(GtSystemInfo {
            slice_count: 1,
            subslice_count: 8,
            eu_count: 64,
        })
    }
}

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn vp9_vdenc_encoder_on_icelake() {
    init();
    let registries = MediaRegistries::with_builtin_platforms();
    let os = TestOs {
        platform: PlatformKey::ICELAKE_LP,
    };
    let info = StandardInfo {
        mode: CodecMode::Vp9Enc,
        function: CodecFunction::EncodeVdenc,
    };
    let device = create_codec_for_platform(&registries, &os, &info, None).unwrap();
    match device {
        CodecDevice::Encoder(encoder) => {
            assert_eq!(encoder.kind, EncoderKind::Vp9Vdenc);
            assert!(encoder.csc_ds.is_some());
        }
        CodecDevice::Decoder(_) => panic!("expected an encoder"),
    }
}

#[test]
fn decoders_carry_their_generation_huc_family() {
    init();
    let registries = MediaRegistries::with_builtin_platforms();
    let info = StandardInfo {
        mode: CodecMode::HevcVld,
        function: CodecFunction::Decode,
    };

    for (platform, family) in [
        (PlatformKey::SKYLAKE, HucProductFamily::Skylake),
        (PlatformKey::ICELAKE_LP, HucProductFamily::Icelake),
    ] {
        let os = TestOs { platform };
        let device = create_codec_for_platform(&registries, &os, &info, None).unwrap();
        match device {
            CodecDevice::Decoder(decoder) => {
                assert_eq!(decoder.kind, DecoderKind::Hevc);
                assert_eq!(decoder.huc_family, family);
            }
            CodecDevice::Encoder(_) => panic!("expected a decoder"),
        }
    }
}

#[test]
fn unregistered_platform_is_not_found() {
    init();
    let registries = MediaRegistries::with_builtin_platforms();
    let os = TestOs {
        platform: PlatformKey(0xdead),
    };
    let info = StandardInfo {
        mode: CodecMode::AvcVld,
        function: CodecFunction::Decode,
    };
    match create_codec_for_platform(&registries, &os, &info, None) {
        Err(MediaStatus::InvalidParameter(_)) => (),
        other => panic!("unexpected result: {:?}", other.map(|_| ())),
    }
}
