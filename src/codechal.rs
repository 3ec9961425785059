// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Codec device selection.
//!
//! Given a [`StandardInfo`] descriptor, the selector constructs the hardware
//! interface wrapper and exactly one concrete decoder or encoder, wiring in
//! the optional side interfaces (field scaling for interlaced downsampling,
//! CSC/downscale for encode pre-processing). The produced [`CodecDevice`] is
//! a sum type chosen at construction time; there is no runtime capability
//! probing after the fact.

use std::rc::Rc;

use thiserror::Error;

use crate::mhw::MhwBundle;
use crate::mhw::MhwConfig;
use crate::mhw::MhwFactory;
use crate::os::OsInterface;
use crate::registry::MediaRegistries;
use crate::Generation;
use crate::MediaResult;
use crate::MediaStatus;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),
    #[error("allocation failed: {0}")]
    OutOfSpace(&'static str),
}

impl From<CodecError> for MediaStatus {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidParameter(what) => MediaStatus::InvalidParameter(what),
            CodecError::OutOfSpace(what) => MediaStatus::AllocationFailed(what),
        }
    }
}

/// Codec plus operation mode requested for a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CodecMode {
    Mpeg2Idct,
    Mpeg2Vld,
    Vc1It,
    Vc1Vld,
    AvcVld,
    JpegVld,
    Vp8Vld,
    HevcVld,
    Vp9Vld,
    AvcEnc,
    JpegEnc,
    Mpeg2Enc,
    HevcEnc,
    Vp8Enc,
    Vp9Enc,
}

impl CodecMode {
    pub fn is_decode(self) -> bool {
        matches!(
            self,
            CodecMode::Mpeg2Idct
                | CodecMode::Mpeg2Vld
                | CodecMode::Vc1It
                | CodecMode::Vc1Vld
                | CodecMode::AvcVld
                | CodecMode::JpegVld
                | CodecMode::Vp8Vld
                | CodecMode::HevcVld
                | CodecMode::Vp9Vld
        )
    }
}

/// Direction and engine of the session.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CodecFunction {
    Decode,
    /// Encode on the VME (EU kernel) engine.
    EncodeVme,
    /// Encode on the VDENC fixed-function engine.
    EncodeVdenc,
}

impl CodecFunction {
    pub fn is_decode(self) -> bool {
        self == CodecFunction::Decode
    }

    pub fn uses_vdenc_engine(self) -> bool {
        self == CodecFunction::EncodeVdenc
    }
}

/// Immutable per-session descriptor supplied by the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StandardInfo {
    pub mode: CodecMode,
    pub function: CodecFunction,
}

/// Session settings passed down from the DDI layer.
#[derive(Clone, Debug, Default)]
pub struct CodecSettings {
    pub width: u32,
    pub height: u32,
    pub downsampling_hinted: bool,
}

/// Handle naming a generation's codec kernel blob. The ISA content itself is
/// out of scope and loaded elsewhere.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KernelBase(pub &'static str);

/// HuC firmware family the decoder is stamped with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HucProductFamily {
    Skylake,
    Icelake,
}

/// Hardware interface wrapper shared by the codec device and its side
/// interfaces.
#[derive(Debug)]
pub struct CodecHwInterface {
    pub gen: Generation,
    pub function: CodecFunction,
    pub slice_power_gate: bool,
}

impl CodecHwInterface {
    fn new(
        gen: Generation,
        function: CodecFunction,
        mhw: &MhwBundle,
        slice_power_gate: bool,
    ) -> Result<Self, CodecError> {
        if mhw.mfx.is_none() && mhw.hcp.is_none() {
            return Err(CodecError::InvalidParameter(
                "bundle carries no VDBOX interfaces",
            ));
        }
        Ok(Self {
            gen,
            function,
            slice_power_gate,
        })
    }
}

/// Debug interface built next to the codec device when the `codec-debug`
/// feature is enabled.
#[cfg(feature = "codec-debug")]
#[derive(Debug)]
pub struct CodecDebugInterface {
    pub function: CodecFunction,
}

#[cfg(feature = "codec-debug")]
impl CodecDebugInterface {
    fn initialize(_hw: &CodecHwInterface, function: CodecFunction) -> Result<Self, CodecError> {
        Ok(Self { function })
    }
}

/// Field-scaling interface for interlaced downsampling. Runs EU kernels and
/// therefore needs the render interface.
#[derive(Debug)]
pub struct FieldScalingInterface {
    pub gen: Generation,
}

impl FieldScalingInterface {
    fn new(mhw: &MhwBundle) -> Result<Self, CodecError> {
        if mhw.render.is_none() {
            return Err(CodecError::OutOfSpace("field scaling interface"));
        }
        Ok(Self { gen: mhw.gen })
    }
}

/// CSC and downscaling pre-processing attached to every non-JPEG encoder.
#[derive(Debug)]
pub struct CscDsInterface {
    pub gen: Generation,
}

impl CscDsInterface {
    fn new(mhw: &MhwBundle) -> Result<Self, CodecError> {
        if mhw.render.is_none() {
            return Err(CodecError::InvalidParameter(
                "csc/downscale interface creation failed",
            ));
        }
        Ok(Self { gen: mhw.gen })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DecoderKind {
    Mpeg2,
    Vc1,
    Avc,
    Jpeg,
    Vp8,
    Hevc,
    Vp9,
}

#[derive(Debug)]
pub struct Decoder {
    pub kind: DecoderKind,
    pub hw: Rc<CodecHwInterface>,
    #[cfg(feature = "codec-debug")]
    pub debug: CodecDebugInterface,
    pub field_scaling: Option<FieldScalingInterface>,
    pub huc_family: HucProductFamily,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EncoderKind {
    AvcVme,
    AvcVdenc,
    Vp9Vdenc,
    Jpeg,
    Mpeg2Vme,
    HevcVme,
    HevcVdenc,
    Vp8,
}

#[derive(Debug)]
pub struct Encoder {
    pub kind: EncoderKind,
    pub hw: Rc<CodecHwInterface>,
    #[cfg(feature = "codec-debug")]
    pub debug: CodecDebugInterface,
    pub csc_ds: Option<CscDsInterface>,
    pub kernel_base: Option<KernelBase>,
    pub vdbox_one_default: bool,
}

/// The one codec device produced per session.
#[derive(Debug)]
pub enum CodecDevice {
    Decoder(Decoder),
    Encoder(Encoder),
}

/// Per-generation selector, registered by platform key.
pub trait CodecDeviceFactory {
    fn create(
        &self,
        info: &StandardInfo,
        settings: Option<&CodecSettings>,
        mhw: &MhwBundle,
        os: &dyn OsInterface,
    ) -> Result<CodecDevice, CodecError>;
}

/// Fixed per-generation constants consumed by the shared selector body.
pub(crate) struct GenCodecParams {
    pub gen: Generation,
    pub huc_family: HucProductFamily,
    pub slice_power_gate: bool,
    pub kernel_base: KernelBase,
}

pub(crate) fn create_codec_device(
    params: &GenCodecParams,
    info: &StandardInfo,
    settings: Option<&CodecSettings>,
    mhw: &MhwBundle,
    _os: &dyn OsInterface,
) -> Result<CodecDevice, CodecError> {
    if info.mode.is_decode() != info.function.is_decode() {
        return Err(CodecError::InvalidParameter(
            "codec mode does not match the codec function",
        ));
    }

    let hw = Rc::new(CodecHwInterface::new(
        params.gen,
        info.function,
        mhw,
        params.slice_power_gate,
    )?);

    #[cfg(feature = "codec-debug")]
    let debug = CodecDebugInterface::initialize(&hw, info.function)?;

    if info.function.is_decode() {
        let kind = match info.mode {
            CodecMode::Mpeg2Idct | CodecMode::Mpeg2Vld => DecoderKind::Mpeg2,
            CodecMode::Vc1It | CodecMode::Vc1Vld => DecoderKind::Vc1,
            CodecMode::AvcVld => DecoderKind::Avc,
            CodecMode::JpegVld => DecoderKind::Jpeg,
            CodecMode::Vp8Vld => DecoderKind::Vp8,
            CodecMode::HevcVld => DecoderKind::Hevc,
            CodecMode::Vp9Vld => DecoderKind::Vp9,
            _ => {
                log::error!("decode mode requested invalid");
                return Err(CodecError::InvalidParameter("decode mode requested invalid"));
            }
        };

        // Field scaling is only wired up for AVC when the caller hinted at
        // downsampling; failing to attach it is fatal.
        let field_scaling = if kind == DecoderKind::Avc
            && settings.is_some_and(|settings| settings.downsampling_hinted)
        {
            Some(FieldScalingInterface::new(mhw)?)
        } else {
            None
        };

        Ok(CodecDevice::Decoder(Decoder {
            kind,
            hw,
            #[cfg(feature = "codec-debug")]
            debug,
            field_scaling,
            huc_family: params.huc_family,
        }))
    } else {
        let kind = match info.mode {
            CodecMode::AvcEnc => {
                if info.function.uses_vdenc_engine() {
                    EncoderKind::AvcVdenc
                } else {
                    EncoderKind::AvcVme
                }
            }
            CodecMode::Vp9Enc => EncoderKind::Vp9Vdenc,
            CodecMode::JpegEnc => EncoderKind::Jpeg,
            CodecMode::Mpeg2Enc => EncoderKind::Mpeg2Vme,
            CodecMode::HevcEnc => {
                if info.function.uses_vdenc_engine() {
                    EncoderKind::HevcVdenc
                } else {
                    EncoderKind::HevcVme
                }
            }
            CodecMode::Vp8Enc => EncoderKind::Vp8,
            _ => {
                log::error!("unsupported encode function requested");
                return Err(CodecError::InvalidParameter(
                    "unsupported encode function requested",
                ));
            }
        };

        let mut encoder = Encoder {
            kind,
            hw,
            #[cfg(feature = "codec-debug")]
            debug,
            csc_ds: None,
            kernel_base: None,
            vdbox_one_default: false,
        };

        match kind {
            EncoderKind::Jpeg => encoder.vdbox_one_default = true,
            EncoderKind::Mpeg2Vme | EncoderKind::HevcVme | EncoderKind::HevcVdenc => {
                #[cfg(feature = "kernels")]
                {
                    encoder.kernel_base = Some(params.kernel_base);
                }
            }
            _ => (),
        }

        if kind != EncoderKind::Jpeg {
            encoder.csc_ds = Some(CscDsInterface::new(mhw)?);
        }

        Ok(CodecDevice::Encoder(encoder))
    }
}

/// Full construction path: platform probe, registry lookup, bundle
/// construction, selector dispatch.
pub fn create_codec_for_platform(
    registries: &MediaRegistries,
    os: &dyn OsInterface,
    info: &StandardInfo,
    settings: Option<&CodecSettings>,
) -> MediaResult<CodecDevice> {
    let platform = os.platform();
    let mhw_factory = registries
        .mhw
        .get(platform)
        .ok_or(MediaStatus::InvalidParameter(
            "no MHW factory registered for platform",
        ))?;
    let bundle = mhw_factory.build(os, &MhwConfig::for_codec(info.function.is_decode()))?;

    let codec_factory = registries
        .codec
        .get(platform)
        .ok_or(MediaStatus::InvalidParameter(
            "no codec factory registered for platform",
        ))?;
    Ok(codec_factory.create(info, settings, &bundle, os)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mhw::build_bundle;
    use crate::os::tests::FakeOs;
    use crate::PlatformKey;

    const TEST_PARAMS: GenCodecParams = GenCodecParams {
        gen: Generation::Gen11,
        huc_family: HucProductFamily::Icelake,
        slice_power_gate: true,
        kernel_base: KernelBase("igcodeckrn_test"),
    };

    fn codec_bundle(decode: bool) -> (FakeOs, MhwBundle) {
        let os = FakeOs::new(PlatformKey::ICELAKE_LP);
        let bundle = build_bundle(Generation::Gen11, &os, &MhwConfig::for_codec(decode)).unwrap();
        (os, bundle)
    }

    fn decoder(device: CodecDevice) -> Decoder {
        match device {
            CodecDevice::Decoder(decoder) => decoder,
            CodecDevice::Encoder(_) => panic!("expected a decoder"),
        }
    }

    fn encoder(device: CodecDevice) -> Encoder {
        match device {
            CodecDevice::Encoder(encoder) => encoder,
            CodecDevice::Decoder(_) => panic!("expected an encoder"),
        }
    }

    #[test]
    fn mode_function_mismatch_is_rejected() {
        let (os, bundle) = codec_bundle(true);
        let info = StandardInfo {
            mode: CodecMode::AvcVld,
            function: CodecFunction::EncodeVdenc,
        };
        assert!(create_codec_device(&TEST_PARAMS, &info, None, &bundle, &os).is_err());
    }

    #[test]
    fn decoder_is_stamped_with_huc_family() {
        let (os, bundle) = codec_bundle(true);
        let info = StandardInfo {
            mode: CodecMode::Vp9Vld,
            function: CodecFunction::Decode,
        };
        let decoder = decoder(create_codec_device(&TEST_PARAMS, &info, None, &bundle, &os).unwrap());
        assert_eq!(decoder.kind, DecoderKind::Vp9);
        assert_eq!(decoder.huc_family, HucProductFamily::Icelake);
        assert!(decoder.field_scaling.is_none());
    }

    #[test]
    fn avc_decode_with_downsampling_attaches_field_scaling() {
        let (os, bundle) = codec_bundle(true);
        let info = StandardInfo {
            mode: CodecMode::AvcVld,
            function: CodecFunction::Decode,
        };
        let settings = CodecSettings {
            downsampling_hinted: true,
            ..Default::default()
        };
        let decoder =
            decoder(create_codec_device(&TEST_PARAMS, &info, Some(&settings), &bundle, &os).unwrap());
        assert!(decoder.field_scaling.is_some());
    }

    #[test]
    fn field_scaling_attach_failure_is_fatal() {
        let os = FakeOs::new(PlatformKey::ICELAKE_LP);
        // A bundle without the render interface cannot run scaling kernels.
        let config = MhwConfig {
            vdbox_all: true,
            decode_mode: true,
            ..Default::default()
        };
        let bundle = build_bundle(Generation::Gen11, &os, &config).unwrap();
        let info = StandardInfo {
            mode: CodecMode::AvcVld,
            function: CodecFunction::Decode,
        };
        let settings = CodecSettings {
            downsampling_hinted: true,
            ..Default::default()
        };
        match create_codec_device(&TEST_PARAMS, &info, Some(&settings), &bundle, &os) {
            Err(CodecError::OutOfSpace(_)) => (),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn jpeg_encoder_skips_csc_and_defaults_to_one_vdbox() {
        let (os, bundle) = codec_bundle(false);
        let info = StandardInfo {
            mode: CodecMode::JpegEnc,
            function: CodecFunction::EncodeVme,
        };
        let encoder = encoder(create_codec_device(&TEST_PARAMS, &info, None, &bundle, &os).unwrap());
        assert_eq!(encoder.kind, EncoderKind::Jpeg);
        assert!(encoder.vdbox_one_default);
        assert!(encoder.csc_ds.is_none());
        assert!(encoder.kernel_base.is_none());
    }

    #[test]
    fn vp9_encode_selects_the_vdenc_engine() {
        let (os, bundle) = codec_bundle(false);
        let info = StandardInfo {
            mode: CodecMode::Vp9Enc,
            function: CodecFunction::EncodeVdenc,
        };
        let encoder = encoder(create_codec_device(&TEST_PARAMS, &info, None, &bundle, &os).unwrap());
        assert_eq!(encoder.kind, EncoderKind::Vp9Vdenc);
        assert!(encoder.csc_ds.is_some());
    }

    #[cfg(feature = "kernels")]
    #[test]
    fn mpeg2_and_hevc_encoders_receive_the_kernel_blob() {
        let (os, bundle) = codec_bundle(false);
        for mode in [CodecMode::Mpeg2Enc, CodecMode::HevcEnc] {
            let info = StandardInfo {
                mode,
                function: CodecFunction::EncodeVme,
            };
            let encoder =
                encoder(create_codec_device(&TEST_PARAMS, &info, None, &bundle, &os).unwrap());
            assert_eq!(encoder.kernel_base, Some(KernelBase("igcodeckrn_test")));
        }
    }

    #[test]
    fn hw_interface_requires_a_vdbox() {
        let os = FakeOs::new(PlatformKey::ICELAKE_LP);
        let config = MhwConfig {
            render: true,
            ..Default::default()
        };
        let bundle = build_bundle(Generation::Gen11, &os, &config).unwrap();
        let info = StandardInfo {
            mode: CodecMode::Vp9Enc,
            function: CodecFunction::EncodeVdenc,
        };
        assert!(create_codec_device(&TEST_PARAMS, &info, None, &bundle, &os).is_err());
    }
}
