// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! VP9 encode DDI state machine.
//!
//! One [`Vp9Encoder`] exists per encode session. Each frame goes through an
//! accumulate/submit cycle: tagged buffers delivered through
//! [`Vp9Encoder::render_picture`] update the durable sequence/picture/segment
//! parameter state, and [`Vp9Encoder::end_picture`] assembles one immutable
//! [`Vp9EncodeParams`] descriptor and hands it to the execution layer.
//! Sequence parameters persist across frames; picture parameters are fully
//! rebuilt from each picture-parameter buffer.

use std::mem;

use crate::ddi::BufferId;
use crate::ddi::BufferKind;
use crate::ddi::BufferPayload;
use crate::ddi::DdiEncoderInfo;
use crate::ddi::MediaContext;
use crate::ddi::MiscParam;
use crate::ddi::NalUnitParams;
use crate::ddi::PackedBuffer;
use crate::ddi::PackedHeaderKind;
use crate::ddi::PackedHeaderParams;
use crate::ddi::RenderTargetTable;
use crate::ddi::StatusReportQueue;
use crate::ddi::SurfaceId;
use crate::ddi::ENCODE_ID_VP9;
use crate::ddi::INVALID_FRAME_INDEX;
use crate::os::BoHandle;
use crate::os::OsResource;
use crate::os::SurfaceFormat;
use crate::registry::DdiEncoderRegistry;
use crate::MediaResult;
use crate::MediaStatus;

/// Scratch capacity for one frame's packed header bytes.
pub const VP9_PACKED_HEADER_CAPACITY: usize = 4096;

/// NAL-unit type value stamped on VP9 uncompressed headers.
const VP9_HEADER_NAL_TYPE: u32 = 0x22;

/// Bitrates cross the API in bits per second and are stored in kbps.
const BRC_KBPS: u32 = 1000;

const VP9_NUM_SEGMENTS: usize = 8;
const VP9_NUM_REF_FRAMES: usize = 8;

/// All-references-enabled mask for reference frame control list 0.
const REF_FRAME_CTRL_ALL: u32 = 0x07;

/// Quality levels at or below this map to the best-quality tier.
pub const TARGET_USAGE_HI_QUALITY: u32 = 2;
/// Quality levels at or above this map to the best-speed tier.
pub const TARGET_USAGE_HI_SPEED: u32 = 6;

fn div_round_up(n: u32, d: u32) -> u32 {
    (n + d - 1) / d
}

/// Encoder speed/quality tradeoff tier.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetUsage {
    BestQuality = 1,
    RtSpeed = 4,
    BestSpeed = 7,
}

impl TargetUsage {
    /// Maps the externally supplied quality level onto the three internal
    /// tiers. Zero and anything between the two thresholds fall back to the
    /// real-time tier.
    pub fn from_quality_level(level: u32) -> Self {
        if level == 0 {
            TargetUsage::RtSpeed
        } else if level >= TARGET_USAGE_HI_SPEED {
            TargetUsage::BestSpeed
        } else if level <= TARGET_USAGE_HI_QUALITY {
            TargetUsage::BestQuality
        } else {
            TargetUsage::RtSpeed
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RateControlMethod {
    #[default]
    Cqp,
    Cbr,
    Vbr,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Vp9Profile {
    Profile0,
    Profile1,
    Profile2,
    Profile3,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Vp9FrameType {
    #[default]
    Key,
    Inter,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    /// Unpacks the wire encoding: numerator in the low 16 bits, denominator
    /// in the high 16 bits, zero denominator read as one.
    pub fn from_packed(raw: u32) -> Self {
        let num = raw & 0xffff;
        let mut den = (raw >> 16) & 0xffff;
        if den == 0 {
            den = 1;
        }
        Self { num, den }
    }
}

/// Sequence parameter buffer as delivered by the external API.
#[derive(Copy, Clone, Debug, Default)]
pub struct Vp9EncSeqParamsBuffer {
    pub max_frame_width: u32,
    pub max_frame_height: u32,
    pub intra_period: u32,
    pub bits_per_second: u32,
    pub kf_auto: bool,
}

/// Picture parameter buffer as delivered by the external API.
#[derive(Copy, Clone, Debug)]
pub struct Vp9EncPicParamsBuffer {
    pub frame_width_src: u32,
    pub frame_height_src: u32,
    pub frame_width_dst: u32,
    pub frame_height_dst: u32,
    pub reconstructed_frame: SurfaceId,
    pub coded_buf: BufferId,
    pub reference_frames: [SurfaceId; VP9_NUM_REF_FRAMES],
    pub frame_type: Vp9FrameType,
    pub intra_only: bool,
    pub show_frame: bool,
    pub error_resilient: bool,
    pub refresh_frame_flags: u32,
    pub ref_frame_ctrl_l0: u32,
    pub luma_ac_qindex: u32,
    pub luma_dc_qindex_delta: i32,
    pub chroma_ac_qindex_delta: i32,
    pub chroma_dc_qindex_delta: i32,
    pub filter_level: u32,
    pub sharpness_level: u32,
    pub segmentation_enabled: bool,
    pub segmentation_update_map: bool,
    pub segmentation_temporal_update: bool,
}

impl Default for Vp9EncPicParamsBuffer {
    fn default() -> Self {
        Self {
            frame_width_src: 0,
            frame_height_src: 0,
            frame_width_dst: 0,
            frame_height_dst: 0,
            reconstructed_frame: SurfaceId::INVALID,
            coded_buf: BufferId(0),
            reference_frames: [SurfaceId::INVALID; VP9_NUM_REF_FRAMES],
            frame_type: Vp9FrameType::Key,
            intra_only: false,
            show_frame: true,
            error_resilient: false,
            refresh_frame_flags: 0,
            ref_frame_ctrl_l0: 0,
            luma_ac_qindex: 0,
            luma_dc_qindex_delta: 0,
            chroma_ac_qindex_delta: 0,
            chroma_dc_qindex_delta: 0,
            filter_level: 0,
            sharpness_level: 0,
            segmentation_enabled: false,
            segmentation_update_map: false,
            segmentation_temporal_update: false,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Vp9SegmentData {
    pub reference_enabled: bool,
    pub reference_frame: u32,
    pub reference_skipped: bool,
    pub lf_level_delta: i8,
    pub qindex_delta: i16,
}

/// Segmentation parameter buffer as delivered by the external API.
#[derive(Copy, Clone, Debug, Default)]
pub struct Vp9EncSegParamsBuffer {
    pub segments: [Vp9SegmentData; VP9_NUM_SEGMENTS],
}

/// Durable per-session sequence state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Vp9SeqParams {
    pub max_frame_width: u32,
    pub max_frame_height: u32,
    pub gop_pic_size: u32,
    pub target_bitrate_kbps: u32,
    pub max_bitrate_kbps: u32,
    pub min_bitrate_kbps: u32,
    pub vbv_buffer_size: u32,
    pub initial_vbv_fullness: u32,
    pub frame_rate: FrameRate,
    pub rate_control: RateControlMethod,
}

/// Bit offsets into the uncompressed header, recorded so the hardware layer
/// can patch the header after encoding.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Vp9HeaderBitOffsets {
    pub first_partition_size: u32,
    pub qindex: u32,
    pub lf_level: u32,
    pub ref_lf_delta: u32,
    pub mode_lf_delta: u32,
    pub segmentation: u32,
}

/// Per-frame picture state, fully rebuilt by every picture-parameter buffer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Vp9PicParams {
    pub src_frame_width_minus1: u32,
    pub src_frame_height_minus1: u32,
    pub dst_frame_width_minus1: u32,
    pub dst_frame_height_minus1: u32,
    pub frame_type: Vp9FrameType,
    pub intra_only: bool,
    pub show_frame: bool,
    pub error_resilient: bool,
    pub refresh_frame_flags: u32,
    pub curr_original_pic_index: u8,
    pub curr_reconstructed_pic_index: u8,
    pub ref_frame_indices: [u8; VP9_NUM_REF_FRAMES],
    pub ref_frame_ctrl_l0: u32,
    pub ref_frame_ctrl_l1: u32,
    pub luma_ac_qindex: u32,
    pub luma_dc_qindex_delta: i32,
    pub chroma_ac_qindex_delta: i32,
    pub chroma_dc_qindex_delta: i32,
    pub filter_level: u32,
    pub sharpness_level: u32,
    pub segmentation_enabled: bool,
    pub segmentation_update_map: bool,
    pub segmentation_temporal_update: bool,
    pub bit_offsets: Vp9HeaderBitOffsets,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Vp9SegmentParams {
    pub segments: [Vp9SegmentData; VP9_NUM_SEGMENTS],
}

/// Session-wide settings fixed at context creation.
#[derive(Copy, Clone, Debug)]
pub struct EncodeSessionConfig {
    pub rc_method: RateControlMethod,
    pub profile: Vp9Profile,
    pub frame_width: u32,
    pub frame_height: u32,
}

/// Immutable per-frame descriptor handed to the execution layer.
#[derive(Clone, Debug)]
pub struct Vp9EncodeParams {
    pub new_seq: bool,
    pub reset_brc: bool,
    pub target_usage: TargetUsage,
    pub seq: Vp9SeqParams,
    pub pic: Vp9PicParams,
    pub segments: Vp9SegmentParams,
    pub nal_unit: NalUnitParams,
    pub packed_header: Vec<u8>,
    pub raw_surface: OsResource,
    pub recon_surface: OsResource,
    pub bitstream: BoHandle,
    pub segment_map: Option<BoHandle>,
    pub mb_qp: Option<BoHandle>,
    pub skip_map: Option<BoHandle>,
}

/// Hardware execution entry point consumed by the encoder.
pub trait Vp9Executor {
    fn execute(&mut self, params: &Vp9EncodeParams) -> anyhow::Result<()>;
}

/// Writes the VP9 uncompressed header and reports the bit offsets of the
/// fields the hardware patches post-encode.
pub trait Vp9HeaderWriter {
    fn write_uncompressed_header(
        &mut self,
        seq: &Vp9SeqParams,
        pic: &Vp9PicParams,
    ) -> anyhow::Result<(Vec<u8>, Vp9HeaderBitOffsets)>;
}

/// Per-session VP9 encode state machine.
pub struct Vp9Encoder<E, W> {
    executor: E,
    header_writer: W,
    config: EncodeSessionConfig,

    seq: Vp9SeqParams,
    pic: Vp9PicParams,
    segments: Vp9SegmentParams,

    target_usage: TargetUsage,
    reset_brc: bool,
    new_seq: bool,

    last_packed_header: Option<PackedHeaderParams>,
    header_inserted: bool,
    packed: PackedBuffer,
    nal_unit: NalUnitParams,

    rt_table: RenderTargetTable,
    status_reports: StatusReportQueue,
    bitstream_bo: Option<BoHandle>,

    segment_map_bo: Option<BoHandle>,
    mb_qp_bo: Option<BoHandle>,
    skip_map_bo: Option<BoHandle>,
}

impl<E, W> Vp9Encoder<E, W>
where
    E: Vp9Executor,
    W: Vp9HeaderWriter,
{
    pub fn new(executor: E, header_writer: W, config: EncodeSessionConfig) -> Self {
        Self {
            executor,
            header_writer,
            config,
            seq: Vp9SeqParams {
                rate_control: config.rc_method,
                ..Default::default()
            },
            pic: Vp9PicParams::default(),
            segments: Vp9SegmentParams::default(),
            target_usage: TargetUsage::RtSpeed,
            reset_brc: false,
            new_seq: false,
            last_packed_header: None,
            header_inserted: false,
            packed: PackedBuffer::new(VP9_PACKED_HEADER_CAPACITY),
            nal_unit: NalUnitParams::default(),
            rt_table: RenderTargetTable::new(),
            status_reports: StatusReportQueue::new(),
            bitstream_bo: None,
            segment_map_bo: None,
            mb_qp_bo: None,
            skip_map_bo: None,
        }
    }

    pub fn sequence_params(&self) -> &Vp9SeqParams {
        &self.seq
    }

    pub fn picture_params(&self) -> &Vp9PicParams {
        &self.pic
    }

    pub fn target_usage(&self) -> TargetUsage {
        self.target_usage
    }

    /// Reset-BRC flag queued for the upcoming submission.
    pub fn reset_brc_pending(&self) -> bool {
        self.reset_brc
    }

    pub fn status_reports(&self) -> &StatusReportQueue {
        &self.status_reports
    }

    /// Starts a frame on the given render target.
    pub fn begin_picture(&mut self, ctx: &dyn MediaContext, rt: SurfaceId) -> MediaResult<()> {
        if ctx.surface(rt).is_none() {
            return Err(MediaStatus::InvalidParameter("render target surface"));
        }
        self.rt_table.register(rt);
        self.rt_table.set_current_rt(rt);
        Ok(())
    }

    /// Routes one batch of tagged buffers into the parameter state. Each
    /// mapped buffer is unmapped exactly once, whatever its handler returns.
    pub fn render_picture(
        &mut self,
        ctx: &dyn MediaContext,
        buffers: &[BufferId],
    ) -> MediaResult<()> {
        for &id in buffers {
            let Some(buffer) = ctx.buffer(id) else {
                return Err(MediaStatus::InvalidBuffer("unknown buffer id"));
            };
            let raw_kind = buffer.raw_kind;
            let bo = buffer.bo;
            let Some(kind) = buffer.kind() else {
                log::debug!("vp9: skipping unrecognized buffer type {}", raw_kind);
                continue;
            };

            // The skip map is consumed as a raw resource and never mapped.
            if kind == BufferKind::EncMacroblockDisableSkipMap {
                self.skip_map_bo = Some(bo);
                continue;
            }

            let payload = ctx.map_buffer(id)?;
            let result = self.dispatch(ctx, kind, bo, &payload);
            ctx.unmap_buffer(id)?;
            result?;
        }
        Ok(())
    }

    fn dispatch(
        &mut self,
        ctx: &dyn MediaContext,
        kind: BufferKind,
        bo: BoHandle,
        payload: &BufferPayload,
    ) -> MediaResult<()> {
        match (kind, payload) {
            (BufferKind::EncSequenceParams, BufferPayload::Vp9Seq(buf)) => {
                self.parse_seq_params(buf)
            }
            (BufferKind::EncPictureParams, BufferPayload::Vp9Pic(buf)) => {
                self.parse_pic_params(ctx, buf)
            }
            (BufferKind::QMatrix, BufferPayload::Vp9Segments(buf)) => {
                self.parse_segment_params(buf)
            }
            (BufferKind::EncPackedHeaderParams, BufferPayload::PackedHeaderParams(params)) => {
                self.parse_packed_header_params(params)
            }
            (BufferKind::EncPackedHeaderData, BufferPayload::PackedHeaderData(data)) => {
                self.parse_packed_header_data(data)
            }
            (BufferKind::EncMiscParams, BufferPayload::Misc(misc)) => self.parse_misc_params(misc),
            (BufferKind::EncMacroblockMap, _) => {
                self.segment_map_bo = Some(bo);
                Ok(())
            }
            (BufferKind::EncQp, _) => {
                self.mb_qp_bo = Some(bo);
                Ok(())
            }
            // VP9 carries no IQ matrix; the buffer is accepted and ignored.
            (BufferKind::IqMatrix, _) => Ok(()),
            _ => {
                log::error!("vp9: malformed payload for buffer type {:?}", kind);
                Err(MediaStatus::InvalidBuffer("malformed buffer payload"))
            }
        }
    }

    fn parse_seq_params(&mut self, buf: &Vp9EncSeqParamsBuffer) -> MediaResult<()> {
        if self.seq.gop_pic_size != 0 && self.seq.gop_pic_size != buf.intra_period {
            self.reset_brc = true;
        }
        self.seq.gop_pic_size = buf.intra_period;
        self.seq.max_frame_width = buf.max_frame_width;
        self.seq.max_frame_height = buf.max_frame_height;

        if buf.bits_per_second != 0 {
            let max_kbps = div_round_up(buf.bits_per_second, BRC_KBPS);
            self.seq.max_bitrate_kbps = max_kbps;
            if self.seq.target_bitrate_kbps == 0 {
                self.seq.target_bitrate_kbps = max_kbps;
            }
        }

        self.new_seq = true;
        Ok(())
    }

    fn resolve_dimension_pair(src: u32, dst: u32) -> MediaResult<(u32, u32)> {
        match (src, dst) {
            (0, 0) => Err(MediaStatus::InvalidBuffer("zero frame dimensions")),
            (0, dst) => Ok((dst, dst)),
            (src, 0) => Ok((src, src)),
            (src, dst) => Ok((src, dst)),
        }
    }

    fn parse_pic_params(
        &mut self,
        ctx: &dyn MediaContext,
        buf: &Vp9EncPicParamsBuffer,
    ) -> MediaResult<()> {
        // Full overwrite; nothing from the previous frame may leak through.
        self.pic = Vp9PicParams::default();

        let (src_w, dst_w) = Self::resolve_dimension_pair(buf.frame_width_src, buf.frame_width_dst)?;
        let (src_h, dst_h) =
            Self::resolve_dimension_pair(buf.frame_height_src, buf.frame_height_dst)?;
        self.pic.src_frame_width_minus1 = src_w - 1;
        self.pic.src_frame_height_minus1 = src_h - 1;
        self.pic.dst_frame_width_minus1 = dst_w - 1;
        self.pic.dst_frame_height_minus1 = dst_h - 1;

        self.pic.frame_type = buf.frame_type;
        self.pic.intra_only = buf.intra_only;
        self.pic.show_frame = buf.show_frame;
        self.pic.error_resilient = buf.error_resilient;
        self.pic.refresh_frame_flags = buf.refresh_frame_flags;

        // Reference controls are recomputed, never trusted from the caller.
        self.pic.ref_frame_ctrl_l0 = if buf.frame_type == Vp9FrameType::Key || buf.intra_only {
            0
        } else {
            REF_FRAME_CTRL_ALL
        };
        self.pic.ref_frame_ctrl_l1 = 0;

        self.pic.luma_ac_qindex = buf.luma_ac_qindex;
        self.pic.luma_dc_qindex_delta = buf.luma_dc_qindex_delta;
        self.pic.chroma_ac_qindex_delta = buf.chroma_ac_qindex_delta;
        self.pic.chroma_dc_qindex_delta = buf.chroma_dc_qindex_delta;
        self.pic.filter_level = buf.filter_level;
        self.pic.sharpness_level = buf.sharpness_level;
        self.pic.segmentation_enabled = buf.segmentation_enabled;
        self.pic.segmentation_update_map = buf.segmentation_update_map;
        self.pic.segmentation_temporal_update = buf.segmentation_temporal_update;

        self.pic.curr_original_pic_index = self.rt_table.register(self.rt_table.current_rt());
        self.rt_table.set_current_recon(buf.reconstructed_frame);
        self.pic.curr_reconstructed_pic_index = self.rt_table.register(buf.reconstructed_frame);
        for (slot, reference) in buf.reference_frames.iter().enumerate() {
            self.pic.ref_frame_indices[slot] = if *reference == SurfaceId::INVALID {
                INVALID_FRAME_INDEX
            } else {
                self.rt_table.register(*reference)
            };
        }

        let Some(coded) = ctx.buffer(buf.coded_buf) else {
            return Err(MediaStatus::InvalidBuffer("coded buffer"));
        };
        // A stale report queued under the same handle belongs to a frame the
        // caller has abandoned.
        self.status_reports.remove(coded.bo);
        self.bitstream_bo = Some(coded.bo);
        Ok(())
    }

    fn parse_segment_params(&mut self, buf: &Vp9EncSegParamsBuffer) -> MediaResult<()> {
        self.segments.segments = buf.segments;
        Ok(())
    }

    fn parse_packed_header_params(&mut self, params: &PackedHeaderParams) -> MediaResult<()> {
        if params.kind != PackedHeaderKind::RawData {
            return Err(MediaStatus::InvalidBuffer("packed header type"));
        }
        self.nal_unit = NalUnitParams {
            nal_unit_type: VP9_HEADER_NAL_TYPE,
            insert_emulation_bytes: params.has_emulation_bytes,
            skip_emulation_check_count: 0,
            size: (params.bit_length + 7) / 8,
            offset: 0,
        };
        self.last_packed_header = Some(*params);
        Ok(())
    }

    fn parse_packed_header_data(&mut self, data: &[u8]) -> MediaResult<()> {
        let Some(params) = self.last_packed_header else {
            return Err(MediaStatus::InvalidBuffer(
                "packed header data without parameters",
            ));
        };
        // A second data buffer for the same frame is ignored.
        if self.header_inserted {
            return Ok(());
        }
        let size = ((params.bit_length + 7) / 8) as usize;
        if data.len() < size {
            return Err(MediaStatus::InvalidBuffer("short packed header data"));
        }
        self.nal_unit.offset = self.packed.len() as u32;
        self.packed.append(&data[..size])?;
        self.header_inserted = true;
        Ok(())
    }

    fn parse_misc_params(&mut self, misc: &MiscParam) -> MediaResult<()> {
        match misc {
            MiscParam::Hrd {
                buffer_size,
                initial_buffer_fullness,
            } => {
                if self.seq.vbv_buffer_size != 0 && self.seq.vbv_buffer_size != *buffer_size {
                    self.reset_brc = true;
                }
                if self.seq.initial_vbv_fullness != 0
                    && self.seq.initial_vbv_fullness != *initial_buffer_fullness
                {
                    self.reset_brc = true;
                }
                self.seq.vbv_buffer_size = *buffer_size;
                self.seq.initial_vbv_fullness = *initial_buffer_fullness;
                Ok(())
            }
            MiscParam::FrameRate(raw) => {
                let frame_rate = FrameRate::from_packed(*raw);
                if self.seq.frame_rate.num != 0 && self.seq.frame_rate != frame_rate {
                    self.reset_brc = true;
                }
                self.seq.frame_rate = frame_rate;
                Ok(())
            }
            MiscParam::RateControl(rc) => {
                if self.config.rc_method == RateControlMethod::Cqp {
                    return Ok(());
                }
                let prev_target = self.seq.target_bitrate_kbps;
                let prev_max = self.seq.max_bitrate_kbps;
                let max = div_round_up(rc.bits_per_second, BRC_KBPS);
                let target = match self.config.rc_method {
                    RateControlMethod::Cbr => {
                        self.seq.max_bitrate_kbps = max;
                        self.seq.min_bitrate_kbps = max;
                        max
                    }
                    RateControlMethod::Vbr => {
                        // Caller-supplied percentages are clamped to 100.
                        let pct = rc.target_percentage.min(100);
                        self.seq.max_bitrate_kbps = max;
                        self.seq.min_bitrate_kbps = max * (2 * pct).saturating_sub(100) / 100;
                        max * pct / 100
                    }
                    RateControlMethod::Cqp => unreachable!(),
                };
                if (prev_target != 0 && prev_target != target)
                    || (prev_max != 0 && prev_max != max)
                {
                    self.reset_brc = true;
                }
                self.seq.target_bitrate_kbps = target;
                if rc.reset {
                    self.reset_brc = true;
                }
                Ok(())
            }
            // No per-frame action for these; they are accepted by contract.
            MiscParam::EncQuality | MiscParam::TemporalLayer => Ok(()),
            MiscParam::QualityLevel(level) => {
                self.target_usage = TargetUsage::from_quality_level(*level);
                Ok(())
            }
            MiscParam::Other(raw) => {
                log::error!("vp9: unsupported misc parameter type {}", raw);
                Err(MediaStatus::InvalidParameter("misc parameter type"))
            }
        }
    }

    /// Submits the accumulated frame. Per-frame state is reset whether or
    /// not submission succeeds.
    pub fn end_picture(&mut self, ctx: &dyn MediaContext) -> MediaResult<()> {
        let result = self.encode_frame(ctx);
        self.reset_at_frame_level();
        result
    }

    fn encode_frame(&mut self, ctx: &dyn MediaContext) -> MediaResult<()> {
        if matches!(
            self.config.rc_method,
            RateControlMethod::Cbr | RateControlMethod::Vbr
        ) && self.seq.target_bitrate_kbps == 0
        {
            return Err(MediaStatus::InvalidParameter(
                "rate control without a target bitrate",
            ));
        }

        let expected_format = match self.config.profile {
            Vp9Profile::Profile0 => SurfaceFormat::Nv12,
            Vp9Profile::Profile2 => SurfaceFormat::P010,
            Vp9Profile::Profile1 | Vp9Profile::Profile3 => {
                return Err(MediaStatus::Unimplemented("vp9 profile"));
            }
        };
        let raw = ctx
            .surface(self.rt_table.current_rt())
            .ok_or(MediaStatus::InvalidParameter("render target surface"))?;
        if raw.format != expected_format {
            return Err(MediaStatus::InvalidParameter("raw surface format"));
        }
        let recon = ctx
            .surface(self.rt_table.current_recon())
            .ok_or(MediaStatus::InvalidParameter("reconstructed surface"))?;
        let raw = OsResource {
            bo: raw.bo,
            format: raw.format,
        };
        let recon = OsResource {
            bo: recon.bo,
            format: recon.format,
        };

        if self.config.rc_method == RateControlMethod::Cqp {
            self.seq.target_bitrate_kbps = 0;
            self.seq.max_bitrate_kbps = 0;
            self.seq.min_bitrate_kbps = 0;
            self.seq.vbv_buffer_size = 0;
            self.seq.initial_vbv_fullness = 0;
        }
        if self.seq.frame_rate.num == 0 || self.seq.frame_rate.den == 0 {
            self.seq.frame_rate = FrameRate { num: 30, den: 1 };
        }

        if !self.header_inserted {
            let (bytes, offsets) = self
                .header_writer
                .write_uncompressed_header(&self.seq, &self.pic)
                .map_err(|err| {
                    log::error!("vp9: uncompressed header synthesis failed: {:#}", err);
                    MediaStatus::EncodingError
                })?;
            self.pic.bit_offsets = offsets;
            self.nal_unit = NalUnitParams {
                nal_unit_type: VP9_HEADER_NAL_TYPE,
                insert_emulation_bytes: false,
                skip_emulation_check_count: 0,
                size: bytes.len() as u32,
                offset: self.packed.len() as u32,
            };
            self.packed.append(&bytes)?;
        }

        self.new_seq |= self.reset_brc;

        let bitstream = self
            .bitstream_bo
            .ok_or(MediaStatus::InvalidBuffer("no coded buffer for this frame"))?;

        let params = Vp9EncodeParams {
            new_seq: self.new_seq,
            reset_brc: self.reset_brc,
            target_usage: self.target_usage,
            seq: self.seq,
            pic: self.pic,
            segments: self.segments,
            nal_unit: self.nal_unit,
            packed_header: self.packed.data().to_vec(),
            raw_surface: raw,
            recon_surface: recon,
            bitstream,
            segment_map: self.segment_map_bo,
            mb_qp: self.mb_qp_bo,
            skip_map: self.skip_map_bo,
        };

        self.status_reports.push(bitstream);
        self.executor.execute(&params).map_err(|err| {
            log::error!("vp9: hardware execution failed: {:#}", err);
            MediaStatus::EncodingError
        })
    }

    fn reset_at_frame_level(&mut self) {
        self.last_packed_header = None;
        self.header_inserted = false;
        self.reset_brc = false;
        self.new_seq = false;
        self.packed.reset();
        self.nal_unit = NalUnitParams::default();
        self.bitstream_bo = None;
        self.segment_map_bo = None;
        self.mb_qp_bo = None;
        self.skip_map_bo = None;
    }
}

/// Publishes the VP9 descriptor in the DDI encoder registry.
pub fn register_codec(registry: &mut DdiEncoderRegistry) -> bool {
    registry.register(
        ENCODE_ID_VP9,
        Box::new(DdiEncoderInfo {
            seq_buffer_size: mem::size_of::<Vp9EncSeqParamsBuffer>(),
            pic_buffer_size: mem::size_of::<Vp9EncPicParamsBuffer>(),
            qmatrix_buffer_size: mem::size_of::<Vp9EncSegParamsBuffer>(),
        }),
    )
}
