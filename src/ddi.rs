// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Driver-facing encode interface shared across codecs.
//!
//! This module holds the buffer/surface model the per-codec state machines
//! consume, together with the small helpers they all share: the packed
//! header scratch buffer, the render target table and the status report
//! queue. Per-codec logic lives in the submodules, currently [`vp9`] only.

pub mod vp9;

use std::collections::VecDeque;

use enumn::N;

use crate::os::BoHandle;
use crate::os::SurfaceFormat;
use crate::MediaResult;
use crate::MediaStatus;

/// Handle of a buffer owned by the surrounding media context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferId(pub u32);

/// Handle of a surface owned by the surrounding media context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u32);

impl SurfaceId {
    pub const INVALID: SurfaceId = SurfaceId(u32::MAX);
}

impl Default for SurfaceId {
    fn default() -> Self {
        SurfaceId::INVALID
    }
}

/// Frame index value marking an unused reference slot.
pub const INVALID_FRAME_INDEX: u8 = 0x7f;

/// Identifier of a codec in the DDI encoder registry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct EncoderId(pub &'static str);

pub const ENCODE_ID_VP9: EncoderId = EncoderId("VP9");

/// Per-codec descriptor published in the registry so the context layer can
/// size its parameter buffers before a context exists.
#[derive(Copy, Clone, Debug)]
pub struct DdiEncoderInfo {
    pub seq_buffer_size: usize,
    pub pic_buffer_size: usize,
    pub qmatrix_buffer_size: usize,
}

/// Buffer types the encode render path understands, with their on-the-wire
/// numeric values.
#[derive(Copy, Clone, Debug, PartialEq, Eq, N)]
#[repr(u32)]
pub enum BufferKind {
    IqMatrix = 1,
    QMatrix = 11,
    EncSequenceParams = 22,
    EncPictureParams = 23,
    EncPackedHeaderParams = 25,
    EncPackedHeaderData = 26,
    EncMiscParams = 27,
    EncMacroblockMap = 29,
    EncQp = 30,
    EncMacroblockDisableSkipMap = 53,
}

/// Kind of a packed header buffer pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PackedHeaderKind {
    RawData,
    Other(u32),
}

/// Parameter half of a packed header submission.
#[derive(Copy, Clone, Debug)]
pub struct PackedHeaderParams {
    pub kind: PackedHeaderKind,
    pub bit_length: u32,
    pub has_emulation_bytes: bool,
}

/// Rate-control parameter block carried in a misc buffer.
#[derive(Copy, Clone, Debug, Default)]
pub struct RateControlParams {
    pub bits_per_second: u32,
    /// Target percentage of the max rate, VBR only.
    pub target_percentage: u32,
    pub reset: bool,
}

/// Misc parameter payloads. Unknown types are carried as [`MiscParam::Other`]
/// so the codec handler can reject them itself.
#[derive(Copy, Clone, Debug)]
pub enum MiscParam {
    Hrd {
        buffer_size: u32,
        initial_buffer_fullness: u32,
    },
    /// Packed frame rate, numerator in the low 16 bits and denominator in
    /// the high 16 bits.
    FrameRate(u32),
    RateControl(RateControlParams),
    EncQuality,
    TemporalLayer,
    QualityLevel(u32),
    Other(u32),
}

/// Decoded contents of a mapped buffer.
#[derive(Clone, Debug)]
pub enum BufferPayload {
    Vp9Seq(vp9::Vp9EncSeqParamsBuffer),
    Vp9Pic(vp9::Vp9EncPicParamsBuffer),
    Vp9Segments(vp9::Vp9EncSegParamsBuffer),
    PackedHeaderParams(PackedHeaderParams),
    PackedHeaderData(Vec<u8>),
    Misc(MiscParam),
    /// Resource-only buffer; everything the handler needs is in the buffer
    /// metadata.
    Opaque,
}

/// A buffer as seen before mapping. `raw_kind` is kept verbatim so unknown
/// types can be logged and skipped.
#[derive(Clone, Debug)]
pub struct MediaBuffer {
    pub raw_kind: u32,
    pub size: u32,
    pub bo: BoHandle,
    pub payload: BufferPayload,
}

impl MediaBuffer {
    pub fn kind(&self) -> Option<BufferKind> {
        BufferKind::n(self.raw_kind)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct MediaSurface {
    pub id: SurfaceId,
    pub format: SurfaceFormat,
    pub bo: BoHandle,
}

/// Seam to the surrounding media context that owns buffers and surfaces.
pub trait MediaContext {
    fn buffer(&self, id: BufferId) -> Option<&MediaBuffer>;

    /// Maps a buffer and returns its decoded contents. Every successful map
    /// must be balanced by [`MediaContext::unmap_buffer`].
    fn map_buffer(&self, id: BufferId) -> MediaResult<BufferPayload>;

    fn unmap_buffer(&self, id: BufferId) -> MediaResult<()>;

    fn surface(&self, id: SurfaceId) -> Option<&MediaSurface>;
}

/// Description of one header chunk inserted in the bitstream.
#[derive(Copy, Clone, Debug, Default)]
pub struct NalUnitParams {
    pub nal_unit_type: u32,
    pub insert_emulation_bytes: bool,
    pub skip_emulation_check_count: u32,
    pub size: u32,
    pub offset: u32,
}

/// Fixed-capacity scratch that accumulates packed header bytes for one
/// frame.
#[derive(Debug)]
pub struct PackedBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl PackedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn reset(&mut self) {
        self.data.clear();
    }

    pub fn append(&mut self, bytes: &[u8]) -> MediaResult<()> {
        if self.data.len() + bytes.len() > self.capacity {
            return Err(MediaStatus::AllocationFailed("packed header scratch"));
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Bitstream buffers awaiting a status report, oldest first.
#[derive(Debug, Default)]
pub struct StatusReportQueue {
    pending: VecDeque<BoHandle>,
}

impl StatusReportQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bo: BoHandle) {
        self.pending.push_back(bo);
    }

    /// Drops `bo` from the queue if present. A miss is not an error; the
    /// buffer may simply never have been submitted.
    pub fn remove(&mut self, bo: BoHandle) -> bool {
        if let Some(pos) = self.pending.iter().position(|pending| *pending == bo) {
            self.pending.remove(pos);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, bo: BoHandle) -> bool {
        self.pending.iter().any(|pending| *pending == bo)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Maps surfaces registered as render targets to the frame indices the codec
/// layer refers to them by.
#[derive(Debug, Default)]
pub struct RenderTargetTable {
    entries: Vec<SurfaceId>,
    current_rt: SurfaceId,
    current_recon: SurfaceId,
}

impl RenderTargetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the frame index of `id`, registering it in the first free
    /// slot if it was not seen before.
    pub fn register(&mut self, id: SurfaceId) -> u8 {
        if let Some(index) = self.frame_index(id) {
            return index;
        }
        self.entries.push(id);
        (self.entries.len() - 1) as u8
    }

    pub fn frame_index(&self, id: SurfaceId) -> Option<u8> {
        self.entries
            .iter()
            .position(|entry| *entry == id)
            .map(|index| index as u8)
    }

    pub fn set_current_rt(&mut self, id: SurfaceId) {
        self.current_rt = id;
    }

    pub fn current_rt(&self) -> SurfaceId {
        self.current_rt
    }

    pub fn set_current_recon(&mut self, id: SurfaceId) {
        self.current_recon = id;
    }

    pub fn current_recon(&self) -> SurfaceId {
        self.current_recon
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory context tracking map/unmap balance per buffer.
    #[derive(Default)]
    pub(crate) struct FakeMediaContext {
        buffers: HashMap<BufferId, MediaBuffer>,
        surfaces: HashMap<SurfaceId, MediaSurface>,
        pub(crate) map_counts: RefCell<HashMap<BufferId, u32>>,
        pub(crate) unmap_counts: RefCell<HashMap<BufferId, u32>>,
    }

    impl FakeMediaContext {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn add_buffer(&mut self, id: BufferId, buffer: MediaBuffer) {
            self.buffers.insert(id, buffer);
        }

        pub(crate) fn add_surface(&mut self, surface: MediaSurface) {
            self.surfaces.insert(surface.id, surface);
        }

        pub(crate) fn unmap_count(&self, id: BufferId) -> u32 {
            self.unmap_counts.borrow().get(&id).copied().unwrap_or(0)
        }

        pub(crate) fn map_count(&self, id: BufferId) -> u32 {
            self.map_counts.borrow().get(&id).copied().unwrap_or(0)
        }
    }

    impl MediaContext for FakeMediaContext {
        fn buffer(&self, id: BufferId) -> Option<&MediaBuffer> {
            self.buffers.get(&id)
        }

        fn map_buffer(&self, id: BufferId) -> MediaResult<BufferPayload> {
            let buffer = self
                .buffers
                .get(&id)
                .ok_or(MediaStatus::InvalidBuffer("unknown buffer id"))?;
            *self.map_counts.borrow_mut().entry(id).or_insert(0) += 1;
            Ok(buffer.payload.clone())
        }

        fn unmap_buffer(&self, id: BufferId) -> MediaResult<()> {
            if !self.buffers.contains_key(&id) {
                return Err(MediaStatus::InvalidBuffer("unknown buffer id"));
            }
            *self.unmap_counts.borrow_mut().entry(id).or_insert(0) += 1;
            Ok(())
        }

        fn surface(&self, id: SurfaceId) -> Option<&MediaSurface> {
            self.surfaces.get(&id)
        }
    }

    #[test]
    fn buffer_kind_decodes_known_wire_values() {
        assert_eq!(BufferKind::n(22), Some(BufferKind::EncSequenceParams));
        assert_eq!(BufferKind::n(53), Some(BufferKind::EncMacroblockDisableSkipMap));
        assert_eq!(BufferKind::n(12345), None);
    }

    #[test]
    fn packed_buffer_rejects_writes_past_capacity() {
        let mut packed = PackedBuffer::new(4);
        packed.append(&[1, 2, 3]).unwrap();
        assert!(packed.append(&[4, 5]).is_err());
        assert_eq!(packed.len(), 3);
        packed.reset();
        assert!(packed.is_empty());
        packed.append(&[4, 5, 6, 7]).unwrap();
        assert_eq!(packed.data(), &[4, 5, 6, 7]);
    }

    #[test]
    fn status_report_queue_removes_by_handle() {
        let mut queue = StatusReportQueue::new();
        queue.push(BoHandle(1));
        queue.push(BoHandle(2));
        assert!(queue.remove(BoHandle(1)));
        assert!(!queue.remove(BoHandle(1)));
        assert!(queue.contains(BoHandle(2)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn render_target_table_reuses_registered_slots() {
        let mut table = RenderTargetTable::new();
        let first = table.register(SurfaceId(7));
        let second = table.register(SurfaceId(9));
        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(table.register(SurfaceId(7)), 0);
        assert_eq!(table.frame_index(SurfaceId(11)), None);
    }
}
