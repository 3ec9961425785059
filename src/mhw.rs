// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Hardware-block interface bundle.
//!
//! A [`MhwBundle`] owns one handle per requested hardware block for the
//! lifetime of a session. The command-streamer ([`Mi`]) and content
//! protection ([`Cp`]) interfaces are mandatory dependencies and are always
//! built; everything else is opted into through [`MhwConfig`]. The builder
//! either returns a complete bundle or a [`BundleBuildError`] listing every
//! block that failed; no partially-built bundle escapes.

use std::rc::Rc;

use thiserror::Error;

use crate::os::GtSystemInfo;
use crate::os::HeapMode;
use crate::os::OsInterface;
use crate::Generation;
use crate::MediaStatus;

/// Identifies a hardware block inside a bundle, for error reporting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Mi,
    Cp,
    Render,
    StateHeap,
    Sfc,
    Vebox,
    Mfx,
    Hcp,
    Huc,
    Vdenc,
}

#[derive(Debug, Error)]
#[error("failed to construct hardware blocks {failed:?}")]
pub struct BundleBuildError {
    /// Every block whose construction failed, not just the first.
    pub failed: Vec<BlockKind>,
}

#[derive(Debug, Error)]
pub enum MhwError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error(transparent)]
    Build(#[from] BundleBuildError),
}

impl From<MhwError> for MediaStatus {
    fn from(err: MhwError) -> Self {
        match err {
            MhwError::InvalidArgument(what) => MediaStatus::InvalidParameter(what),
            MhwError::Build(_) => MediaStatus::AllocationFailed("hardware block construction"),
        }
    }
}

/// Which hardware-block interfaces a session requests, plus the session mode
/// bits that construction depends on.
#[derive(Clone, Debug, Default)]
pub struct MhwConfig {
    pub render: bool,
    pub state_heap: bool,
    pub sfc: bool,
    pub vebox: bool,
    pub mfx: bool,
    pub hcp: bool,
    pub huc: bool,
    pub vdenc: bool,
    /// Shorthand implying MFX, HCP, HUC and VDENC regardless of their
    /// individual bits.
    pub vdbox_all: bool,
    /// Content protection requested for the session.
    pub protected_session: bool,
    /// Decode session, as opposed to encode. Wired into the VDBOX blocks.
    pub decode_mode: bool,
    pub heap_mode: HeapMode,
}

impl MhwConfig {
    /// Config requesting everything a codec session needs.
    pub fn for_codec(decode_mode: bool) -> Self {
        Self {
            render: true,
            state_heap: true,
            vdbox_all: true,
            decode_mode,
            ..Default::default()
        }
    }

    fn any_requested(&self) -> bool {
        self.render
            || self.state_heap
            || self.sfc
            || self.vebox
            || self.mfx
            || self.hcp
            || self.huc
            || self.vdenc
            || self.vdbox_all
    }
}

/// Content-protection interface. Always constructed.
#[derive(Debug)]
pub struct Cp {
    pub gen: Generation,
    pub protected_session: bool,
}

/// Command-streamer interface. Always constructed; every other block that
/// emits commands goes through it.
#[derive(Debug)]
pub struct Mi {
    pub gen: Generation,
    pub(crate) cp: Rc<Cp>,
}

impl Mi {
    pub fn cp(&self) -> &Cp {
        &self.cp
    }
}

#[derive(Debug)]
pub struct Render {
    pub gen: Generation,
    pub gt: GtSystemInfo,
    pub heap_mode: HeapMode,
}

impl Render {
    fn new(gen: Generation, gt: GtSystemInfo, heap_mode: HeapMode) -> Option<Self> {
        if gt.eu_count == 0 {
            log::error!("render interface: GT reports no execution units");
            return None;
        }
        Some(Self {
            gen,
            gt,
            heap_mode,
        })
    }
}

#[derive(Debug)]
pub struct StateHeap {
    pub gen: Generation,
    pub heap_mode: HeapMode,
}

#[derive(Debug)]
pub struct Sfc {
    pub gen: Generation,
}

#[derive(Debug)]
pub struct Vebox {
    pub gen: Generation,
}

#[derive(Debug)]
pub struct Mfx {
    pub gen: Generation,
    pub decode_in_use: bool,
    pub(crate) mi: Rc<Mi>,
    pub(crate) cp: Rc<Cp>,
}

#[derive(Debug)]
pub struct Hcp {
    pub gen: Generation,
    pub decode_in_use: bool,
    pub(crate) mi: Rc<Mi>,
    pub(crate) cp: Rc<Cp>,
}

#[derive(Debug)]
pub struct Huc {
    pub gen: Generation,
    pub(crate) mi: Rc<Mi>,
    pub(crate) cp: Rc<Cp>,
}

#[derive(Debug)]
pub struct Vdenc {
    pub gen: Generation,
    /// VP9 VDENC is a gen11 addition; gen9 only streams AVC through VDENC.
    pub vp9_supported: bool,
}

/// Owns one instance of every hardware-block interface built for a session.
/// Sub-interfaces are never shared across sessions.
#[derive(Debug)]
pub struct MhwBundle {
    pub gen: Generation,
    pub mi: Rc<Mi>,
    pub cp: Rc<Cp>,
    pub render: Option<Render>,
    pub state_heap: Option<StateHeap>,
    pub sfc: Option<Sfc>,
    pub vebox: Option<Vebox>,
    pub mfx: Option<Mfx>,
    pub hcp: Option<Hcp>,
    pub huc: Option<Huc>,
    pub vdenc: Option<Vdenc>,
}

/// Per-generation bundle factory, registered by platform key.
pub trait MhwFactory {
    fn build(&self, os: &dyn OsInterface, config: &MhwConfig) -> Result<MhwBundle, MhwError>;
}

/// Shared bundle construction; the per-generation factories call this with
/// their [`Generation`].
pub(crate) fn build_bundle(
    gen: Generation,
    os: &dyn OsInterface,
    config: &MhwConfig,
) -> Result<MhwBundle, MhwError> {
    let Some(gt) = os.gt_system_info() else {
        return Err(MhwError::InvalidArgument("GT system info query failed"));
    };

    if !config.any_requested() && !config.protected_session {
        return Err(MhwError::InvalidArgument(
            "no hardware interfaces were requested",
        ));
    }

    // MI and CP are mandatory dependencies for everything else.
    let cp = Rc::new(Cp {
        gen,
        protected_session: config.protected_session,
    });
    let mi = Rc::new(Mi {
        gen,
        cp: Rc::clone(&cp),
    });

    let mut failed = Vec::new();

    let render = if config.render {
        let render = Render::new(gen, gt, config.heap_mode);
        if render.is_none() {
            failed.push(BlockKind::Render);
        }
        render
    } else {
        None
    };

    let state_heap = config.state_heap.then(|| StateHeap {
        gen,
        heap_mode: config.heap_mode,
    });
    let sfc = config.sfc.then(|| Sfc { gen });
    let vebox = config.vebox.then(|| Vebox { gen });

    let mfx = (config.vdbox_all || config.mfx).then(|| Mfx {
        gen,
        decode_in_use: config.decode_mode,
        mi: Rc::clone(&mi),
        cp: Rc::clone(&cp),
    });
    let hcp = (config.vdbox_all || config.hcp).then(|| Hcp {
        gen,
        decode_in_use: config.decode_mode,
        mi: Rc::clone(&mi),
        cp: Rc::clone(&cp),
    });
    let huc = (config.vdbox_all || config.huc).then(|| Huc {
        gen,
        mi: Rc::clone(&mi),
        cp: Rc::clone(&cp),
    });
    let vdenc = (config.vdbox_all || config.vdenc).then(|| Vdenc {
        gen,
        vp9_supported: gen >= Generation::Gen11,
    });

    if !failed.is_empty() {
        return Err(BundleBuildError { failed }.into());
    }

    Ok(MhwBundle {
        gen,
        mi,
        cp,
        render,
        state_heap,
        sfc,
        vebox,
        mfx,
        hcp,
        huc,
        vdenc,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::os::tests::FakeOs;
    use crate::PlatformKey;

    fn build(os: &FakeOs, config: &MhwConfig) -> Result<MhwBundle, MhwError> {
        build_bundle(Generation::Gen11, os, config)
    }

    #[test]
    fn empty_request_without_protection_is_rejected() {
        let os = FakeOs::new(PlatformKey::ICELAKE_LP);
        match build(&os, &MhwConfig::default()) {
            Err(MhwError::InvalidArgument(_)) => (),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn protection_only_request_builds_mandatory_blocks() {
        let os = FakeOs::new(PlatformKey::ICELAKE_LP);
        let config = MhwConfig {
            protected_session: true,
            ..Default::default()
        };
        let bundle = build(&os, &config).unwrap();
        assert!(bundle.cp.protected_session);
        assert!(bundle.render.is_none());
        assert!(bundle.mfx.is_none());
    }

    #[test]
    fn failed_gt_query_is_invalid_argument() {
        let mut os = FakeOs::new(PlatformKey::ICELAKE_LP);
        os.gt = None;
        match build(&os, &MhwConfig::for_codec(true)) {
            Err(MhwError::InvalidArgument(_)) => (),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn vdbox_all_is_equivalent_to_individual_vdbox_bits() {
        let os = FakeOs::new(PlatformKey::ICELAKE_LP);
        let all = build(
            &os,
            &MhwConfig {
                vdbox_all: true,
                ..Default::default()
            },
        )
        .unwrap();
        let individual = build(
            &os,
            &MhwConfig {
                mfx: true,
                hcp: true,
                huc: true,
                vdenc: true,
                ..Default::default()
            },
        )
        .unwrap();

        for bundle in [&all, &individual] {
            assert!(bundle.mfx.is_some());
            assert!(bundle.hcp.is_some());
            assert!(bundle.huc.is_some());
            assert!(bundle.vdenc.is_some());
            assert!(bundle.render.is_none());
            assert!(bundle.sfc.is_none());
        }
    }

    #[test]
    fn decode_mode_is_wired_into_vdbox_blocks() {
        let os = FakeOs::new(PlatformKey::ICELAKE_LP);
        let bundle = build(&os, &MhwConfig::for_codec(true)).unwrap();
        assert!(bundle.mfx.as_ref().unwrap().decode_in_use);
        assert!(bundle.hcp.as_ref().unwrap().decode_in_use);
        let encode = build(&os, &MhwConfig::for_codec(false)).unwrap();
        assert!(!encode.mfx.as_ref().unwrap().decode_in_use);
    }

    #[test]
    fn block_failure_is_reported_per_block() {
        let mut os = FakeOs::new(PlatformKey::ICELAKE_LP);
        os.gt = Some(GtSystemInfo::default());
        let config = MhwConfig {
            render: true,
            sfc: true,
            ..Default::default()
        };
        match build(&os, &config) {
            Err(MhwError::Build(err)) => assert_eq!(err.failed, vec![BlockKind::Render]),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn vdenc_vp9_capability_tracks_generation() {
        let os = FakeOs::new(PlatformKey::SKYLAKE);
        let config = MhwConfig {
            vdenc: true,
            ..Default::default()
        };
        let gen9 = build_bundle(Generation::Gen9, &os, &config).unwrap();
        assert!(!gen9.vdenc.unwrap().vp9_supported);
        let gen11 = build_bundle(Generation::Gen11, &os, &config).unwrap();
        assert!(gen11.vdenc.unwrap().vp9_supported);
    }
}
