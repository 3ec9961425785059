// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Keyed factory registries.
//!
//! One [`Registry`] exists per capability type; an aggregate of all of them,
//! [`MediaRegistries`], is built explicitly at startup and handed to the
//! selector paths by reference. Registration therefore always completes
//! before the first lookup, without relying on static initialization order.

use std::collections::HashMap;
use std::hash::Hash;

use crate::codechal::CodecDeviceFactory;
use crate::ddi::DdiEncoderInfo;
use crate::ddi::EncoderId;
use crate::device::CmHalFactory;
use crate::device::DecodeHistogramFactory;
use crate::device::MmdFactory;
use crate::device::MosUtilFactory;
use crate::device::Nv12ToP010Factory;
use crate::device::RenderHalFactory;
use crate::device::VphalFactory;
use crate::mhw::MhwFactory;
use crate::PlatformKey;

/// Generic keyed factory table. `F` is the capability type held behind the
/// key, typically a factory trait object.
pub struct Registry<K, F: ?Sized> {
    entries: HashMap<K, Box<F>>,
}

impl<K, F: ?Sized> Registry<K, F>
where
    K: Copy + Eq + Hash + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Records `factory` under `key`. Duplicate registration is
    /// last-write-wins; returns `false` when a previous entry was replaced.
    pub fn register(&mut self, key: K, factory: Box<F>) -> bool {
        let fresh = self.entries.insert(key, factory).is_none();
        if !fresh {
            log::debug!("registry: replaced existing entry for {:?}", key);
        }
        fresh
    }

    /// Looks up the capability registered for `key`.
    pub fn get(&self, key: K) -> Option<&F> {
        self.entries.get(&key).map(Box::as_ref)
    }

    pub fn is_registered(&self, key: K) -> bool {
        self.entries.contains_key(&key)
    }
}

impl<K, F: ?Sized> Default for Registry<K, F>
where
    K: Copy + Eq + Hash + std::fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of DDI codec descriptors, keyed by codec id rather than by
/// platform.
pub type DdiEncoderRegistry = Registry<EncoderId, DdiEncoderInfo>;

/// All per-platform factory registries, one per capability type. The tables
/// are fully independent; registering a platform into one never affects the
/// others.
pub struct MediaRegistries {
    pub mhw: Registry<PlatformKey, dyn MhwFactory>,
    pub codec: Registry<PlatformKey, dyn CodecDeviceFactory>,
    pub vphal: Registry<PlatformKey, dyn VphalFactory>,
    pub renderhal: Registry<PlatformKey, dyn RenderHalFactory>,
    pub mosutil: Registry<PlatformKey, dyn MosUtilFactory>,
    pub cmhal: Registry<PlatformKey, dyn CmHalFactory>,
    pub mmd: Registry<PlatformKey, dyn MmdFactory>,
    pub decode_histogram: Registry<PlatformKey, dyn DecodeHistogramFactory>,
    pub nv12_to_p010: Registry<PlatformKey, dyn Nv12ToP010Factory>,
    pub ddi_encoders: DdiEncoderRegistry,
}

impl MediaRegistries {
    pub fn new() -> Self {
        Self {
            mhw: Registry::new(),
            codec: Registry::new(),
            vphal: Registry::new(),
            renderhal: Registry::new(),
            mosutil: Registry::new(),
            cmhal: Registry::new(),
            mmd: Registry::new(),
            decode_histogram: Registry::new(),
            nv12_to_p010: Registry::new(),
            ddi_encoders: Registry::new(),
        }
    }

    /// Builds the registries with every generation this crate implements
    /// already registered.
    pub fn with_builtin_platforms() -> Self {
        let mut registries = Self::new();
        crate::gen::register_builtin(&mut registries);
        crate::ddi::vp9::register_codec(&mut registries.ddi_encoders);
        registries
    }
}

impl Default for MediaRegistries {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Cap {
        fn id(&self) -> u32;
    }

    struct CapA;
    struct CapB;

    impl Cap for CapA {
        fn id(&self) -> u32 {
            0xa
        }
    }

    impl Cap for CapB {
        fn id(&self) -> u32 {
            0xb
        }
    }

    #[test]
    fn lookup_of_unregistered_key_is_not_found() {
        let registry: Registry<PlatformKey, dyn Cap> = Registry::new();
        assert!(registry.get(PlatformKey::SKYLAKE).is_none());
        assert!(!registry.is_registered(PlatformKey(0xdead)));
    }

    #[test]
    fn duplicate_registration_is_last_write_wins() {
        let mut registry: Registry<PlatformKey, dyn Cap> = Registry::new();
        assert!(registry.register(PlatformKey::SKYLAKE, Box::new(CapA)));
        assert!(!registry.register(PlatformKey::SKYLAKE, Box::new(CapB)));
        assert_eq!(registry.get(PlatformKey::SKYLAKE).unwrap().id(), 0xb);
    }

    #[test]
    fn registries_for_distinct_capability_types_do_not_cross_talk() {
        let mut a: Registry<PlatformKey, dyn Cap> = Registry::new();
        let b: Registry<PlatformKey, dyn Cap> = Registry::new();
        a.register(PlatformKey::ICELAKE_LP, Box::new(CapA));
        assert!(a.is_registered(PlatformKey::ICELAKE_LP));
        assert!(!b.is_registered(PlatformKey::ICELAKE_LP));
    }

    #[test]
    fn builtin_platforms_cover_every_capability_type() {
        let registries = MediaRegistries::with_builtin_platforms();
        for key in [PlatformKey::SKYLAKE, PlatformKey::ICELAKE_LP] {
            assert!(registries.mhw.is_registered(key));
            assert!(registries.codec.is_registered(key));
            assert!(registries.vphal.is_registered(key));
            assert!(registries.renderhal.is_registered(key));
            assert!(registries.mosutil.is_registered(key));
            assert!(registries.cmhal.is_registered(key));
            assert!(registries.mmd.is_registered(key));
            assert!(registries.decode_histogram.is_registered(key));
            assert!(registries.nv12_to_p010.is_registered(key));
        }
        assert!(registries
            .ddi_encoders
            .is_registered(crate::ddi::ENCODE_ID_VP9));
    }
}
