// Copyright 2025 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Per-generation factory implementations. Each submodule holds one
//! generation's fixed constants and its registration entry point.

pub mod gen11;
pub mod gen9;

use crate::registry::MediaRegistries;

/// Registers every generation this crate implements.
pub fn register_builtin(registries: &mut MediaRegistries) {
    gen9::register(registries);
    gen11::register(registries);
}
