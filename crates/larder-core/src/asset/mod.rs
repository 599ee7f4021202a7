// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Provides the foundational traits and primitive types for the resource cache.
//!
//! This module defines the "common language" for every asset-related operation:
//! how a human-readable name becomes the 32-bit key the cache is addressed by,
//! the handles callers hold, and the capability interface a loaded payload
//! exposes. It has no knowledge of how assets are loaded or stored.

mod handle;
mod shape;

pub use handle::*;
pub use shape::*;

use ahash::RandomState;

/// A marker trait for types that can be stored in the cache as a loaded payload.
///
/// # Examples
///
/// ```
/// use larder_core::asset::Asset;
///
/// struct Prefab {
///     // ... fields
/// }
///
/// impl Asset for Prefab {}
/// ```
pub trait Asset: Send + Sync + 'static {}

// Fixed seeds keep a name's hash identical for the lifetime of the process.
const NAME_SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Hashes a resource name into the 32-bit key used by the cache.
///
/// Names are hashed once at the API boundary and never re-hashed.
pub fn name_hash(name: &str) -> u32 {
    let state = RandomState::with_seeds(NAME_SEEDS[0], NAME_SEEDS[1], NAME_SEEDS[2], NAME_SEEDS[3]);
    let hash = state.hash_one(name);
    (hash ^ (hash >> 32)) as u32
}

/// Extracts the asset name from a path stored inside a package.
///
/// The name is the file name after the last `/` or `\`, cut at its first `.`.
/// Returns `None` when the final component has no extension.
///
/// ```
/// use larder_core::asset::asset_name_from_path;
///
/// assert_eq!(
///     asset_name_from_path("Assets/Particles/fire_particle.prefab"),
///     Some("fire_particle")
/// );
/// assert_eq!(asset_name_from_path("Assets/README"), None);
/// ```
pub fn asset_name_from_path(path: &str) -> Option<&str> {
    let file = path.rsplit(['/', '\\']).next().unwrap_or(path);
    file.split_once('.').map(|(stem, _)| stem)
}
