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

use super::{name_hash, Asset};
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Deref, sync::Arc};

/// A thread-safe, reference-counted reference to a loaded payload.
///
/// Cloning it is cheap, as it only increments the reference count and does
/// not duplicate the underlying data. The payload is deallocated when the
/// last reference is dropped.
#[derive(Debug)]
pub struct AssetHandle<T: Asset>(Arc<T>);

impl<T: Asset> AssetHandle<T> {
    /// Creates a new `AssetHandle` that takes ownership of the payload.
    ///
    /// This is called by the cache once a load operation has produced its result.
    pub fn new(asset: T) -> Self {
        Self(Arc::new(asset))
    }

    /// Returns `true` if both references point at the same payload.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Asset> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: Asset> Deref for AssetHandle<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The opaque token callers receive for a cache entry.
///
/// It wraps the entry's name hash and carries no ownership: it is a lookup key,
/// valid only while the cache holds an entry with that hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle {
    hash: u32,
}

impl ResourceHandle {
    /// Wraps an already computed name hash.
    pub const fn from_hash(hash: u32) -> Self {
        Self { hash }
    }

    /// Builds the handle a name resolves to.
    pub fn from_name(name: &str) -> Self {
        Self::from_hash(name_hash(name))
    }

    /// The name hash this handle identifies.
    pub const fn hash(self) -> u32 {
        self.hash
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.hash)
    }
}
