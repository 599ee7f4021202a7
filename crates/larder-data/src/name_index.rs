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

//! Maps an asset's name hash to the package that currently provides it.

use ahash::AHashMap;
use std::sync::Arc;

/// Resolves "which package provides this name" before any load is attempted.
///
/// Populated when a package is opened and emptied for that package when it is
/// unloaded. Packages are compared by identity, not by value.
#[derive(Debug)]
pub struct NameIndex<P> {
    owners: AHashMap<u32, Arc<P>>,
}

impl<P> NameIndex<P> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            owners: AHashMap::new(),
        }
    }

    /// Maps `hash` to `package`, returning the package it previously mapped to.
    pub fn register(&mut self, hash: u32, package: &Arc<P>) -> Option<Arc<P>> {
        self.owners.insert(hash, Arc::clone(package))
    }

    /// The package providing `hash`, if any.
    pub fn resolve(&self, hash: u32) -> Option<&Arc<P>> {
        self.owners.get(&hash)
    }

    /// Returns `true` if some package provides `hash`.
    pub fn is_registered(&self, hash: u32) -> bool {
        self.owners.contains_key(&hash)
    }

    /// Removes the mapping for `hash`.
    pub fn unregister(&mut self, hash: u32) -> Option<Arc<P>> {
        self.owners.remove(&hash)
    }

    /// Removes every mapping that points at `package`, returning how many were removed.
    pub fn unregister_all(&mut self, package: &Arc<P>) -> usize {
        let before = self.owners.len();
        self.owners.retain(|_, owner| !Arc::ptr_eq(owner, package));
        before - self.owners.len()
    }

    /// Number of indexed names.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns `true` if no name is indexed.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Removes every mapping.
    pub fn clear(&mut self) {
        self.owners.clear();
    }
}

impl<P> Default for NameIndex<P> {
    fn default() -> Self {
        Self::new()
    }
}
