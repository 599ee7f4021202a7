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

//! The entries stored in the cache's slot table.

use super::descriptor::LoadDescriptor;
use larder_core::{asset::AssetHandle, loader::PackageLoader};
use std::sync::Arc;

/// Where an entry is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    /// A load operation is in flight.
    Loading,
    /// The entry is ready.
    Loaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    Asset,
    Package,
}

/// One cache slot's content.
///
/// For an asset, `package` is the package that provides it; for a package,
/// it is the opened package itself once loaded.
pub(crate) struct CacheEntry<L: PackageLoader> {
    pub(crate) status: AssetStatus,
    pub(crate) kind: EntryKind,
    /// Display name, for diagnostics only.
    pub(crate) name: String,
    pub(crate) package: Option<Arc<L::Package>>,
    pub(crate) payload: Option<AssetHandle<L::Asset>>,
    /// Present while `status` is `Loading`.
    pub(crate) descriptor: Option<LoadDescriptor<L>>,
}

impl<L: PackageLoader> CacheEntry<L> {
    pub(crate) fn loaded_asset(name: &str, package: Arc<L::Package>, asset: L::Asset) -> Self {
        Self {
            status: AssetStatus::Loaded,
            kind: EntryKind::Asset,
            name: name.to_string(),
            package: Some(package),
            payload: Some(AssetHandle::new(asset)),
            descriptor: None,
        }
    }

    pub(crate) fn loaded_package(name: &str, package: Arc<L::Package>) -> Self {
        Self {
            status: AssetStatus::Loaded,
            kind: EntryKind::Package,
            name: name.to_string(),
            package: Some(package),
            payload: None,
            descriptor: None,
        }
    }

    pub(crate) fn loading(
        name: &str,
        kind: EntryKind,
        package: Option<Arc<L::Package>>,
        descriptor: LoadDescriptor<L>,
    ) -> Self {
        Self {
            status: AssetStatus::Loading,
            kind,
            name: name.to_string(),
            package,
            payload: None,
            descriptor: Some(descriptor),
        }
    }

    pub(crate) fn is_package(&self) -> bool {
        self.kind == EntryKind::Package
    }

    pub(crate) fn is_owned_by(&self, package: &Arc<L::Package>) -> bool {
        self.package
            .as_ref()
            .is_some_and(|owner| Arc::ptr_eq(owner, package))
    }
}
