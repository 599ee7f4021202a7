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

//! Load descriptors: what an in-flight request is waiting on.

use larder_core::{
    asset::ResourceHandle,
    loader::{AsyncOp, PackageLoader},
};

/// The shape of a load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// One asset.
    SingleItem,
    /// Several assets completing together.
    ItemBatch,
    /// One package.
    SinglePackage,
    /// Several packages completing together.
    PackageBatch,
}

impl LoadKind {
    pub(crate) fn is_batch(self) -> bool {
        matches!(self, LoadKind::ItemBatch | LoadKind::PackageBatch)
    }
}

/// Identifies the request that started a load, so a step never completes a
/// slot that was dropped and re-created by another request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RequestId(pub(crate) u64);

/// The loader operation behind a loading slot.
pub(crate) enum PendingOp<L: PackageLoader> {
    Asset(L::AssetOp),
    Package(L::PackageOp),
}

impl<L: PackageLoader> PendingOp<L> {
    pub(crate) fn is_done(&self) -> bool {
        match self {
            PendingOp::Asset(op) => op.is_done(),
            PendingOp::Package(op) => op.is_done(),
        }
    }

    pub(crate) fn progress(&self) -> f32 {
        let progress = match self {
            PendingOp::Asset(op) => op.progress(),
            PendingOp::Package(op) => op.progress(),
        };
        progress.clamp(0.0, 1.0)
    }
}

/// Metadata for one in-flight load, stored in the loading slot.
///
/// A batch head additionally lists every slot of its batch (itself included)
/// in `children`; its progress is the mean over them.
pub(crate) struct LoadDescriptor<L: PackageLoader> {
    pub(crate) kind: LoadKind,
    pub(crate) request: RequestId,
    pub(crate) op: PendingOp<L>,
    pub(crate) children: Vec<ResourceHandle>,
}

impl<L: PackageLoader> LoadDescriptor<L> {
    pub(crate) fn new(kind: LoadKind, request: RequestId, op: PendingOp<L>) -> Self {
        Self {
            kind,
            request,
            op,
            children: Vec::new(),
        }
    }
}

/// How a request relates to one of the slots it waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    /// The request started this slot's operation and completes the slot.
    Owned,
    /// Another request is loading the slot; this one only waits for it.
    Awaited,
}

/// One slot a request's step waits on.
#[derive(Debug, Clone)]
pub(crate) struct Member {
    pub(crate) hash: u32,
    pub(crate) name: String,
    pub(crate) role: Role,
}

impl Member {
    pub(crate) fn owned(hash: u32, name: &str) -> Self {
        Self {
            hash,
            name: name.to_string(),
            role: Role::Owned,
        }
    }

    pub(crate) fn awaited(hash: u32, name: &str) -> Self {
        Self {
            hash,
            name: name.to_string(),
            role: Role::Awaited,
        }
    }
}
