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

//! Defines the error types surfaced by the cache and its loader contract.

use thiserror::Error;

/// An error reported by a package loader while opening a package or loading
/// one of its assets.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No package exists at the resolved location.
    #[error("Package '{path}' does not exist. Were the packages built?")]
    PackageNotFound {
        /// The location that was probed.
        path: String,
    },
    /// The package is open but holds no asset with that name.
    #[error("Package '{package}' has no asset named '{name}'")]
    AssetNotFound {
        /// The package that was searched.
        package: String,
        /// The asset name that was requested.
        name: String,
    },
    /// Reading the package failed.
    #[error("I/O error while loading '{path}': {source}")]
    Io {
        /// The location being read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The package was read but its content is not a valid package.
    #[error("Package '{path}' is corrupt: {reason}")]
    Corrupt {
        /// The location being read.
        path: String,
        /// Why the content was rejected.
        reason: String,
    },
    /// A payload decoder rejected the asset bytes.
    #[error("Failed to decode asset '{name}': {reason}")]
    Decode {
        /// The asset being decoded.
        name: String,
        /// The decoder's message.
        reason: String,
    },
    /// The operation stopped without producing a result.
    #[error("Load of '{name}' stopped before producing a result")]
    Interrupted {
        /// What was being loaded.
        name: String,
    },
}

/// An error surfaced by the cache's public operations.
///
/// Precondition violations abort the call before any state is mutated; they are
/// not retried anywhere.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The name is not provided by any opened package.
    #[error("Cannot load the asset '{name}'. Did you load the package containing it?")]
    NotIndexed {
        /// The requested asset name.
        name: String,
    },
    /// A package with this name is already loaded or loading.
    #[error("Package '{name}' is already loaded")]
    PackageAlreadyLoaded {
        /// The package name.
        name: String,
    },
    /// No loaded package has this name.
    #[error("Package '{name}' is not loaded")]
    PackageNotLoaded {
        /// The package name.
        name: String,
    },
    /// Two packages provide an asset with the same name.
    #[error("Asset '{name}' from package '{package}' is already provided by another package")]
    DuplicateAssetName {
        /// The conflicting asset name.
        name: String,
        /// The package whose registration was refused.
        package: String,
    },
    /// The handle does not identify any cache entry.
    #[error("No cache entry for handle {hash:#010x}")]
    UnknownHandle {
        /// The hash carried by the handle.
        hash: u32,
    },
    /// The entry exists but its load has not completed yet.
    #[error("Asset '{name}' is still loading")]
    NotLoaded {
        /// The entry's name.
        name: String,
    },
    /// The payload cannot provide the requested shape.
    #[error("Asset '{name}' cannot provide a '{requested}'")]
    WrongShape {
        /// The entry's name.
        name: String,
        /// The requested shape's type name.
        requested: &'static str,
    },
    /// The entry is a package, which has no payload to instantiate.
    #[error("'{name}' is a package, not an asset")]
    NotAPayload {
        /// The entry's name.
        name: String,
    },
    /// The package still has assets being loaded asynchronously.
    #[error("Package '{package}' has {pending} asset load(s) in flight")]
    PendingLoads {
        /// The package name.
        package: String,
        /// How many of its entries are still loading.
        pending: usize,
    },
    /// The request was dropped before it completed.
    #[error("Load of '{name}' was cancelled")]
    LoadCancelled {
        /// The entry's name.
        name: String,
    },
    /// The load this request was waiting on failed under another request.
    #[error("Load of '{name}' failed: {reason}")]
    LoadFailed {
        /// The entry's name.
        name: String,
        /// The owning request's error message.
        reason: String,
    },
    /// A batch request named nothing to load.
    #[error("A batch load needs at least one name")]
    EmptyBatch,
    /// The package loader failed.
    #[error(transparent)]
    Loader(#[from] LoadError),
}
