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

//! The contract between the cache and the package/file loader that turns a
//! name into bytes.
//!
//! The cache never performs I/O itself. It asks a [`PackageLoader`] to open
//! packages and load assets, either synchronously or as an [`AsyncOp`] that the
//! cache polls once per cooperative step.

use crate::asset::Asset;
use crate::error::LoadError;
use std::sync::Arc;

/// An externally driven operation exposing completion and fractional progress.
///
/// From the cache's point of view an operation makes progress on its own (the
/// loader may use background I/O); the cache only polls it.
pub trait AsyncOp {
    /// What the operation produces.
    type Output;

    /// Returns `true` once the result is available.
    fn is_done(&self) -> bool;

    /// Fractional progress in `[0, 1]`.
    fn progress(&self) -> f32;

    /// Takes the result out of a finished operation.
    ///
    /// Called once, after [`is_done`](Self::is_done) has returned `true`.
    fn take_result(&mut self) -> Result<Self::Output, LoadError>;
}

/// The package/file loader consumed by the cache.
pub trait PackageLoader: 'static {
    /// An opened package.
    type Package: 'static;
    /// A loaded asset.
    type Asset: Asset;
    /// The asynchronous variant of [`open_package`](Self::open_package).
    type PackageOp: AsyncOp<Output = Self::Package>;
    /// The asynchronous variant of [`load_asset`](Self::load_asset).
    type AssetOp: AsyncOp<Output = Self::Asset>;

    /// Opens the package called `name`, blocking until it is available.
    fn open_package(&mut self, name: &str) -> Result<Self::Package, LoadError>;

    /// Starts opening the package called `name`.
    fn open_package_async(&mut self, name: &str) -> Result<Self::PackageOp, LoadError>;

    /// Lists the paths of every asset inside `package`.
    fn asset_names(&self, package: &Self::Package) -> Vec<String>;

    /// Loads the asset `name` from `package`, blocking until it is decoded.
    fn load_asset(
        &mut self,
        package: &Arc<Self::Package>,
        name: &str,
    ) -> Result<Self::Asset, LoadError>;

    /// Starts loading the asset `name` from `package`.
    fn load_asset_async(
        &mut self,
        package: &Arc<Self::Package>,
        name: &str,
    ) -> Result<Self::AssetOp, LoadError>;

    /// Releases the backing resource of `package`.
    fn unload_package(&mut self, package: &Self::Package, unload_all_instances: bool);
}
