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

//! A [`PackageLoader`] reading package archives from a root directory.

use crate::archive::{PackageArchive, PackageEntry};
use crate::decoder::AssetDecoder;
use crate::op::ThreadedOp;
use ahash::AHashMap;
use larder_core::{
    asset::{asset_name_from_path, Asset},
    error::LoadError,
    loader::PackageLoader,
};
use std::{
    fs::File,
    io::Read,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::Arc,
};

const READ_CHUNK: usize = 64 * 1024;

/// A package opened by the [`DirectoryPackageLoader`].
#[derive(Debug)]
pub struct OpenedPackage {
    name: String,
    entries: Vec<PackageEntry>,
    by_name: AHashMap<String, usize>,
}

impl OpenedPackage {
    fn new(name: &str, archive: PackageArchive) -> Self {
        let mut by_name = AHashMap::with_capacity(archive.entries.len());
        for (position, entry) in archive.entries.iter().enumerate() {
            let Some(asset_name) = asset_name_from_path(&entry.path) else {
                log::warn!(
                    "Package '{name}': skipping '{}', it has no extension",
                    entry.path
                );
                continue;
            };
            if by_name.contains_key(asset_name) {
                log::warn!(
                    "Package '{name}': '{}' shadows an earlier asset named '{asset_name}'",
                    entry.path
                );
                continue;
            }
            by_name.insert(asset_name.to_string(), position);
        }

        Self {
            name: name.to_string(),
            entries: archive.entries,
            by_name,
        }
    }

    /// The name the package was opened under.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn entry(&self, asset_name: &str) -> Result<&PackageEntry, LoadError> {
        self.by_name
            .get(asset_name)
            .map(|&position| &self.entries[position])
            .ok_or_else(|| LoadError::AssetNotFound {
                package: self.name.clone(),
                name: asset_name.to_string(),
            })
    }
}

/// Opens packages stored as `<root>/<package name>` archive files and decodes
/// their assets with `D`.
pub struct DirectoryPackageLoader<A, D> {
    root: PathBuf,
    decoder: D,
    released: usize,
    _asset: PhantomData<fn() -> A>,
}

impl<A: Asset, D: AssetDecoder<A>> DirectoryPackageLoader<A, D> {
    /// Creates a loader reading packages under `root`.
    pub fn new(root: impl Into<PathBuf>, decoder: D) -> Self {
        Self {
            root: root.into(),
            decoder,
            released: 0,
            _asset: PhantomData,
        }
    }

    /// The directory packages are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of packages released through [`PackageLoader::unload_package`].
    pub fn released_packages(&self) -> usize {
        self.released
    }

    fn package_path(&self, name: &str) -> Result<PathBuf, LoadError> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Err(LoadError::PackageNotFound {
                path: path.display().to_string(),
            });
        }
        Ok(path)
    }
}

fn read_package(
    name: &str,
    path: &Path,
    mut on_progress: impl FnMut(f32),
) -> Result<OpenedPackage, LoadError> {
    let io_error = |source| LoadError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let total = file.metadata().map_err(io_error)?.len().max(1) as f32;

    let mut bytes = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let read = file.read(&mut chunk).map_err(io_error)?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);
        // Reading is most of the work; decoding takes the last tenth.
        on_progress(0.9 * bytes.len() as f32 / total);
    }

    let archive = PackageArchive::decode(name, &bytes)?;
    Ok(OpenedPackage::new(name, archive))
}

fn decode_entry<A: Asset, D: AssetDecoder<A>>(
    decoder: &D,
    entry: &PackageEntry,
) -> Result<A, LoadError> {
    decoder
        .decode(&entry.path, &entry.bytes)
        .map_err(|e| LoadError::Decode {
            name: entry.path.clone(),
            reason: e.to_string(),
        })
}

impl<A: Asset, D: AssetDecoder<A>> PackageLoader for DirectoryPackageLoader<A, D> {
    type Package = OpenedPackage;
    type Asset = A;
    type PackageOp = ThreadedOp<OpenedPackage>;
    type AssetOp = ThreadedOp<A>;

    fn open_package(&mut self, name: &str) -> Result<OpenedPackage, LoadError> {
        let path = self.package_path(name)?;
        let package = read_package(name, &path, |_| {})?;
        log::debug!(
            "Opened package '{name}' ({} assets) from '{}'",
            package.entries.len(),
            path.display()
        );
        Ok(package)
    }

    fn open_package_async(&mut self, name: &str) -> Result<ThreadedOp<OpenedPackage>, LoadError> {
        let path = self.package_path(name)?;
        let package_name = name.to_string();
        ThreadedOp::spawn(name, move |progress| {
            read_package(&package_name, &path, |fraction| progress.set(fraction))
        })
    }

    fn asset_names(&self, package: &OpenedPackage) -> Vec<String> {
        package
            .entries
            .iter()
            .map(|entry| entry.path.clone())
            .collect()
    }

    fn load_asset(&mut self, package: &Arc<OpenedPackage>, name: &str) -> Result<A, LoadError> {
        let entry = package.entry(name)?;
        decode_entry(&self.decoder, entry)
    }

    fn load_asset_async(
        &mut self,
        package: &Arc<OpenedPackage>,
        name: &str,
    ) -> Result<ThreadedOp<A>, LoadError> {
        // Fail on a missing entry before spawning.
        package.entry(name)?;

        let package = Arc::clone(package);
        let decoder = self.decoder.clone();
        let asset_name = name.to_string();
        ThreadedOp::spawn(name, move |_| {
            let entry = package.entry(&asset_name)?;
            decode_entry(&decoder, entry)
        })
    }

    fn unload_package(&mut self, package: &OpenedPackage, unload_all_instances: bool) {
        self.released += 1;
        log::debug!(
            "Released package '{}' (unload_all_instances: {unload_all_instances})",
            package.name
        );
    }
}
