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

//! The on-disk package format: a bincode-encoded list of `(path, bytes)` entries.

use larder_core::error::LoadError;
use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};

/// Version written by [`PackageBuilder`]. Readers reject any other.
pub const ARCHIVE_VERSION: u32 = 1;

/// One asset stored in a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageEntry {
    /// The asset's path inside the package, e.g. `Assets/Particles/fire.prefab`.
    pub path: String,
    /// The asset's raw bytes.
    pub bytes: Vec<u8>,
}

/// The decoded content of a package file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageArchive {
    /// Format version.
    pub version: u32,
    /// Every asset in the package, in insertion order.
    pub entries: Vec<PackageEntry>,
}

impl PackageArchive {
    /// Decodes an archive, labelling errors with `origin`.
    pub fn decode(origin: &str, bytes: &[u8]) -> Result<Self, LoadError> {
        let config = bincode::config::standard();
        let (archive, _): (PackageArchive, _) = bincode::serde::decode_from_slice(bytes, config)
            .map_err(|e| LoadError::Corrupt {
                path: origin.to_string(),
                reason: e.to_string(),
            })?;

        if archive.version != ARCHIVE_VERSION {
            return Err(LoadError::Corrupt {
                path: origin.to_string(),
                reason: format!(
                    "unsupported archive version {} (expected {ARCHIVE_VERSION})",
                    archive.version
                ),
            });
        }
        Ok(archive)
    }
}

/// Assembles a package file from in-memory assets.
#[derive(Debug, Default)]
pub struct PackageBuilder {
    entries: Vec<PackageEntry>,
}

impl PackageBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an asset stored under `path`.
    pub fn with_asset(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.push(PackageEntry {
            path: path.into(),
            bytes: bytes.into(),
        });
        self
    }

    /// Encodes the package.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::error::EncodeError> {
        let archive = PackageArchiveRef {
            version: ARCHIVE_VERSION,
            entries: &self.entries,
        };
        bincode::serde::encode_to_vec(&archive, bincode::config::standard())
    }

    /// Encodes the package and writes it to `path`.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = self
            .to_bytes()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(path, bytes)?;
        log::debug!(
            "Wrote package '{}' with {} asset(s)",
            path.display(),
            self.entries.len()
        );
        Ok(())
    }
}

// Borrowing twin of `PackageArchive`, so encoding does not clone the entries.
#[derive(Serialize)]
struct PackageArchiveRef<'a> {
    version: u32,
    entries: &'a [PackageEntry],
}
