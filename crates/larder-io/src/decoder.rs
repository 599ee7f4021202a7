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

//! Payload decoders that turn packaged bytes into assets.

use larder_core::asset::Asset;
use std::error::Error;

/// A trait for types that turn the raw bytes of a packaged asset into a payload.
///
/// Implementors do the potentially CPU-intensive parsing work. Decoders are
/// cloned onto worker threads for asynchronous loads, so they should be cheap
/// to clone.
pub trait AssetDecoder<A: Asset>: Clone + Send + Sync + 'static {
    /// Parses the bytes stored at `path` into an instance of `A`.
    ///
    /// The error must be thread-safe.
    fn decode(&self, path: &str, bytes: &[u8]) -> Result<A, Box<dyn Error + Send + Sync>>;
}

/// An undecoded asset: its package path and bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAsset {
    /// Path inside the package.
    pub path: String,
    /// Raw content.
    pub bytes: Vec<u8>,
}

impl Asset for RawAsset {}

/// Decodes nothing; yields the bytes as a [`RawAsset`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl AssetDecoder<RawAsset> for RawDecoder {
    fn decode(&self, path: &str, bytes: &[u8]) -> Result<RawAsset, Box<dyn Error + Send + Sync>> {
        Ok(RawAsset {
            path: path.to_string(),
            bytes: bytes.to_vec(),
        })
    }
}
