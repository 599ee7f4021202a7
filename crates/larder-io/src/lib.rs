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

//! # Larder IO
//!
//! A concrete package loader for the cache. Packages are single archive files
//! under a root directory; their assets are decoded by a pluggable
//! [`AssetDecoder`]. Asynchronous variants run on worker threads and are
//! exposed to the cache as pollable [`ThreadedOp`]s.

#![warn(missing_docs)]

pub mod archive;
pub mod decoder;
pub mod directory;
pub mod op;

pub use archive::{PackageArchive, PackageBuilder, PackageEntry};
pub use decoder::{AssetDecoder, RawAsset, RawDecoder};
pub use directory::{DirectoryPackageLoader, OpenedPackage};
pub use op::{ProgressReporter, ThreadedOp};
