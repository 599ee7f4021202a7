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

//! # Larder Data
//!
//! Storage layouts owned by the cache: the open-addressing [`ProbedTable`] that
//! holds every cache slot, and the [`NameIndex`] that maps an asset name to the
//! package providing it.

#![warn(missing_docs)]

pub mod name_index;
pub mod table;

pub use name_index::NameIndex;
pub use table::{ProbedTable, Slot, TableError};
