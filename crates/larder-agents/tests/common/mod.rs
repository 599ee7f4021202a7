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

//! An in-memory package loader whose asynchronous operations are completed by
//! hand, so tests decide exactly when each load finishes.

#![allow(dead_code)]

use larder_core::asset::{asset_name_from_path, Asset, Instantiator, Placement, Provides};
use larder_core::error::LoadError;
use larder_core::loader::{AsyncOp, PackageLoader};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

// --- Test payloads ---

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestAsset {
    Mesh(Mesh),
    Text(String),
}
impl Asset for TestAsset {}

impl Provides<Mesh> for TestAsset {
    fn provide(&self) -> Option<&Mesh> {
        match self {
            TestAsset::Mesh(mesh) => Some(mesh),
            TestAsset::Text(_) => None,
        }
    }
}

impl Provides<str> for TestAsset {
    fn provide(&self) -> Option<&str> {
        match self {
            TestAsset::Text(text) => Some(text),
            TestAsset::Mesh(_) => None,
        }
    }
}

/// Records every mesh it is asked to spawn.
#[derive(Default)]
pub struct MeshSpawner {
    pub spawned: Vec<(u32, Option<[f32; 3]>, Option<u64>)>,
}

impl Instantiator<Mesh> for MeshSpawner {
    type Instance = usize;
    type Parent = u64;

    fn instantiate(&mut self, prototype: &Mesh, placement: Option<&Placement<u64>>) -> usize {
        self.spawned.push((
            prototype.vertices,
            placement.map(|p| p.position),
            placement.and_then(|p| p.parent),
        ));
        self.spawned.len() - 1
    }
}

// --- Manual operations ---

struct OpState<T> {
    progress: f32,
    done: bool,
    result: Option<Result<T, LoadError>>,
}

/// An operation that only finishes when its [`OpControl`] says so.
pub struct ManualOp<T>(Rc<RefCell<OpState<T>>>);

/// The test's side of a [`ManualOp`].
pub struct OpControl<T>(Rc<RefCell<OpState<T>>>);

impl<T> Clone for OpControl<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T> OpControl<T> {
    pub fn set_progress(&self, progress: f32) {
        self.0.borrow_mut().progress = progress;
    }

    pub fn finish(&self) {
        let mut state = self.0.borrow_mut();
        state.progress = 1.0;
        state.done = true;
    }

    pub fn fail(&self, error: LoadError) {
        let mut state = self.0.borrow_mut();
        state.result = Some(Err(error));
        state.done = true;
    }
}

fn manual_pair<T>(result: T) -> (ManualOp<T>, OpControl<T>) {
    let state = Rc::new(RefCell::new(OpState {
        progress: 0.0,
        done: false,
        result: Some(Ok(result)),
    }));
    (ManualOp(Rc::clone(&state)), OpControl(state))
}

impl<T> AsyncOp for ManualOp<T> {
    type Output = T;

    fn is_done(&self) -> bool {
        self.0.borrow().done
    }

    fn progress(&self) -> f32 {
        self.0.borrow().progress
    }

    fn take_result(&mut self) -> Result<T, LoadError> {
        self.0
            .borrow_mut()
            .result
            .take()
            .unwrap_or_else(|| Err(LoadError::Interrupted { name: "manual".into() }))
    }
}

// --- Loader ---

#[derive(Debug, Clone)]
pub struct MemoryPackage {
    pub name: String,
    pub assets: Vec<(String, TestAsset)>,
}

impl MemoryPackage {
    fn find(&self, name: &str) -> Option<&TestAsset> {
        self.assets
            .iter()
            .find(|(path, _)| asset_name_from_path(path) == Some(name))
            .map(|(_, asset)| asset)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub open_package: usize,
    pub load_asset: usize,
    pub unload_package: usize,
}

#[derive(Default)]
pub struct MemoryLoader {
    packages: HashMap<String, MemoryPackage>,
    package_ops: RefCell<HashMap<String, OpControl<MemoryPackage>>>,
    asset_ops: RefCell<HashMap<String, OpControl<TestAsset>>>,
    pub calls: Calls,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_package(mut self, name: &str, assets: &[(&str, TestAsset)]) -> Self {
        let package = MemoryPackage {
            name: name.to_string(),
            assets: assets
                .iter()
                .map(|(path, asset)| (path.to_string(), asset.clone()))
                .collect(),
        };
        self.packages.insert(name.to_string(), package);
        self
    }

    /// The control of the latest asynchronous open of `name`.
    pub fn package_op(&self, name: &str) -> OpControl<MemoryPackage> {
        self.package_ops.borrow()[name].clone()
    }

    /// The control of the latest asynchronous load of `name`.
    pub fn asset_op(&self, name: &str) -> OpControl<TestAsset> {
        self.asset_ops.borrow()[name].clone()
    }

    fn package(&self, name: &str) -> Result<&MemoryPackage, LoadError> {
        self.packages.get(name).ok_or_else(|| LoadError::PackageNotFound {
            path: name.to_string(),
        })
    }

    fn asset(&self, package: &MemoryPackage, name: &str) -> Result<TestAsset, LoadError> {
        package.find(name).cloned().ok_or_else(|| LoadError::AssetNotFound {
            package: package.name.clone(),
            name: name.to_string(),
        })
    }
}

impl PackageLoader for MemoryLoader {
    type Package = MemoryPackage;
    type Asset = TestAsset;
    type PackageOp = ManualOp<MemoryPackage>;
    type AssetOp = ManualOp<TestAsset>;

    fn open_package(&mut self, name: &str) -> Result<MemoryPackage, LoadError> {
        self.calls.open_package += 1;
        self.package(name).cloned()
    }

    fn open_package_async(&mut self, name: &str) -> Result<Self::PackageOp, LoadError> {
        self.calls.open_package += 1;
        let (op, control) = manual_pair(self.package(name)?.clone());
        self.package_ops.borrow_mut().insert(name.to_string(), control);
        Ok(op)
    }

    fn asset_names(&self, package: &MemoryPackage) -> Vec<String> {
        package.assets.iter().map(|(path, _)| path.clone()).collect()
    }

    fn load_asset(
        &mut self,
        package: &Arc<MemoryPackage>,
        name: &str,
    ) -> Result<TestAsset, LoadError> {
        self.calls.load_asset += 1;
        self.asset(package, name)
    }

    fn load_asset_async(
        &mut self,
        package: &Arc<MemoryPackage>,
        name: &str,
    ) -> Result<Self::AssetOp, LoadError> {
        self.calls.load_asset += 1;
        let (op, control) = manual_pair(self.asset(package, name)?);
        self.asset_ops.borrow_mut().insert(name.to_string(), control);
        Ok(op)
    }

    fn unload_package(&mut self, _package: &MemoryPackage, _unload_all_instances: bool) {
        self.calls.unload_package += 1;
    }
}

/// The bundles most tests start from.
pub fn effects_loader() -> MemoryLoader {
    MemoryLoader::new()
        .with_package(
            "particles",
            &[
                ("fx/fire_particle.mesh", TestAsset::Mesh(Mesh { vertices: 12 })),
                ("fx/smoke_particle.mesh", TestAsset::Mesh(Mesh { vertices: 8 })),
                ("fx/spark.mesh", TestAsset::Mesh(Mesh { vertices: 4 })),
                ("fx/readme.txt", TestAsset::Text("fire and smoke".into())),
            ],
        )
        .with_package(
            "ui",
            &[("ui/button.mesh", TestAsset::Mesh(Mesh { vertices: 6 }))],
        )
        .with_package(
            "particles_copy",
            &[("copy/fire_particle.mesh", TestAsset::Mesh(Mesh { vertices: 1 }))],
        )
}
