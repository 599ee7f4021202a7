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

//! The capability interface a loaded payload exposes, and the host facility
//! that turns a cached prototype into a live instance.

/// A loaded payload that can be viewed as a `T`.
///
/// Payloads implement this once per shape they can provide, so a request for
/// a shape is resolved at compile time. A payload may still decline at run
/// time (e.g. an enum payload holding a different variant) by returning `None`.
pub trait Provides<T: ?Sized> {
    /// Returns the `T` view of this payload, if it has one.
    fn provide(&self) -> Option<&T>;
}

impl<T> Provides<T> for T {
    fn provide(&self) -> Option<&T> {
        Some(self)
    }
}

/// Where a new instance is placed, and under which parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement<P> {
    /// World-space position.
    pub position: [f32; 3],
    /// Rotation as a quaternion in `[x, y, z, w]` order.
    pub rotation: [f32; 4],
    /// Optional parent the instance is attached to.
    pub parent: Option<P>,
}

impl<P> Placement<P> {
    /// A placement at `position` with `rotation` and no parent.
    pub fn at(position: [f32; 3], rotation: [f32; 4]) -> Self {
        Self {
            position,
            rotation,
            parent: None,
        }
    }

    /// Attaches the instance to `parent`.
    pub fn with_parent(mut self, parent: P) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// The host facility that produces live copies of cached prototypes.
pub trait Instantiator<T: ?Sized> {
    /// What a live copy looks like to the host.
    type Instance;
    /// What the host uses to identify a parent.
    type Parent;

    /// Produces a live copy of `prototype`, optionally placed.
    fn instantiate(
        &mut self,
        prototype: &T,
        placement: Option<&Placement<Self::Parent>>,
    ) -> Self::Instance;
}
