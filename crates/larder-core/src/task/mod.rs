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

//! Cooperative, single-threaded step scheduling.
//!
//! Asynchronous loads never block: the cache registers a step function that the
//! host invokes once per update tick until the step reports it is done. Each
//! step receives the context it works on (`&mut C`) explicitly, so no step holds
//! a borrow across ticks.

/// What a step reports after being invoked for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Invoke the step again on the next tick.
    Running,
    /// The step is finished and can be retired.
    Done,
}

/// A step function polled once per tick with the context it drives.
pub type Step<C> = Box<dyn FnMut(&mut C) -> StepStatus>;

/// The cooperative scheduler contract consumed by the cache.
pub trait Scheduler<C> {
    /// Registers `step` to be invoked once per tick until it reports [`StepStatus::Done`].
    fn schedule(&mut self, step: Step<C>) -> StepHandle;
}

/// A generational reference to a scheduled step.
///
/// A handle whose step has been retired never matches the step that later
/// reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StepHandle {
    index: u32,
    generation: u32,
}

/// Whether the step behind a handle is still scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// The step will be invoked on the next tick.
    Running,
    /// The step finished or was ended.
    Stopped,
}

struct StepSlot<C> {
    step: Option<Step<C>>,
    generation: u32,
}

/// A slot-based step runner with recycled slots.
///
/// Retired slots go onto a free list and their generation is bumped, so stale
/// [`StepHandle`]s are detected in O(1).
pub struct StepScheduler<C> {
    slots: Vec<StepSlot<C>>,
    free: Vec<u32>,
}

impl<C> StepScheduler<C> {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Invokes every live step once, retiring those that report [`StepStatus::Done`].
    ///
    /// Steps scheduled during this call are first invoked on the next one.
    pub fn run(&mut self, context: &mut C) {
        let live = self.slots.len();
        for index in 0..live {
            let Some(mut step) = self.slots[index].step.take() else {
                continue;
            };
            let status = step(context);

            match status {
                StepStatus::Running => self.slots[index].step = Some(step),
                StepStatus::Done => self.retire(index as u32),
            }
        }
    }

    /// Ends a step before it completes. Stale handles are ignored.
    pub fn end(&mut self, handle: StepHandle) {
        if self.status(handle) == StepState::Running {
            self.retire(handle.index);
        }
    }

    /// Reports whether the step behind `handle` is still scheduled.
    pub fn status(&self, handle: StepHandle) -> StepState {
        match self.slots.get(handle.index as usize) {
            Some(slot) if slot.generation == handle.generation && slot.step.is_some() => {
                StepState::Running
            }
            _ => StepState::Stopped,
        }
    }

    /// Number of steps currently scheduled.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns `true` if no step is scheduled.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn retire(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.step = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
    }
}

impl<C> Default for StepScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Scheduler<C> for StepScheduler<C> {
    fn schedule(&mut self, step: Step<C>) -> StepHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.step = Some(step);
            StepHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(StepSlot {
                step: Some(step),
                generation: 0,
            });
            StepHandle {
                index,
                generation: 0,
            }
        }
    }
}

/// A step that stays scheduled for `ticks` invocations.
pub fn wait_ticks<C>(ticks: u32) -> Step<C> {
    let mut remaining = ticks;
    Box::new(move |_| {
        if remaining <= 1 {
            StepStatus::Done
        } else {
            remaining -= 1;
            StepStatus::Running
        }
    })
}
