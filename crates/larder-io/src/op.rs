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

//! Asynchronous operations backed by a worker thread.

use larder_core::{error::LoadError, loader::AsyncOp};
use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    thread,
};

/// The worker-side half of a [`ThreadedOp`], used to publish progress.
#[derive(Debug, Clone)]
pub struct ProgressReporter(Arc<AtomicU32>);

impl ProgressReporter {
    /// Publishes `progress`, clamped to `[0, 1]`.
    pub fn set(&self, progress: f32) {
        self.0
            .store(progress.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }
}

/// An [`AsyncOp`] whose work runs on its own thread.
///
/// The worker publishes fractional progress through an atomic and sends its
/// result over a `flume` channel. The operation is done once the result has
/// arrived, or once the worker is gone without sending one.
pub struct ThreadedOp<T> {
    name: String,
    progress: Arc<AtomicU32>,
    receiver: flume::Receiver<Result<T, LoadError>>,
}

impl<T: Send + 'static> ThreadedOp<T> {
    /// Spawns a worker thread running `work`, labelled `name` in logs and errors.
    pub fn spawn<F>(name: impl Into<String>, work: F) -> Result<Self, LoadError>
    where
        F: FnOnce(&ProgressReporter) -> Result<T, LoadError> + Send + 'static,
    {
        let name = name.into();
        let progress = Arc::new(AtomicU32::new(0f32.to_bits()));
        let reporter = ProgressReporter(progress.clone());
        let (sender, receiver) = flume::bounded(1);

        let thread_name = format!("larder-io:{name}");
        thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                let result = work(&reporter);
                if result.is_ok() {
                    reporter.set(1.0);
                }
                if sender.send(result).is_err() {
                    log::trace!("Async load result dropped: the operation was discarded.");
                }
            })
            .map_err(|source| LoadError::Io {
                path: name.clone(),
                source,
            })?;

        Ok(Self {
            name,
            progress,
            receiver,
        })
    }
}

impl<T> AsyncOp for ThreadedOp<T> {
    type Output = T;

    fn is_done(&self) -> bool {
        !self.receiver.is_empty() || self.receiver.is_disconnected()
    }

    fn progress(&self) -> f32 {
        f32::from_bits(self.progress.load(Ordering::Relaxed))
    }

    fn take_result(&mut self) -> Result<T, LoadError> {
        self.receiver
            .try_recv()
            .unwrap_or_else(|_| {
                Err(LoadError::Interrupted {
                    name: self.name.clone(),
                })
            })
    }
}
