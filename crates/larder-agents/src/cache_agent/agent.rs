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

//! The CacheAgent is responsible for loading, caching, and releasing named resources.

use std::any::type_name;
use std::sync::Arc;
use std::task::Poll;

use larder_core::asset::{
    asset_name_from_path, name_hash, AssetHandle, Instantiator, Placement, Provides, ResourceHandle,
};
use larder_core::loader::{AsyncOp, PackageLoader};
use larder_core::task::{Scheduler, StepStatus};
use larder_core::{CacheConfig, CacheError};
use ahash::AHashMap;
use larder_data::{NameIndex, ProbedTable};

use super::descriptor::{LoadDescriptor, LoadKind, Member, PendingOp, RequestId, Role};
use super::entry::{AssetStatus, CacheEntry, EntryKind};

/// Completion callback of an asynchronous request.
///
/// It fires exactly once per request, with `Err` if any part of the request
/// failed or was cancelled.
pub type OnLoaded<L> = Box<dyn FnOnce(&mut CacheAgent<L>, Result<(), CacheError>)>;

/// Maps resource names to loaded assets, loading each at most once.
///
/// The agent is an explicit context object: the host creates it with
/// [`init`](Self::init), passes it by reference to every call site and to the
/// scheduler that drives its asynchronous loads, and tears it down with
/// [`dispose`](Self::dispose).
pub struct CacheAgent<L: PackageLoader> {
    loader: L,
    table: ProbedTable<CacheEntry<L>>,
    index: NameIndex<L::Package>,
    config: CacheConfig,
    next_request: u64,
    /// Why the last asynchronous load of a name failed, for requests awaiting it.
    failures: AHashMap<u32, String>,
}

impl<L: PackageLoader> CacheAgent<L> {
    /// Creates an empty cache on top of `loader`.
    pub fn init(loader: L, config: CacheConfig) -> Self {
        log::info!(
            "CacheAgent: initialized with {} slots (load factor {}%)",
            config.initial_capacity,
            config.load_factor_percent
        );
        Self {
            loader,
            table: ProbedTable::with_limits(
                config.initial_capacity,
                config.load_factor_percent,
                config.tombstone_rehash_percent,
            ),
            index: NameIndex::new(),
            config,
            next_request: 0,
            failures: AHashMap::new(),
        }
    }

    /// Unloads everything and hands the loader back.
    pub fn dispose(mut self) -> L {
        self.unload_all();
        log::info!("CacheAgent: disposed");
        self.loader
    }

    // --- Packages ---

    /// Opens the package `name` and indexes every asset it provides.
    pub fn load_bundle(&mut self, name: &str) -> Result<ResourceHandle, CacheError> {
        let hash = name_hash(name);
        self.ensure_bundle_absent(name, hash)?;

        let package = Arc::new(self.loader.open_package(name)?);
        let indexed = match self.index_package(name, &package) {
            Ok(indexed) => indexed,
            Err(e) => {
                self.loader.unload_package(&package, true);
                return Err(e);
            }
        };

        self.table
            .insert_or_get(hash, || CacheEntry::loaded_package(name, package));
        log::info!("CacheAgent: loaded package '{name}' ({indexed} assets)");
        Ok(ResourceHandle::from_hash(hash))
    }

    /// Starts opening the package `name`; `on_done` fires once it is indexed.
    pub fn load_bundle_async<S>(
        &mut self,
        scheduler: &mut S,
        name: &str,
        on_done: impl FnOnce(&mut Self, Result<(), CacheError>) + 'static,
    ) -> Result<ResourceHandle, CacheError>
    where
        S: Scheduler<Self> + ?Sized,
    {
        let hash = name_hash(name);
        self.ensure_bundle_absent(name, hash)?;

        let op = self.loader.open_package_async(name)?;
        let request = self.next_request();
        let descriptor = LoadDescriptor::new(LoadKind::SinglePackage, request, PendingOp::Package(op));
        self.table.insert_or_get(hash, || {
            CacheEntry::loading(name, EntryKind::Package, None, descriptor)
        });

        log::debug!("CacheAgent: opening package '{name}'");
        Self::schedule_request(scheduler, request, vec![Member::owned(hash, name)], Box::new(on_done));
        Ok(ResourceHandle::from_hash(hash))
    }

    /// Starts opening several packages that complete together.
    ///
    /// The returned handle is the batch head: its progress is the mean progress
    /// of every package in the batch. `on_done` fires once, after all of them
    /// are opened and indexed.
    pub fn load_bundles_async<S>(
        &mut self,
        scheduler: &mut S,
        names: &[&str],
        on_done: impl FnOnce(&mut Self, Result<(), CacheError>) + 'static,
    ) -> Result<ResourceHandle, CacheError>
    where
        S: Scheduler<Self> + ?Sized,
    {
        let Some(head_name) = names.first() else {
            return Err(self.violation(CacheError::EmptyBatch));
        };

        let hashes: Vec<u32> = names.iter().map(|name| name_hash(name)).collect();
        for (position, (name, &hash)) in names.iter().zip(&hashes).enumerate() {
            self.ensure_bundle_absent(name, hash)?;
            if hashes[..position].contains(&hash) {
                return Err(self.violation(CacheError::PackageAlreadyLoaded {
                    name: name.to_string(),
                }));
            }
        }

        // Start every operation before touching the table, so a failure leaves no trace.
        let mut ops = Vec::with_capacity(names.len());
        for name in names {
            ops.push(self.loader.open_package_async(name)?);
        }

        let request = self.next_request();
        let children: Vec<ResourceHandle> =
            hashes.iter().map(|&hash| ResourceHandle::from_hash(hash)).collect();
        let mut members = Vec::with_capacity(names.len());

        for (position, ((name, &hash), op)) in names.iter().zip(&hashes).zip(ops).enumerate() {
            let kind = if position == 0 {
                LoadKind::PackageBatch
            } else {
                LoadKind::SinglePackage
            };
            let mut descriptor = LoadDescriptor::new(kind, request, PendingOp::Package(op));
            if position == 0 {
                descriptor.children = children.clone();
            }
            self.table.insert_or_get(hash, || {
                CacheEntry::loading(name, EntryKind::Package, None, descriptor)
            });
            members.push(Member::owned(hash, name));
        }

        log::debug!(
            "CacheAgent: opening {} packages, head '{head_name}'",
            names.len()
        );
        Self::schedule_request(scheduler, request, members, Box::new(on_done));
        Ok(children[0])
    }

    /// Unloads the package `name`, removing every cached asset it provided.
    ///
    /// Refused while any of its assets is still loading.
    pub fn unload_bundle(&mut self, name: &str) -> Result<(), CacheError> {
        let hash = name_hash(name);
        let not_loaded = || CacheError::PackageNotLoaded {
            name: name.to_string(),
        };

        let Some(slot) = self.table.find_if_exists(hash) else {
            return Err(self.violation(not_loaded()));
        };
        let package = match self.table.get(slot) {
            Some(entry) if entry.is_package() && entry.status == AssetStatus::Loading => {
                return Err(self.violation(CacheError::PendingLoads {
                    package: name.to_string(),
                    pending: 1,
                }));
            }
            Some(entry) if entry.is_package() => entry.package.clone(),
            _ => None,
        };
        let Some(package) = package else {
            return Err(self.violation(not_loaded()));
        };

        let pending = self
            .table
            .iter()
            .filter(|(_, _, entry)| {
                !entry.is_package()
                    && entry.status == AssetStatus::Loading
                    && entry.is_owned_by(&package)
            })
            .count();
        if pending > 0 {
            return Err(self.violation(CacheError::PendingLoads {
                package: name.to_string(),
                pending,
            }));
        }

        let mut removed = 0;
        for path in self.loader.asset_names(&package) {
            let Some(asset_name) = asset_name_from_path(&path) else {
                continue;
            };
            let asset_hash = name_hash(asset_name);

            if let Some(index) = self.table.find_if_exists(asset_hash) {
                let owned = self
                    .table
                    .get(index)
                    .is_some_and(|entry| !entry.is_package() && entry.is_owned_by(&package));
                if owned {
                    self.table.remove(index);
                    removed += 1;
                }
            }
        }
        self.index.unregister_all(&package);

        self.loader.unload_package(&package, true);
        self.table.remove(slot);
        log::info!("CacheAgent: unloaded package '{name}' ({removed} cached assets released)");
        Ok(())
    }

    /// Releases every package and empties the cache without shrinking it.
    ///
    /// In-flight requests are dropped; their callbacks fire with
    /// [`CacheError::LoadCancelled`] on their next step.
    pub fn unload_all(&mut self) {
        let mut packages = 0;
        let mut cancelled = 0;
        for (_, entry) in self.table.drain() {
            if entry.descriptor.is_some() {
                cancelled += 1;
            }
            if let (EntryKind::Package, Some(package)) = (entry.kind, &entry.package) {
                self.loader.unload_package(package, true);
                packages += 1;
            }
        }
        self.index.clear();
        self.failures.clear();

        if cancelled > 0 {
            log::warn!("CacheAgent: unload_all dropped {cancelled} in-flight load(s)");
        }
        log::info!("CacheAgent: unloaded all ({packages} packages)");
    }

    // --- Assets ---

    /// Loads the asset `name`, blocking until it is available.
    ///
    /// A cached name returns its existing handle without touching the loader.
    pub fn load_asset(&mut self, name: &str) -> Result<ResourceHandle, CacheError> {
        let hash = name_hash(name);
        let package = self.resolve_owner(name, hash)?;

        if self.asset_slot_status(name, hash)?.is_some() {
            log::trace!("CacheAgent: cache hit for '{name}'");
            return Ok(ResourceHandle::from_hash(hash));
        }

        let asset = self.loader.load_asset(&package, name)?;
        self.failures.remove(&hash);
        self.table
            .insert_or_get(hash, || CacheEntry::loaded_asset(name, package, asset));
        log::debug!("CacheAgent: loaded asset '{name}'");
        Ok(ResourceHandle::from_hash(hash))
    }

    /// Starts loading the asset `name`.
    ///
    /// On a cache hit `on_done` runs before this returns. If another request is
    /// already loading the name, this one waits for it instead of loading again.
    pub fn load_asset_async<S>(
        &mut self,
        scheduler: &mut S,
        name: &str,
        on_done: impl FnOnce(&mut Self, Result<(), CacheError>) + 'static,
    ) -> Result<ResourceHandle, CacheError>
    where
        S: Scheduler<Self> + ?Sized,
    {
        let hash = name_hash(name);
        let package = self.resolve_owner(name, hash)?;
        let handle = ResourceHandle::from_hash(hash);

        match self.asset_slot_status(name, hash)? {
            Some(AssetStatus::Loaded) => {
                log::trace!("CacheAgent: cache hit for '{name}'");
                on_done(self, Ok(()));
                return Ok(handle);
            }
            Some(AssetStatus::Loading) => {
                let request = self.next_request();
                Self::schedule_request(
                    scheduler,
                    request,
                    vec![Member::awaited(hash, name)],
                    Box::new(on_done),
                );
                return Ok(handle);
            }
            None => {}
        }

        let op = self.loader.load_asset_async(&package, name)?;
        let request = self.next_request();
        let descriptor = LoadDescriptor::new(LoadKind::SingleItem, request, PendingOp::Asset(op));
        self.failures.remove(&hash);
        self.table.insert_or_get(hash, || {
            CacheEntry::loading(name, EntryKind::Asset, Some(package), descriptor)
        });

        log::debug!("CacheAgent: loading asset '{name}'");
        Self::schedule_request(scheduler, request, vec![Member::owned(hash, name)], Box::new(on_done));
        Ok(handle)
    }

    /// Starts loading several assets that complete together.
    ///
    /// Returns one handle per name, in order. The first is the batch head:
    /// while it loads, its progress is the mean progress of every asset this
    /// batch started. Cached names contribute nothing; `on_done` fires once,
    /// after everything the batch depends on is loaded.
    pub fn load_assets_async<S>(
        &mut self,
        scheduler: &mut S,
        names: &[&str],
        on_done: impl FnOnce(&mut Self, Result<(), CacheError>) + 'static,
    ) -> Result<Vec<ResourceHandle>, CacheError>
    where
        S: Scheduler<Self> + ?Sized,
    {
        if names.is_empty() {
            return Err(self.violation(CacheError::EmptyBatch));
        }

        // Every name must be resolvable before anything starts.
        let mut owners = Vec::with_capacity(names.len());
        for name in names {
            let hash = name_hash(name);
            owners.push((hash, self.resolve_owner(name, hash)?));
            self.asset_slot_status(name, hash)?;
        }

        let request = self.next_request();
        let mut handles = Vec::with_capacity(names.len());
        let mut members: Vec<Member> = Vec::new();
        let mut children = Vec::new();

        for (name, (hash, package)) in names.iter().zip(owners) {
            let handle = ResourceHandle::from_hash(hash);
            handles.push(handle);

            if members.iter().any(|member| member.hash == hash) {
                continue;
            }
            match self.table.get_by_hash(hash).map(|entry| entry.status) {
                Some(AssetStatus::Loaded) => continue,
                Some(AssetStatus::Loading) => {
                    members.push(Member::awaited(hash, name));
                    continue;
                }
                None => {}
            }

            let op = match self.loader.load_asset_async(&package, name) {
                Ok(op) => op,
                Err(e) => {
                    self.discard_owned(&members);
                    return Err(e.into());
                }
            };
            let descriptor = LoadDescriptor::new(LoadKind::SingleItem, request, PendingOp::Asset(op));
            self.failures.remove(&hash);
            self.table.insert_or_get(hash, || {
                CacheEntry::loading(name, EntryKind::Asset, Some(package), descriptor)
            });
            members.push(Member::owned(hash, name));
            children.push(handle);
        }

        if let Some(descriptor) = self
            .table
            .get_mut_by_hash(handles[0].hash())
            .and_then(|entry| entry.descriptor.as_mut())
            .filter(|descriptor| descriptor.request == request)
        {
            descriptor.kind = LoadKind::ItemBatch;
            descriptor.children = children;
        }

        if members.is_empty() {
            log::trace!("CacheAgent: every asset of the batch was cached");
            on_done(self, Ok(()));
        } else {
            log::debug!("CacheAgent: loading {} assets as a batch", names.len());
            Self::schedule_request(scheduler, request, members, Box::new(on_done));
        }
        Ok(handles)
    }

    // --- Queries ---

    /// Loading progress of the entry behind `handle`, in `[0, 1]`.
    ///
    /// Loaded entries report 1. A loading batch head reports the unweighted
    /// mean of its children's progress.
    pub fn loading_progress(&self, handle: ResourceHandle) -> Result<f32, CacheError> {
        let entry = self.entry(handle)?;
        let Some(descriptor) = entry.descriptor.as_ref() else {
            return Ok(1.0);
        };

        if !descriptor.kind.is_batch() || descriptor.children.is_empty() {
            return Ok(descriptor.op.progress());
        }

        let total: f32 = descriptor
            .children
            .iter()
            .map(|&child| self.child_progress(child))
            .sum();
        Ok(total / descriptor.children.len() as f32)
    }

    /// Progress of a whole batch request, given every handle it returned.
    ///
    /// Equal to [`loading_progress`](Self::loading_progress) of the head when
    /// the head carries the batch. A head that was already cached does not, so
    /// the mean is then taken over the distinct handles directly.
    pub fn batch_progress(&self, handles: &[ResourceHandle]) -> f32 {
        let Some(&head) = handles.first() else {
            return 1.0;
        };
        if self.load_kind(head).is_some_and(LoadKind::is_batch) {
            return self.loading_progress(head).unwrap_or(0.0);
        }

        let mut distinct: Vec<ResourceHandle> = Vec::with_capacity(handles.len());
        for &handle in handles {
            if !distinct.contains(&handle) {
                distinct.push(handle);
            }
        }
        let total: f32 = distinct
            .iter()
            .map(|&handle| self.child_progress(handle))
            .sum();
        total / distinct.len() as f32
    }

    fn child_progress(&self, child: ResourceHandle) -> f32 {
        match self.table.get_by_hash(child.hash()) {
            Some(entry) => entry
                .descriptor
                .as_ref()
                .map_or(1.0, |descriptor| descriptor.op.progress()),
            None => 0.0,
        }
    }

    /// Lifecycle state of the entry behind `handle`, if there is one.
    pub fn status(&self, handle: ResourceHandle) -> Option<AssetStatus> {
        self.table.get_by_hash(handle.hash()).map(|entry| entry.status)
    }

    /// The kind of load in flight for `handle`; `None` once it is loaded.
    pub fn load_kind(&self, handle: ResourceHandle) -> Option<LoadKind> {
        self.table
            .get_by_hash(handle.hash())?
            .descriptor
            .as_ref()
            .map(|descriptor| descriptor.kind)
    }

    /// Display name of the entry behind `handle`.
    pub fn name_of(&self, handle: ResourceHandle) -> Option<&str> {
        self.table
            .get_by_hash(handle.hash())
            .map(|entry| entry.name.as_str())
    }

    /// Returns `true` if an entry (loading or loaded) exists for `name`.
    pub fn is_cached(&self, name: &str) -> bool {
        self.table.contains(name_hash(name))
    }

    /// Returns `true` if some opened package provides `name`.
    pub fn is_indexed(&self, name: &str) -> bool {
        self.index.is_registered(name_hash(name))
    }

    /// Number of live entries, packages included.
    pub fn len(&self) -> usize {
        self.table.len() as usize
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Current number of slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity() as usize
    }

    /// The configuration the cache was created with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The package loader.
    pub fn loader(&self) -> &L {
        &self.loader
    }

    // --- Payload access ---

    /// The `T` view of the loaded payload behind `handle`.
    pub fn get<T>(&self, handle: ResourceHandle) -> Result<&T, CacheError>
    where
        T: ?Sized,
        L::Asset: Provides<T>,
    {
        let entry = self.entry(handle)?;
        if entry.is_package() {
            return Err(CacheError::NotAPayload {
                name: entry.name.clone(),
            });
        }
        let payload = entry.payload.as_ref().ok_or_else(|| CacheError::NotLoaded {
            name: entry.name.clone(),
        })?;
        Provides::<T>::provide(&**payload).ok_or_else(|| CacheError::WrongShape {
            name: entry.name.clone(),
            requested: type_name::<T>(),
        })
    }

    /// Asks `host` for a live copy of the cached asset `name`, loading it
    /// synchronously first if it is not cached.
    pub fn instantiate<T, H>(
        &mut self,
        host: &mut H,
        name: &str,
        placement: Option<&Placement<H::Parent>>,
    ) -> Result<H::Instance, CacheError>
    where
        T: ?Sized,
        L::Asset: Provides<T>,
        H: Instantiator<T>,
    {
        let handle = self.load_asset(name)?;
        self.instantiate_handle::<T, H>(host, handle, placement)
    }

    /// Asks `host` for a live copy of the loaded asset behind `handle`.
    pub fn instantiate_handle<T, H>(
        &self,
        host: &mut H,
        handle: ResourceHandle,
        placement: Option<&Placement<H::Parent>>,
    ) -> Result<H::Instance, CacheError>
    where
        T: ?Sized,
        L::Asset: Provides<T>,
        H: Instantiator<T>,
    {
        let prototype = self.get::<T>(handle)?;
        Ok(host.instantiate(prototype, placement))
    }

    // --- Internals ---

    fn entry(&self, handle: ResourceHandle) -> Result<&CacheEntry<L>, CacheError> {
        let index = self
            .table
            .find(handle.hash())
            .map_err(|_| CacheError::UnknownHandle {
                hash: handle.hash(),
            })?;
        self.table.get(index).ok_or(CacheError::UnknownHandle {
            hash: handle.hash(),
        })
    }

    fn next_request(&mut self) -> RequestId {
        self.next_request += 1;
        RequestId(self.next_request)
    }

    fn violation(&self, error: CacheError) -> CacheError {
        log::error!("CacheAgent: {error}");
        error
    }

    fn ensure_bundle_absent(&self, name: &str, hash: u32) -> Result<(), CacheError> {
        if self.table.contains(hash) {
            return Err(self.violation(CacheError::PackageAlreadyLoaded {
                name: name.to_string(),
            }));
        }
        Ok(())
    }

    fn resolve_owner(&self, name: &str, hash: u32) -> Result<Arc<L::Package>, CacheError> {
        match self.index.resolve(hash) {
            Some(package) => Ok(Arc::clone(package)),
            None => Err(self.violation(CacheError::NotIndexed {
                name: name.to_string(),
            })),
        }
    }

    /// Lifecycle of the asset slot for `name`. A package sharing the name
    /// occupies that slot, so the asset cannot be cached.
    fn asset_slot_status(&self, name: &str, hash: u32) -> Result<Option<AssetStatus>, CacheError> {
        match self.table.get_by_hash(hash) {
            Some(entry) if entry.is_package() => Err(self.violation(CacheError::NotAPayload {
                name: name.to_string(),
            })),
            Some(entry) => Ok(Some(entry.status)),
            None => Ok(None),
        }
    }

    /// Maps every asset name of `package` to it. Refuses the whole package if
    /// another package already provides one of its names.
    fn index_package(&mut self, name: &str, package: &Arc<L::Package>) -> Result<usize, CacheError> {
        let mut hashes = Vec::new();
        for path in self.loader.asset_names(package) {
            let Some(asset_name) = asset_name_from_path(&path) else {
                log::warn!("CacheAgent: package '{name}' lists '{path}' without an extension");
                continue;
            };
            let hash = name_hash(asset_name);
            if self.index.is_registered(hash) {
                return Err(self.violation(CacheError::DuplicateAssetName {
                    name: asset_name.to_string(),
                    package: name.to_string(),
                }));
            }
            hashes.push(hash);
        }

        for &hash in &hashes {
            self.index.register(hash, package);
        }
        Ok(hashes.len())
    }

    /// Removes the loading slots a failed batch had already created.
    fn discard_owned(&mut self, members: &[Member]) {
        for member in members.iter().filter(|member| member.role == Role::Owned) {
            if let Some(index) = self.table.find_if_exists(member.hash) {
                self.table.remove(index);
            }
        }
    }

    fn schedule_request<S>(
        scheduler: &mut S,
        request: RequestId,
        members: Vec<Member>,
        on_done: OnLoaded<L>,
    ) where
        S: Scheduler<Self> + ?Sized,
    {
        let mut on_done = Some(on_done);
        scheduler.schedule(Box::new(move |cache: &mut Self| {
            match cache.poll_request(request, &members) {
                Poll::Pending => StepStatus::Running,
                Poll::Ready(outcome) => {
                    if let Some(on_done) = on_done.take() {
                        on_done(cache, outcome);
                    }
                    StepStatus::Done
                }
            }
        }));
    }

    /// One cooperative step of a request: pending until a full pass over its
    /// members finds nothing left in flight, then completes every owned slot.
    fn poll_request(&mut self, request: RequestId, members: &[Member]) -> Poll<Result<(), CacheError>> {
        let pending = members
            .iter()
            .filter(|member| self.is_pending(request, member))
            .count();
        if pending > 0 {
            return Poll::Pending;
        }

        let mut outcome = Ok(());
        for member in members {
            let result = match member.role {
                Role::Owned => self.complete(request, member),
                Role::Awaited => self.check_awaited(member),
            };
            if let Err(e) = result {
                if outcome.is_ok() {
                    outcome = Err(e);
                }
            }
        }
        Poll::Ready(outcome)
    }

    fn is_pending(&self, request: RequestId, member: &Member) -> bool {
        let Some(entry) = self.table.get_by_hash(member.hash) else {
            return false;
        };
        match member.role {
            Role::Owned => entry
                .descriptor
                .as_ref()
                .is_some_and(|descriptor| descriptor.request == request && !descriptor.op.is_done()),
            Role::Awaited => entry.status == AssetStatus::Loading,
        }
    }

    fn cancelled(member: &Member) -> CacheError {
        log::warn!("CacheAgent: load of '{}' was cancelled", member.name);
        CacheError::LoadCancelled {
            name: member.name.clone(),
        }
    }

    fn check_awaited(&self, member: &Member) -> Result<(), CacheError> {
        match self.table.get_by_hash(member.hash) {
            Some(entry) if entry.status == AssetStatus::Loaded => Ok(()),
            Some(_) => Err(Self::cancelled(member)),
            None => match self.failures.get(&member.hash) {
                Some(reason) => Err(CacheError::LoadFailed {
                    name: member.name.clone(),
                    reason: reason.clone(),
                }),
                None => Err(Self::cancelled(member)),
            },
        }
    }

    /// Moves the finished operation's result into its slot.
    fn complete(&mut self, request: RequestId, member: &Member) -> Result<(), CacheError> {
        let Some(index) = self.table.find_if_exists(member.hash) else {
            return Err(Self::cancelled(member));
        };
        let descriptor = self.table.get_mut(index).and_then(|entry| {
            let ours = entry
                .descriptor
                .as_ref()
                .is_some_and(|descriptor| descriptor.request == request);
            if ours {
                entry.descriptor.take()
            } else {
                None
            }
        });
        let Some(descriptor) = descriptor else {
            return Err(Self::cancelled(member));
        };

        match descriptor.op {
            PendingOp::Asset(mut op) => match op.take_result() {
                Ok(asset) => {
                    if let Some(entry) = self.table.get_mut(index) {
                        entry.payload = Some(AssetHandle::new(asset));
                        entry.status = AssetStatus::Loaded;
                    }
                    log::debug!("CacheAgent: loaded asset '{}'", member.name);
                    Ok(())
                }
                Err(e) => {
                    log::error!("CacheAgent: loading '{}' failed: {e}", member.name);
                    self.failures.insert(member.hash, e.to_string());
                    self.table.remove(index);
                    Err(e.into())
                }
            },
            PendingOp::Package(mut op) => {
                let package = match op.take_result() {
                    Ok(package) => Arc::new(package),
                    Err(e) => {
                        log::error!("CacheAgent: opening '{}' failed: {e}", member.name);
                        self.table.remove(index);
                        return Err(e.into());
                    }
                };
                match self.index_package(&member.name, &package) {
                    Ok(indexed) => {
                        if let Some(entry) = self.table.get_mut(index) {
                            entry.package = Some(package);
                            entry.status = AssetStatus::Loaded;
                        }
                        log::info!(
                            "CacheAgent: loaded package '{}' ({indexed} assets)",
                            member.name
                        );
                        Ok(())
                    }
                    Err(e) => {
                        self.loader.unload_package(&package, true);
                        self.table.remove(index);
                        Err(e)
                    }
                }
            }
        }
    }
}
