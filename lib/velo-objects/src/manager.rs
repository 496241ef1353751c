// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, trace, warn};

use crate::config::{DoubleResolvePolicy, RegistryConfig, SHARD_BITS_RANGE};
use crate::device::Device;
use crate::error::{AlreadyResolved, DeleteError, RegistryError};
use crate::id::{HostId, RemoteObjectId};
use crate::placeholder::Placeholder;
use crate::registry::ObjectRegistry;

const SHUTDOWN_REASON: &str = "remote object manager shut down";

/// Per-host registry of remote object placeholders.
///
/// Ids come from a lock-free counter. The id → placeholder map is sharded
/// by id; every lookup, insert and erase for one id happens under that id's
/// shard lock, and no resolution work runs while it is held.
pub struct RemoteObjectManager<T> {
    host_id: HostId,
    next_local_id: AtomicU64,
    objects: DashMap<RemoteObjectId, Placeholder<T>>,
    config: RegistryConfig,
}

impl<T: Send + Sync + 'static> RemoteObjectManager<T> {
    /// Create a manager for `host_id` with the default configuration.
    pub fn new(host_id: impl Into<HostId>) -> Self {
        Self::with_config(host_id, RegistryConfig::default())
    }

    /// Create a manager for `host_id`.
    ///
    /// An out-of-range `shard_bits` is logged and replaced by the map's
    /// default shard count.
    pub fn with_config(host_id: impl Into<HostId>, config: RegistryConfig) -> Self {
        let objects = match config.shard_amount() {
            Some(shards) => DashMap::with_shard_amount(shards),
            None => {
                if let Some(bits) = config.shard_bits {
                    warn!(
                        shard_bits = bits,
                        "shard_bits outside {:?}; using default shard count", SHARD_BITS_RANGE
                    );
                }
                DashMap::new()
            }
        };
        Self {
            host_id: host_id.into(),
            next_local_id: AtomicU64::new(0),
            objects,
            config,
        }
    }

    /// The host stamped into every id this manager allocates.
    pub fn host_id(&self) -> HostId {
        self.host_id
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` when no entries are registered.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns `true` if `id` currently has an entry.
    pub fn contains(&self, id: &RemoteObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Allocate a fresh id on this host for a value that will live on
    /// `device`. No entry is created until the id is looked up or set.
    pub fn allocate_remote_object(&self, device: Device) -> RemoteObjectId {
        let local_id = self.next_local_id.fetch_add(1, Ordering::Relaxed);
        trace!(host = %self.host_id, local_id, device = %device, "allocated remote object id");
        RemoteObjectId::new(self.host_id, local_id, device)
    }

    /// Return the placeholder for `id`, creating an unresolved one if the id
    /// has no entry yet.
    ///
    /// Concurrent callers with the same id always receive the same
    /// placeholder. Works for ids allocated elsewhere and regardless of
    /// whether the producer has touched the registry yet.
    pub fn get_remote_object(&self, id: &RemoteObjectId) -> Placeholder<T> {
        let (placeholder, created) = match self.objects.entry(id.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => (entry.insert(Placeholder::new()).value().clone(), true),
        };
        if created {
            trace!(id = %id, "registered remote object placeholder");
        }
        placeholder
    }

    /// Resolve `id` with `value`, creating the entry if needed.
    ///
    /// Every handle obtained for `id`, before or after this call, observes
    /// `value`. A second resolution never replaces the first; it is handled
    /// according to [`DoubleResolvePolicy`].
    pub fn set_remote_object(&self, id: &RemoteObjectId, value: T) -> Result<(), RegistryError> {
        let placeholder = self.get_remote_object(id);
        self.resolve_placeholder(id, &placeholder, value)
    }

    fn resolve_placeholder(
        &self,
        id: &RemoteObjectId,
        placeholder: &Placeholder<T>,
        value: T,
    ) -> Result<(), RegistryError> {
        match placeholder.resolve(value) {
            Ok(()) => {
                debug!(id = %id, "resolved remote object");
                Ok(())
            }
            Err(AlreadyResolved) => self.resolution_rejected(id, placeholder),
        }
    }

    /// Resolve `id` with whatever `source` resolves to, creating the entry
    /// if needed. The id counts as resolved immediately.
    pub fn forward_remote_object(
        &self,
        id: &RemoteObjectId,
        source: &Placeholder<T>,
    ) -> Result<(), RegistryError> {
        let placeholder = self.get_remote_object(id);
        match placeholder.forward_to(source) {
            Ok(()) => {
                debug!(id = %id, "forwarded remote object");
                Ok(())
            }
            Err(AlreadyResolved) => self.resolution_rejected(id, &placeholder),
        }
    }

    /// Delete the entries for `ids`.
    ///
    /// Every id is processed; ids without an entry (including repeats of
    /// an id already deleted earlier in the same batch) are collected into
    /// a single [`DeleteError`]. Entries may be deleted whether or not they
    /// are resolved. Handles already handed out stay valid; with
    /// `poison_on_delete` set, unresolved ones are poisoned so their
    /// awaiters wake.
    pub fn delete_remote_objects(&self, ids: &[RemoteObjectId]) -> Result<(), DeleteError> {
        let mut errors = Vec::new();
        let mut removed = Vec::with_capacity(ids.len());

        for id in ids {
            match self.objects.remove(id) {
                Some((_, placeholder)) => removed.push((id, placeholder)),
                None => errors.push(RegistryError::NotFound(id.clone())),
            }
        }

        if self.config.poison_on_delete {
            for (id, placeholder) in &removed {
                let reason = format!("remote object {} deleted before it was resolved", id);
                if placeholder.poison_if_unresolved(reason) {
                    trace!(id = %id, "poisoned unresolved remote object on delete");
                }
            }
        }

        debug!(
            requested = ids.len(),
            deleted = removed.len(),
            missing = errors.len(),
            "deleted remote objects"
        );

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DeleteError::new(ids.len(), errors))
        }
    }

    fn resolution_rejected(
        &self,
        id: &RemoteObjectId,
        placeholder: &Placeholder<T>,
    ) -> Result<(), RegistryError> {
        // A concurrent delete poisoned the handle between lookup and resolve.
        if placeholder.is_retired() {
            warn!(id = %id, "remote object deleted before it was resolved");
            return Err(RegistryError::Deleted(id.clone()));
        }
        let err = RegistryError::AlreadyResolved(id.clone());
        error!(id = %id, "remote object resolved more than once");
        match self.config.double_resolve {
            DoubleResolvePolicy::Error => Err(err),
            DoubleResolvePolicy::Panic => panic!("{}", err),
        }
    }
}

impl<T: Send + Sync + 'static> ObjectRegistry for RemoteObjectManager<T> {
    type Value = T;

    fn allocate_remote_object(&self, device: Device) -> RemoteObjectId {
        RemoteObjectManager::allocate_remote_object(self, device)
    }

    fn get_remote_object(&self, id: &RemoteObjectId) -> Placeholder<T> {
        RemoteObjectManager::get_remote_object(self, id)
    }

    fn set_remote_object(&self, id: &RemoteObjectId, value: T) -> Result<(), RegistryError> {
        RemoteObjectManager::set_remote_object(self, id, value)
    }

    fn forward_remote_object(
        &self,
        id: &RemoteObjectId,
        source: &Placeholder<T>,
    ) -> Result<(), RegistryError> {
        RemoteObjectManager::forward_remote_object(self, id, source)
    }

    fn delete_remote_objects(&self, ids: &[RemoteObjectId]) -> Result<(), DeleteError> {
        RemoteObjectManager::delete_remote_objects(self, ids)
    }
}

impl<T> Drop for RemoteObjectManager<T> {
    fn drop(&mut self) {
        let mut poisoned = 0usize;
        for (_, placeholder) in std::mem::take(&mut self.objects) {
            if placeholder.poison_if_unresolved(SHUTDOWN_REASON) {
                poisoned += 1;
            }
        }
        if poisoned > 0 {
            debug!(host = %self.host_id, poisoned, "poisoned pending remote objects on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::PlaceholderStatus;

    fn manager() -> RemoteObjectManager<u64> {
        RemoteObjectManager::new(HostId::new(1))
    }

    fn cpu() -> Device {
        Device::new("cpu:0")
    }

    #[test]
    fn allocation_creates_no_entry() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());
        assert_eq!(id.host_id(), HostId::new(1));
        assert_eq!(id.local_id(), 0);
        assert_eq!(id.device(), &cpu());
        assert!(manager.is_empty());
        assert!(!manager.contains(&id));
    }

    #[test]
    fn get_registers_once() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());

        let first = manager.get_remote_object(&id);
        let second = manager.get_remote_object(&id);
        assert!(first.ptr_eq(&second));
        assert_eq!(manager.len(), 1);
        assert!(manager.contains(&id));
    }

    #[test]
    fn lookup_ignores_device() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());
        let same = RemoteObjectId::new(id.host_id(), id.local_id(), Device::new("gpu:0"));

        let first = manager.get_remote_object(&id);
        let second = manager.get_remote_object(&same);
        assert!(first.ptr_eq(&second));
    }

    #[test]
    fn double_set_returns_error_and_keeps_first() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());

        manager.set_remote_object(&id, 1).unwrap();
        let err = manager.set_remote_object(&id, 2).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyResolved(id.clone()));

        let value = manager.get_remote_object(&id).try_get().unwrap().unwrap();
        assert_eq!(*value, 1);
    }

    #[test]
    #[should_panic(expected = "already resolved")]
    fn double_set_panics_under_panic_policy() {
        let config = RegistryConfig {
            double_resolve: DoubleResolvePolicy::Panic,
            ..Default::default()
        };
        let manager = RemoteObjectManager::<u64>::with_config(HostId::new(1), config);
        let id = manager.allocate_remote_object(cpu());

        manager.set_remote_object(&id, 1).unwrap();
        let _ = manager.set_remote_object(&id, 2);
    }

    #[test]
    fn set_after_racing_delete_reports_deleted() {
        let config = RegistryConfig {
            double_resolve: DoubleResolvePolicy::Panic,
            ..Default::default()
        };
        let manager = RemoteObjectManager::<u64>::with_config(HostId::new(1), config);
        let id = manager.allocate_remote_object(cpu());

        // Interleaving: the setter has looked up the handle, then the delete
        // lands before it resolves.
        let handle = manager.get_remote_object(&id);
        manager.delete_remote_objects(std::slice::from_ref(&id)).unwrap();

        let err = manager.resolve_placeholder(&id, &handle, 3).unwrap_err();
        assert_eq!(err, RegistryError::Deleted(id.clone()));
        assert!(handle.try_get().unwrap().is_err());
    }

    #[test]
    fn forward_after_racing_delete_reports_deleted() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());
        let handle = manager.get_remote_object(&id);
        manager.delete_remote_objects(std::slice::from_ref(&id)).unwrap();

        let source = Placeholder::new();
        let err = handle.forward_to(&source).unwrap_err();
        assert_eq!(err, AlreadyResolved);
        assert_eq!(
            manager.resolution_rejected(&id, &handle),
            Err(RegistryError::Deleted(id.clone()))
        );
    }

    #[test]
    fn producer_poison_still_counts_as_resolved() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());
        manager.get_remote_object(&id).poison("producer failed").unwrap();

        assert_eq!(
            manager.set_remote_object(&id, 1).unwrap_err(),
            RegistryError::AlreadyResolved(id.clone())
        );
    }

    #[rstest::rstest]
    #[case::zero(0)]
    #[case::too_many(17)]
    #[case::overflowing_shift(64)]
    #[case::max(u32::MAX)]
    fn out_of_range_shard_bits_fall_back_to_default(#[case] bits: u32) {
        let config = RegistryConfig {
            shard_bits: Some(bits),
            ..Default::default()
        };
        let manager = RemoteObjectManager::<u64>::with_config(HostId::new(1), config);
        let id = manager.allocate_remote_object(cpu());

        let first = manager.get_remote_object(&id);
        assert!(first.ptr_eq(&manager.get_remote_object(&id)));
        manager.set_remote_object(&id, 2).unwrap();
        assert_eq!(*first.try_get().unwrap().unwrap(), 2);
    }

    #[test]
    fn delete_unresolved_poisons_handles() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());
        let handle = manager.get_remote_object(&id);

        manager.delete_remote_objects(std::slice::from_ref(&id)).unwrap();
        assert!(manager.is_empty());
        let poison = handle.try_get().unwrap().unwrap_err();
        assert!(poison.reason().contains("deleted before it was resolved"));
    }

    #[test]
    fn delete_without_poison_leaves_handles_pending() {
        let config = RegistryConfig {
            poison_on_delete: false,
            ..Default::default()
        };
        let manager = RemoteObjectManager::<u64>::with_config(HostId::new(1), config);
        let id = manager.allocate_remote_object(cpu());
        let handle = manager.get_remote_object(&id);

        manager.delete_remote_objects(std::slice::from_ref(&id)).unwrap();
        assert_eq!(handle.status(), PlaceholderStatus::Pending);

        // The detached handle can still be resolved by whoever holds it.
        handle.resolve(5).unwrap();
        assert_eq!(*handle.try_get().unwrap().unwrap(), 5);
    }

    #[test]
    fn delete_keeps_resolved_values_in_outstanding_handles() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());
        let handle = manager.get_remote_object(&id);
        manager.set_remote_object(&id, 11).unwrap();

        manager.delete_remote_objects(std::slice::from_ref(&id)).unwrap();
        assert_eq!(*handle.try_get().unwrap().unwrap(), 11);
    }

    #[test]
    fn duplicate_ids_in_one_batch() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());
        manager.get_remote_object(&id);

        let err = manager
            .delete_remote_objects(&[id.clone(), id.clone()])
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err.requested(), 2);
        assert_eq!(err.errors(), &[RegistryError::NotFound(id)]);
    }

    #[test]
    fn forward_claims_the_id() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());
        let source = Placeholder::new();

        manager.forward_remote_object(&id, &source).unwrap();
        assert_eq!(
            manager.set_remote_object(&id, 3).unwrap_err(),
            RegistryError::AlreadyResolved(id.clone())
        );

        source.resolve(8).unwrap();
        let value = manager.get_remote_object(&id).try_get().unwrap().unwrap();
        assert_eq!(*value, 8);
    }

    #[test]
    fn forward_not_poisoned_by_delete() {
        let manager = manager();
        let id = manager.allocate_remote_object(cpu());
        let handle = manager.get_remote_object(&id);
        let source = Placeholder::new();

        manager.forward_remote_object(&id, &source).unwrap();
        manager.delete_remote_objects(std::slice::from_ref(&id)).unwrap();
        source.resolve(21).unwrap();
        assert_eq!(*handle.try_get().unwrap().unwrap(), 21);
    }

    #[test]
    fn drop_poisons_pending_and_keeps_resolved() {
        let manager = manager();
        let pending_id = manager.allocate_remote_object(cpu());
        let ready_id = manager.allocate_remote_object(cpu());
        let pending = manager.get_remote_object(&pending_id);
        let ready = manager.get_remote_object(&ready_id);
        manager.set_remote_object(&ready_id, 4).unwrap();

        drop(manager);

        let poison = pending.try_get().unwrap().unwrap_err();
        assert_eq!(poison.reason(), SHUTDOWN_REASON);
        assert_eq!(*ready.try_get().unwrap().unwrap(), 4);
    }

    #[test]
    fn sharded_manager_keeps_one_entry_per_id() {
        let config = RegistryConfig {
            shard_bits: Some(3),
            ..Default::default()
        };
        let manager = RemoteObjectManager::<u64>::with_config(HostId::new(1), config);
        let ids: Vec<_> = (0..64).map(|_| manager.allocate_remote_object(cpu())).collect();

        for id in &ids {
            let first = manager.get_remote_object(id);
            assert!(first.ptr_eq(&manager.get_remote_object(id)));
        }
        assert_eq!(manager.len(), ids.len());

        manager.delete_remote_objects(&ids).unwrap();
        assert!(manager.is_empty());
    }
}
