// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The [`ObjectRegistry`] trait for allocating, resolving and deleting
//! remote objects.

use crate::device::Device;
use crate::error::{DeleteError, RegistryError};
use crate::id::RemoteObjectId;
use crate::placeholder::Placeholder;

/// Maps remote object ids to placeholders for one host.
///
/// Implementations are expected to be `Send + Sync` so they can be shared
/// across worker threads. The instruction-execution layer allocates and
/// resolves ids, the transport layer ships ids between hosts and looks them
/// up on arrival, and cleanup logic batches ids for deletion.
pub trait ObjectRegistry: Send + Sync {
    /// The value type placeholders resolve to.
    type Value: Send + Sync + 'static;

    /// Allocate a fresh id for a value that will live on `device`.
    ///
    /// Never creates a registry entry.
    fn allocate_remote_object(&self, device: Device) -> RemoteObjectId;

    /// Get-or-create the placeholder for `id`.
    fn get_remote_object(&self, id: &RemoteObjectId) -> Placeholder<Self::Value>;

    /// Resolve `id` with `value`. Fails if `id` was already resolved.
    fn set_remote_object(&self, id: &RemoteObjectId, value: Self::Value)
    -> Result<(), RegistryError>;

    /// Resolve `id` with whatever `source` resolves to.
    fn forward_remote_object(
        &self,
        id: &RemoteObjectId,
        source: &Placeholder<Self::Value>,
    ) -> Result<(), RegistryError>;

    /// Delete every id in `ids`, reporting the ones that were not found.
    fn delete_remote_objects(&self, ids: &[RemoteObjectId]) -> Result<(), DeleteError>;
}
