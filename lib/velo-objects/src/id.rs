// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Globally meaningful identifiers for remote objects.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::hash::{Hash, Hasher};

use crate::device::Device;

/// Identity of the host that allocated a remote object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(u64);

impl HostId {
    /// Wrap a raw host identifier.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw identifier.
    pub const fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for HostId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl Display for HostId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Names a value that may not exist yet, possibly on another host.
///
/// Layout: `(host_id, local_id, device)`. Only `host_id` and `local_id`
/// take part in equality and hashing; the device is locality metadata and
/// two ids that differ only in device refer to the same registry entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteObjectId {
    host_id: HostId,
    local_id: u64,
    device: Device,
}

impl RemoteObjectId {
    /// Build an id from its parts.
    ///
    /// Managers allocate ids themselves; this constructor exists for ids
    /// received from peers and for tests.
    pub fn new(host_id: HostId, local_id: u64, device: Device) -> Self {
        Self {
            host_id,
            local_id,
            device,
        }
    }

    /// The allocating host.
    pub fn host_id(&self) -> HostId {
        self.host_id
    }

    /// The host-scoped counter value.
    pub fn local_id(&self) -> u64 {
        self.local_id
    }

    /// The device tag copied from the allocation request.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl PartialEq for RemoteObjectId {
    fn eq(&self, other: &Self) -> bool {
        self.host_id == other.host_id && self.local_id == other.local_id
    }
}

impl Eq for RemoteObjectId {}

impl Hash for RemoteObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.host_id.hash(state);
        self.local_id.hash(state);
    }
}

impl Display for RemoteObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RemoteObjectId(host={}, local={}, device={})",
            self.host_id, self.local_id, self.device
        )
    }
}
