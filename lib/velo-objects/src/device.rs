// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Opaque locality tag attached to a remote object at allocation time.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Names the device a remote object will live on.
///
/// The registry never interprets the name; it is copied into every
/// [`RemoteObjectId`](crate::RemoteObjectId) allocated for it and shipped
/// alongside the id. Cloning is a reference-count bump.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Device {
    name: Arc<str>,
}

impl Device {
    /// Create a device tag from its name.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    /// The device name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Display for Device {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_serializes_as_plain_string() {
        let device = Device::new("/job:worker/task:0/device:CPU:0");
        let json = serde_json::to_string(&device).unwrap();
        assert_eq!(json, "\"/job:worker/task:0/device:CPU:0\"");

        let back: Device = serde_json::from_str(&json).unwrap();
        assert_eq!(back, device);
        assert_eq!(back.name(), "/job:worker/task:0/device:CPU:0");
    }
}
