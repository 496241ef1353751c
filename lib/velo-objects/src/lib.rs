// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

// Public trait API
mod registry;

// Public types
pub mod config;
mod device;
mod error;
mod id;
mod status;

// Per-host implementation
mod manager;

// Single-assignment values
pub mod placeholder;

// ── Re-exports ───────────────────────────────────────────────────────

pub use config::{ConfigError, DoubleResolvePolicy, RegistryConfig};
pub use device::Device;
pub use error::{AlreadyResolved, DeleteError, RegistryError};
pub use id::{HostId, RemoteObjectId};
pub use manager::RemoteObjectManager;
pub use placeholder::{Placeholder, PlaceholderAwaiter};
pub use registry::ObjectRegistry;
pub use status::{ObjectPoison, PlaceholderStatus};
