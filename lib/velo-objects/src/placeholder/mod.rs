// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Single-assignment placeholders for values that are not available yet.
//!
//! All per-placeholder state (resolution, registered wakers and pending
//! callbacks) lives under a single `parking_lot::Mutex`. Wakers and callbacks
//! are drained under the lock and invoked after it is released.

mod awaiter;
mod cell;
mod completion;

pub use awaiter::PlaceholderAwaiter;
pub use cell::Placeholder;
