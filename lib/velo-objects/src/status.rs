// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Placeholder status types.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Status returned from non-blocking placeholder queries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PlaceholderStatus {
    Pending,
    Ready,
    Poisoned,
}

/// Error value a placeholder resolved to instead of a concrete value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectPoison {
    reason: Arc<str>,
}

impl ObjectPoison {
    /// Create a poison with the given reason.
    pub fn new(reason: impl Into<Arc<str>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Get the reason of the poison.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Get the reason as an `Arc<str>`.
    pub fn reason_arc(&self) -> &Arc<str> {
        &self.reason
    }
}

impl Display for ObjectPoison {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "remote object poisoned: {}", self.reason())
    }
}

impl std::error::Error for ObjectPoison {}
