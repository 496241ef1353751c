// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Registry error types.
//!
//! - [`AlreadyResolved`]: a placeholder was resolved twice.
//! - [`RegistryError`]: per-id failures reported by the manager.
//! - [`DeleteError`]: every id a bulk delete could not find, in input order.

use thiserror::Error;

use crate::id::RemoteObjectId;

/// Returned when a placeholder that already holds (or was already promised)
/// a value is resolved again. The first resolution always wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("placeholder is already resolved")]
pub struct AlreadyResolved;

/// Per-id failure reported by the manager.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Invalid state: the id was resolved a second time.
    #[error("Remote object {0} is already resolved")]
    AlreadyResolved(RemoteObjectId),

    /// Invalid argument: the id has no registry entry.
    #[error("Could not find object: {0}")]
    NotFound(RemoteObjectId),

    /// The id's entry was deleted, and its placeholder poisoned, before this
    /// resolution reached it.
    #[error("Remote object {0} was deleted before it was resolved")]
    Deleted(RemoteObjectId),
}

impl RegistryError {
    /// The id this error is about.
    pub fn id(&self) -> &RemoteObjectId {
        match self {
            Self::AlreadyResolved(id) | Self::NotFound(id) | Self::Deleted(id) => id,
        }
    }
}

/// Aggregate result of a bulk delete with one or more missing ids.
///
/// Entries that were found are deleted regardless; this only reports the
/// ones that were not, so callers can decide whether each miss is benign
/// (for example a duplicate cleanup message from a peer).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error(
    "Failed to delete {} of {requested} remote objects:{}",
    .errors.len(),
    list_errors(.errors)
)]
pub struct DeleteError {
    requested: usize,
    errors: Vec<RegistryError>,
}

impl DeleteError {
    pub(crate) fn new(requested: usize, errors: Vec<RegistryError>) -> Self {
        debug_assert!(!errors.is_empty());
        Self { requested, errors }
    }

    /// Individual failures in input order.
    pub fn errors(&self) -> &[RegistryError] {
        &self.errors
    }

    /// Ids that could not be found, in input order.
    pub fn missing_ids(&self) -> impl Iterator<Item = &RemoteObjectId> {
        self.errors.iter().map(RegistryError::id)
    }

    /// Number of failed ids.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always `false`; a delete with no failures returns `Ok`.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of ids in the original request.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Consume the aggregate, returning the individual failures.
    pub fn into_errors(self) -> Vec<RegistryError> {
        self.errors
    }
}

fn list_errors(errors: &[RegistryError]) -> String {
    errors.iter().map(|error| format!("\n  {error}")).collect()
}
