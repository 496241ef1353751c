// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use crate::status::ObjectPoison;

pub(crate) enum Completion<T> {
    Value(Arc<T>),
    Poisoned(ObjectPoison),
}

impl<T> Completion<T> {
    pub(crate) fn as_result(&self) -> Result<Arc<T>, ObjectPoison> {
        match self {
            Self::Value(value) => Ok(Arc::clone(value)),
            Self::Poisoned(poison) => Err(poison.clone()),
        }
    }

    pub(crate) fn from_result(result: Result<Arc<T>, ObjectPoison>) -> Self {
        match result {
            Ok(value) => Self::Value(value),
            Err(poison) => Self::Poisoned(poison),
        }
    }
}

// Manual impl: cloning only bumps the `Arc`, so `T` need not be `Clone`.
impl<T> Clone for Completion<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Value(value) => Self::Value(Arc::clone(value)),
            Self::Poisoned(poison) => Self::Poisoned(poison.clone()),
        }
    }
}
