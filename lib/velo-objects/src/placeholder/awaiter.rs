// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use super::cell::PlaceholderInner;
use crate::status::ObjectPoison;

/// Future that waits for a placeholder to resolve.
///
/// This can be used in `tokio::select!` and polled multiple times efficiently.
/// Waker deduplication inside the placeholder lock prevents unbounded growth.
pub struct PlaceholderAwaiter<T> {
    inner: Arc<PlaceholderInner<T>>,
}

impl<T> PlaceholderAwaiter<T> {
    pub(crate) fn new(inner: Arc<PlaceholderInner<T>>) -> Self {
        Self { inner }
    }
}

impl<T> Future for PlaceholderAwaiter<T> {
    type Output = Result<Arc<T>, ObjectPoison>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.get_mut().inner.poll_resolution(cx)
    }
}
