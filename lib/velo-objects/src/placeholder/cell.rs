// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use parking_lot::Mutex as ParkingMutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll, Waker};

use super::awaiter::PlaceholderAwaiter;
use super::completion::Completion;
use crate::error::AlreadyResolved;
use crate::status::{ObjectPoison, PlaceholderStatus};

type Callback<T> = Box<dyn FnOnce(&Completion<T>) + Send>;

const CYCLE_REASON: &str = "placeholder forwarding cycle";

/// Shared handle to a single-assignment value.
///
/// A placeholder starts unresolved and is resolved at most once, either with
/// a value, with an [`ObjectPoison`], or by forwarding another placeholder
/// into it. Any number of holders may await it. Cloning produces a second
/// handle to the *same* placeholder; the placeholder lives as long as its
/// longest holder, independent of any registry entry.
pub struct Placeholder<T> {
    inner: Arc<PlaceholderInner<T>>,
}

pub(crate) struct PlaceholderInner<T> {
    state: ParkingMutex<PlaceholderState<T>>,
}

struct PlaceholderState<T> {
    resolution: Resolution<T>,
    wakers: Vec<Waker>,
    callbacks: Vec<Callback<T>>,
    /// Poisoned by its owning registry rather than by a producer.
    retired: bool,
}

enum Resolution<T> {
    Unresolved,
    /// Committed to a resolution that has not landed yet (a forwarded
    /// source still pending, or a resolve in progress). Counts as resolved
    /// for single-assignment purposes.
    Claimed,
    /// Claimed by `forward_to`; waiting on the placeholder it points at.
    Forwarding(Weak<PlaceholderInner<T>>),
    Resolved(Completion<T>),
}

impl<T> Placeholder<T> {
    /// Create an unresolved placeholder.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PlaceholderInner {
                state: ParkingMutex::new(PlaceholderState {
                    resolution: Resolution::Unresolved,
                    // Optimize for common case of 1-2 waiters
                    wakers: Vec::with_capacity(2),
                    callbacks: Vec::new(),
                    retired: false,
                }),
            }),
        }
    }

    /// Create a placeholder that is already resolved with `value`.
    pub fn resolved(value: T) -> Self {
        let placeholder = Self::new();
        placeholder.inner.state.lock().resolution =
            Resolution::Resolved(Completion::Value(Arc::new(value)));
        placeholder
    }

    /// Non-blocking status check. A forwarded placeholder is `Pending` until
    /// its source resolves.
    pub fn status(&self) -> PlaceholderStatus {
        match &self.inner.state.lock().resolution {
            Resolution::Unresolved | Resolution::Claimed | Resolution::Forwarding(_) => {
                PlaceholderStatus::Pending
            }
            Resolution::Resolved(Completion::Value(_)) => PlaceholderStatus::Ready,
            Resolution::Resolved(Completion::Poisoned(_)) => PlaceholderStatus::Poisoned,
        }
    }

    /// Returns `true` once a value or poison is available.
    pub fn is_resolved(&self) -> bool {
        self.status() != PlaceholderStatus::Pending
    }

    /// Returns the resolution if one is available.
    pub fn try_get(&self) -> Option<Result<Arc<T>, ObjectPoison>> {
        match &self.inner.state.lock().resolution {
            Resolution::Resolved(completion) => Some(completion.as_result()),
            _ => None,
        }
    }

    /// Resolve with `value`, waking every waiter.
    pub fn resolve(&self, value: T) -> Result<(), AlreadyResolved> {
        self.resolve_shared(Arc::new(value))
    }

    /// Resolve with a value that is already shared.
    pub fn resolve_shared(&self, value: Arc<T>) -> Result<(), AlreadyResolved> {
        self.complete(Completion::Value(value))
    }

    /// Resolve with an error value, waking every waiter.
    pub fn poison(&self, reason: impl Into<Arc<str>>) -> Result<(), AlreadyResolved> {
        self.complete(Completion::Poisoned(ObjectPoison::new(reason)))
    }

    /// Create a future that resolves with this placeholder's value.
    pub fn awaiter(&self) -> PlaceholderAwaiter<T> {
        PlaceholderAwaiter::new(Arc::clone(&self.inner))
    }

    /// Returns `true` when both handles refer to the same placeholder.
    pub fn ptr_eq(&self, other: &Placeholder<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Poison only if nothing has claimed the placeholder yet.
    ///
    /// Forwarded placeholders are left alone; their source still delivers.
    /// The placeholder is marked as retired, see [`Placeholder::is_retired`].
    pub(crate) fn poison_if_unresolved(&self, reason: impl Into<Arc<str>>) -> bool {
        {
            let mut state = self.inner.state.lock();
            if !matches!(state.resolution, Resolution::Unresolved) {
                return false;
            }
            state.resolution = Resolution::Claimed;
            state.retired = true;
        }
        self.inner.finish(Completion::Poisoned(ObjectPoison::new(reason)));
        true
    }

    /// Returns `true` if the owning registry poisoned this placeholder on
    /// delete or shutdown.
    pub(crate) fn is_retired(&self) -> bool {
        self.inner.state.lock().retired
    }

    fn complete(&self, completion: Completion<T>) -> Result<(), AlreadyResolved> {
        self.inner.claim(Resolution::Claimed)?;
        self.inner.finish(completion);
        Ok(())
    }
}

impl<T: Send + Sync + 'static> Placeholder<T> {
    /// Resolve this placeholder with whatever `source` resolves to.
    ///
    /// This placeholder is claimed immediately: later `resolve`, `poison` or
    /// `forward_to` calls fail even while `source` is still pending.
    ///
    /// A forward that would close a cycle (`a -> b -> a`, or a placeholder
    /// forwarded to itself) poisons this placeholder, and with it every
    /// placeholder in the cycle.
    pub fn forward_to(&self, source: &Placeholder<T>) -> Result<(), AlreadyResolved> {
        self.inner
            .claim(Resolution::Forwarding(Arc::downgrade(&source.inner)))?;

        if source.inner.forwards_into(&self.inner) {
            self.inner
                .finish(Completion::Poisoned(ObjectPoison::new(CYCLE_REASON)));
            return Ok(());
        }

        let target = Arc::clone(&self.inner);
        source.and_then(move |result| target.finish(Completion::from_result(result)));
        Ok(())
    }

    /// Run `callback` once this placeholder resolves; immediately on the
    /// calling thread if it already has.
    pub fn and_then<F>(&self, callback: F)
    where
        F: FnOnce(Result<Arc<T>, ObjectPoison>) + Send + 'static,
    {
        let ready = {
            let mut state = self.inner.state.lock();
            match &state.resolution {
                Resolution::Resolved(completion) => Some(completion.clone()),
                _ => {
                    state
                        .callbacks
                        .push(Box::new(move |completion| callback(completion.as_result())));
                    return;
                }
            }
        };

        if let Some(completion) = ready {
            callback(completion.as_result());
        }
    }
}

impl<T> PlaceholderInner<T> {
    /// Move out of `Unresolved` into `next`.
    fn claim(&self, next: Resolution<T>) -> Result<(), AlreadyResolved> {
        let mut state = self.state.lock();
        if !matches!(state.resolution, Resolution::Unresolved) {
            return Err(AlreadyResolved);
        }
        state.resolution = next;
        Ok(())
    }

    /// Follow the chain of pending forwards starting here, one lock at a
    /// time, and report whether it reaches `target`.
    fn forwards_into(self: &Arc<Self>, target: &Arc<Self>) -> bool {
        let mut node = Arc::clone(self);
        loop {
            if Arc::ptr_eq(&node, target) {
                return true;
            }
            let next = match &node.state.lock().resolution {
                Resolution::Forwarding(next) => next.upgrade(),
                _ => None,
            };
            match next {
                Some(next) => node = next,
                None => return false,
            }
        }
    }

    /// Store the completion and notify waiters outside the lock.
    ///
    /// Callers must have moved the state out of `Unresolved` first.
    fn finish(&self, completion: Completion<T>) {
        let (wakers, callbacks) = {
            let mut state = self.state.lock();
            debug_assert!(matches!(
                state.resolution,
                Resolution::Claimed | Resolution::Forwarding(_)
            ));
            state.resolution = Resolution::Resolved(completion.clone());
            (
                std::mem::take(&mut state.wakers),
                std::mem::take(&mut state.callbacks),
            )
        };

        for waker in wakers {
            waker.wake();
        }
        for callback in callbacks {
            callback(&completion);
        }
    }

    pub(crate) fn poll_resolution(
        &self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Arc<T>, ObjectPoison>> {
        let mut state = self.state.lock();
        if let Resolution::Resolved(completion) = &state.resolution {
            return Poll::Ready(completion.as_result());
        }

        // Register waker with deduplication
        let waker = cx.waker();
        if let Some(existing) = state.wakers.iter_mut().find(|w| w.will_wake(waker)) {
            existing.clone_from(waker);
        } else {
            state.wakers.push(waker.clone());
        }

        Poll::Pending
    }
}

impl<T> Default for Placeholder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Placeholder<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Placeholder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Placeholder")
            .field("status", &self.status())
            .finish()
    }
}
