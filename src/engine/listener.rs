// SPDX-License-Identifier: MPL-2.0
//! Scoped engine event subscriptions.
//!
//! Every listener attached to a rendering surface must be detached when
//! the surface's panel is torn down, in the reverse order of attachment.
//! [`ListenerRegistration`] pairs one attach with its guaranteed detach,
//! and [`ListenerStack`] releases a whole panel set symmetrically.
//! An undetached listener is a correctness defect caught by the mock
//! engine's bookkeeping in tests, not a runtime error.

use super::{RenderingEngine, SurfaceId};
use std::fmt;
use std::rc::Rc;

/// Opaque identifier for one attached event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// One attached listener, detached exactly once when dropped.
pub struct ListenerRegistration {
    engine: Rc<dyn RenderingEngine>,
    handle: Option<ListenerHandle>,
}

impl ListenerRegistration {
    /// Subscribes to `surface`'s events and wraps the handle so the
    /// matching unsubscribe cannot be forgotten.
    #[must_use]
    pub fn attach(engine: Rc<dyn RenderingEngine>, surface: SurfaceId) -> Self {
        let handle = engine.subscribe(surface);
        Self {
            engine,
            handle: Some(handle),
        }
    }

    /// Returns the underlying handle.
    #[must_use]
    pub fn handle(&self) -> Option<ListenerHandle> {
        self.handle
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.engine.unsubscribe(handle);
        }
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}

/// All listeners attached for the current panel set.
///
/// Releasing pops registrations from the end, so detachment happens in
/// the reverse order of attachment.
#[derive(Debug, Default)]
pub struct ListenerStack {
    registrations: Vec<ListenerRegistration>,
}

impl ListenerStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one attached listener.
    pub fn push(&mut self, registration: ListenerRegistration) {
        self.registrations.push(registration);
    }

    /// Number of currently held registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Detaches every held listener, newest first.
    pub fn release_all(&mut self) {
        while let Some(registration) = self.registrations.pop() {
            drop(registration);
        }
    }
}

impl Drop for ListenerStack {
    fn drop(&mut self) {
        self.release_all();
    }
}
