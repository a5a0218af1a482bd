// SPDX-License-Identifier: MPL-2.0
//! Last-requested-wins bookkeeping for asynchronous image loads.
//!
//! Loads are never awaited: a cine tick or a navigation action issues a
//! request and moves on. When a completion event arrives, only the most
//! recently requested load for that surface may be displayed; anything
//! older has been superseded and is dropped without effect. There is no
//! queue of pending loads.

use super::{ImageId, LoadToken, RenderingEngine, SurfaceId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Issues load tokens and answers whether a completion is still current.
pub struct FrameDispatcher {
    engine: Rc<dyn RenderingEngine>,
    next_token: Cell<u64>,
    latest: RefCell<HashMap<SurfaceId, LoadToken>>,
}

impl FrameDispatcher {
    #[must_use]
    pub fn new(engine: Rc<dyn RenderingEngine>) -> Self {
        Self {
            engine,
            next_token: Cell::new(0),
            latest: RefCell::new(HashMap::new()),
        }
    }

    /// Starts a load of `image_id` for `surface` and records it as the
    /// surface's newest request.
    pub fn request(&self, surface: SurfaceId, image_id: &ImageId) -> LoadToken {
        let token = LoadToken(self.next_token.get());
        self.next_token.set(self.next_token.get() + 1);
        self.latest.borrow_mut().insert(surface, token);
        self.engine.begin_image_load(surface, image_id, token);
        token
    }

    /// Returns whether `token` is still the newest request for `surface`.
    #[must_use]
    pub fn is_current(&self, surface: SurfaceId, token: LoadToken) -> bool {
        self.latest.borrow().get(&surface) == Some(&token)
    }

    /// Drops the bookkeeping for one surface (panel teardown).
    pub fn forget(&self, surface: SurfaceId) {
        self.latest.borrow_mut().remove(&surface);
    }

    /// Drops all bookkeeping (layout teardown).
    pub fn forget_all(&self) {
        self.latest.borrow_mut().clear();
    }
}

impl std::fmt::Debug for FrameDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameDispatcher")
            .field("next_token", &self.next_token.get())
            .field("latest", &self.latest.borrow())
            .finish_non_exhaustive()
    }
}
