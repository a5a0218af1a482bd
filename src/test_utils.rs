// SPDX-License-Identifier: MPL-2.0
//! Test utilities shared across the crate's unit tests: float comparison
//! macros, a recording mock of the rendering engine port, and a manual
//! scheduler that replaces wall-clock timers with explicit firing.

// Re-export approx macros for convenient use in tests
#[allow(unused_imports)]
pub use approx::{assert_abs_diff_eq, assert_relative_eq};

use crate::engine::{
    CapturedFrame, EngineImage, FrameMetadata, ImageId, ListenerHandle, LoadToken,
    RenderingEngine, SurfaceId,
};
use crate::error::{Error, Result};
use crate::measurements::MeasurementRecord;
use crate::scheduler::{Scheduler, TimerHandle};
use crate::tools::{ToolActivation, ToolId, ToolKind, ToolMode};
use crate::viewport::ViewportTransform;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Recording implementation of the [`RenderingEngine`] port.
///
/// Every call is logged so tests can assert on the exact engine traffic;
/// configurable failure points cover the engine-init error paths.
#[derive(Default)]
pub struct MockEngine {
    init_failure: RefCell<Option<String>>,
    enable_failure: RefCell<Option<String>>,
    initialized: Cell<bool>,
    enabled: RefCell<Vec<SurfaceId>>,
    disabled: RefCell<Vec<SurfaceId>>,
    loads: RefCell<Vec<(SurfaceId, ImageId, LoadToken)>>,
    displayed: RefCell<Vec<(SurfaceId, ImageId)>>,
    viewports: RefCell<HashMap<SurfaceId, ViewportTransform>>,
    set_viewport_calls: Cell<usize>,
    update_image_calls: Cell<usize>,
    resized: RefCell<Vec<SurfaceId>>,
    added_tools: RefCell<Vec<ToolId>>,
    tool_modes: RefCell<HashMap<ToolId, ToolMode>>,
    tool_mode_log: RefCell<Vec<(ToolId, ToolMode)>>,
    tool_states: RefCell<HashMap<(SurfaceId, ToolKind), Vec<MeasurementRecord>>>,
    captures: RefCell<HashMap<SurfaceId, CapturedFrame>>,
    frame_meta: RefCell<HashMap<ImageId, FrameMetadata>>,
    next_listener: Cell<u64>,
    attached: RefCell<Vec<ListenerHandle>>,
    detached: RefCell<Vec<ListenerHandle>>,
}

impl MockEngine {
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Makes the next `initialize` call fail with the given message.
    pub fn fail_initialize(&self, message: &str) {
        *self.init_failure.borrow_mut() = Some(message.to_string());
    }

    /// Makes every `enable` call fail with the given message.
    pub fn fail_enable(&self, message: &str) {
        *self.enable_failure.borrow_mut() = Some(message.to_string());
    }

    pub fn was_initialized(&self) -> bool {
        self.initialized.get()
    }

    pub fn enabled_surfaces(&self) -> Vec<SurfaceId> {
        self.enabled.borrow().clone()
    }

    pub fn disabled_surfaces(&self) -> Vec<SurfaceId> {
        self.disabled.borrow().clone()
    }

    pub fn load_requests(&self) -> Vec<(SurfaceId, ImageId, LoadToken)> {
        self.loads.borrow().clone()
    }

    pub fn displayed(&self) -> Vec<(SurfaceId, ImageId)> {
        self.displayed.borrow().clone()
    }

    pub fn set_viewport_count(&self) -> usize {
        self.set_viewport_calls.get()
    }

    pub fn update_image_count(&self) -> usize {
        self.update_image_calls.get()
    }

    pub fn resized_surfaces(&self) -> Vec<SurfaceId> {
        self.resized.borrow().clone()
    }

    pub fn added_tools(&self) -> Vec<ToolId> {
        self.added_tools.borrow().clone()
    }

    pub fn tool_mode_of(&self, tool: ToolId) -> Option<ToolMode> {
        self.tool_modes.borrow().get(&tool).copied()
    }

    pub fn tool_mode_log(&self) -> Vec<(ToolId, ToolMode)> {
        self.tool_mode_log.borrow().clone()
    }

    pub fn set_tool_state(
        &self,
        surface: SurfaceId,
        kind: ToolKind,
        records: Vec<MeasurementRecord>,
    ) {
        self.tool_states
            .borrow_mut()
            .insert((surface, kind), records);
    }

    pub fn set_captured_frame(&self, surface: SurfaceId, frame: CapturedFrame) {
        self.captures.borrow_mut().insert(surface, frame);
    }

    pub fn set_frame_meta(&self, image_id: ImageId, meta: FrameMetadata) {
        self.frame_meta.borrow_mut().insert(image_id, meta);
    }

    pub fn attach_count(&self) -> usize {
        self.attached.borrow().len()
    }

    pub fn detach_count(&self) -> usize {
        self.detached.borrow().len()
    }

    pub fn detach_order(&self) -> Vec<ListenerHandle> {
        self.detached.borrow().clone()
    }

    pub fn active_listener_count(&self) -> usize {
        self.attach_count() - self.detach_count()
    }
}

/// A 2x2 all-white RGBA frame for capture-dependent tests.
pub fn white_capture() -> CapturedFrame {
    CapturedFrame::new(Arc::new(vec![255u8; 16]), 2, 2)
}

impl RenderingEngine for MockEngine {
    fn initialize(&self) -> Result<()> {
        if let Some(message) = self.init_failure.borrow().clone() {
            return Err(Error::EngineInit(message));
        }
        self.initialized.set(true);
        Ok(())
    }

    fn enable(&self, surface: SurfaceId) -> Result<()> {
        if let Some(message) = self.enable_failure.borrow().clone() {
            return Err(Error::EngineInit(message));
        }
        self.enabled.borrow_mut().push(surface);
        Ok(())
    }

    fn disable(&self, surface: SurfaceId) {
        self.disabled.borrow_mut().push(surface);
    }

    fn begin_image_load(&self, surface: SurfaceId, image_id: &ImageId, token: LoadToken) {
        self.loads
            .borrow_mut()
            .push((surface, image_id.clone(), token));
    }

    fn display_image(&self, surface: SurfaceId, image: &EngineImage) {
        self.displayed
            .borrow_mut()
            .push((surface, image.image_id.clone()));
    }

    fn viewport(&self, surface: SurfaceId) -> Option<ViewportTransform> {
        self.viewports.borrow().get(&surface).copied()
    }

    fn set_viewport(&self, surface: SurfaceId, transform: &ViewportTransform) {
        self.set_viewport_calls.set(self.set_viewport_calls.get() + 1);
        self.viewports.borrow_mut().insert(surface, *transform);
    }

    fn update_image(&self, _surface: SurfaceId) {
        self.update_image_calls.set(self.update_image_calls.get() + 1);
    }

    fn resize(&self, surface: SurfaceId) {
        self.resized.borrow_mut().push(surface);
    }

    fn add_tool(&self, tool: ToolId) {
        self.added_tools.borrow_mut().push(tool);
    }

    fn set_tool_active(&self, tool: ToolId, _options: &ToolActivation) {
        self.tool_modes.borrow_mut().insert(tool, ToolMode::Active);
        self.tool_mode_log.borrow_mut().push((tool, ToolMode::Active));
    }

    fn set_tool_passive(&self, tool: ToolId) {
        self.tool_modes.borrow_mut().insert(tool, ToolMode::Passive);
        self.tool_mode_log
            .borrow_mut()
            .push((tool, ToolMode::Passive));
    }

    fn tool_state(&self, surface: SurfaceId, kind: ToolKind) -> Vec<MeasurementRecord> {
        self.tool_states
            .borrow()
            .get(&(surface, kind))
            .cloned()
            .unwrap_or_default()
    }

    fn clear_tool_state(&self, surface: SurfaceId, kind: ToolKind) {
        self.tool_states.borrow_mut().remove(&(surface, kind));
    }

    fn capture_frame(&self, surface: SurfaceId) -> Option<CapturedFrame> {
        self.captures.borrow().get(&surface).cloned()
    }

    fn frame_metadata(&self, image_id: &ImageId) -> Option<FrameMetadata> {
        self.frame_meta.borrow().get(image_id).copied()
    }

    fn subscribe(&self, _surface: SurfaceId) -> ListenerHandle {
        let handle = ListenerHandle::new(self.next_listener.get());
        self.next_listener.set(self.next_listener.get() + 1);
        self.attached.borrow_mut().push(handle);
        handle
    }

    fn unsubscribe(&self, handle: ListenerHandle) {
        self.detached.borrow_mut().push(handle);
    }
}

struct TimerEntry {
    period: Duration,
    callback: Box<dyn FnMut()>,
}

/// Deterministic scheduler: timers fire only when a test says so.
#[derive(Default)]
pub struct ManualScheduler {
    next_id: Cell<u64>,
    timers: RefCell<BTreeMap<u64, TimerEntry>>,
    firing: Cell<Option<u64>>,
    cancel_during_fire: Cell<bool>,
}

impl ManualScheduler {
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn active_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Periods of the active timers, in scheduling order.
    pub fn periods(&self) -> Vec<Duration> {
        self.timers.borrow().values().map(|t| t.period).collect()
    }

    /// Fires one timer's callback. The entry is removed while its
    /// callback runs so the callback may schedule or cancel freely; a
    /// self-cancel during the callback sticks.
    pub fn fire(&self, handle: TimerHandle) {
        let entry = self.timers.borrow_mut().remove(&handle.raw());
        let Some(mut entry) = entry else { return };

        self.firing.set(Some(handle.raw()));
        self.cancel_during_fire.set(false);
        (entry.callback)();
        self.firing.set(None);

        if !self.cancel_during_fire.get() {
            self.timers.borrow_mut().insert(handle.raw(), entry);
        }
    }

    /// Fires every active timer once, in scheduling order.
    pub fn fire_all(&self) {
        let ids: Vec<u64> = self.timers.borrow().keys().copied().collect();
        for id in ids {
            self.fire(TimerHandle::new(id));
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration, tick: Box<dyn FnMut()>) -> TimerHandle {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.timers.borrow_mut().insert(
            id,
            TimerEntry {
                period,
                callback: tick,
            },
        );
        TimerHandle::new(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if self.firing.get() == Some(handle.raw()) {
            self.cancel_during_fire.set(true);
            return;
        }
        self.timers.borrow_mut().remove(&handle.raw());
    }
}
