// SPDX-License-Identifier: MPL-2.0
//! Rendering engine port definition.
//!
//! This module defines the [`RenderingEngine`] trait: the boundary between
//! this orchestration core and the external engine that owns pixel
//! decoding, canvas drawing, viewport math, and tool hit-testing. The
//! embedding application implements this trait; the test suite implements
//! it with a recording mock.
//!
//! Image loading is the one asynchronous operation: [`RenderingEngine::begin_image_load`]
//! is fire-and-forget, and completion arrives later as an
//! [`EngineEvent::ImageLoaded`] carrying the [`LoadToken`] that was issued
//! with the request. Stale completions are recognized by token and
//! silently dropped (last-requested-wins; see [`dispatch::FrameDispatcher`]).

use crate::error::{ImageLoadError, Result};
use crate::measurements::MeasurementRecord;
use crate::tools::{ToolActivation, ToolId, ToolKind};
use crate::viewport::ViewportTransform;
use std::fmt;
use std::sync::Arc;

pub mod dispatch;
pub mod listener;

pub use dispatch::FrameDispatcher;
pub use listener::{ListenerHandle, ListenerRegistration, ListenerStack};

/// Identifies one rendering surface (the engine-side handle for a panel's
/// drawing target).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// Identifies one image within a study, e.g. `wadouri:https://.../CT2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Engine-side handle for a decoded image, ready for display.
///
/// Opaque to this crate beyond the id it was decoded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineImage {
    pub image_id: ImageId,
}

/// Correlates an asynchronous load completion with the request that
/// started it. Tokens increase monotonically per viewer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadToken(pub(crate) u64);

impl LoadToken {
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Result of an asynchronous image load.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded(EngineImage),
    Failed(ImageLoadError),
}

/// Notifications emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A surface finished presenting a frame.
    ImageRendered { surface: SurfaceId },
    /// An asynchronous load started via `begin_image_load` completed.
    ImageLoaded {
        surface: SurfaceId,
        token: LoadToken,
        outcome: LoadOutcome,
    },
    /// A measurement annotation was completed on a surface.
    MeasurementCompleted { surface: SurfaceId },
    /// A measurement annotation was modified on a surface.
    MeasurementModified { surface: SurfaceId },
    /// A measurement annotation was removed from a surface.
    MeasurementRemoved { surface: SurfaceId },
}

/// Per-frame metadata supplied by the engine's metadata providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameMetadata {
    pub series_number: Option<i32>,
    pub instance_number: Option<i32>,
}

/// RGBA snapshot of a rendered surface, used for export and print.
///
/// The pixel data is shared to avoid expensive clones when a frame is
/// both exported and embedded in a print document.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub rgba_data: Arc<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

impl CapturedFrame {
    #[must_use]
    pub fn new(rgba_data: Arc<Vec<u8>>, width: u32, height: u32) -> Self {
        Self {
            rgba_data,
            width,
            height,
        }
    }
}

/// Port for the external image-decoding and rendering engine.
///
/// All calls happen on the single UI thread; implementations are not
/// required to be `Send` or `Sync`. Every mutating call runs to
/// completion before the next orchestrator-level event is processed.
pub trait RenderingEngine {
    /// Starts the engine runtime (tool subsystem, decode workers).
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::EngineInit`] if the engine or its
    /// worker subsystem fails to start.
    fn initialize(&self) -> Result<()>;

    /// Attaches the engine to a rendering surface.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::EngineInit`] if the surface cannot
    /// be enabled.
    fn enable(&self, surface: SurfaceId) -> Result<()>;

    /// Detaches the engine from a rendering surface.
    fn disable(&self, surface: SurfaceId);

    /// Starts an asynchronous load of `image_id` on behalf of `surface`.
    ///
    /// Completion is reported as [`EngineEvent::ImageLoaded`] carrying
    /// `token`; the engine never blocks this call on decoding.
    fn begin_image_load(&self, surface: SurfaceId, image_id: &ImageId, token: LoadToken);

    /// Presents a decoded image on a surface.
    fn display_image(&self, surface: SurfaceId, image: &EngineImage);

    /// Reads back the engine's current transform for a surface.
    fn viewport(&self, surface: SurfaceId) -> Option<ViewportTransform>;

    /// Overwrites the engine's transform for a surface.
    fn set_viewport(&self, surface: SurfaceId, transform: &ViewportTransform);

    /// Requests a re-render of the surface with its current state.
    fn update_image(&self, surface: SurfaceId);

    /// Notifies the engine that the surface's backing element was resized.
    fn resize(&self, surface: SurfaceId);

    /// Registers a tool with the engine's tool subsystem.
    fn add_tool(&self, tool: ToolId);

    /// Binds a tool to pointer input on every enabled surface.
    fn set_tool_active(&self, tool: ToolId, options: &ToolActivation);

    /// Makes a tool render-only on every enabled surface.
    fn set_tool_passive(&self, tool: ToolId);

    /// Returns the measurement records a tool kind holds for a surface.
    fn tool_state(&self, surface: SurfaceId, kind: ToolKind) -> Vec<MeasurementRecord>;

    /// Removes all of a tool kind's records from a surface.
    fn clear_tool_state(&self, surface: SurfaceId, kind: ToolKind);

    /// Captures the surface's current canvas contents.
    fn capture_frame(&self, surface: SurfaceId) -> Option<CapturedFrame>;

    /// Looks up per-frame metadata (series/instance numbers) for an image.
    fn frame_metadata(&self, image_id: &ImageId) -> Option<FrameMetadata>;

    /// Registers interest in the engine's events for a surface.
    ///
    /// The returned handle must be released with [`RenderingEngine::unsubscribe`];
    /// [`ListenerRegistration`] does this automatically on drop.
    fn subscribe(&self, surface: SurfaceId) -> ListenerHandle;

    /// Releases an event subscription.
    fn unsubscribe(&self, handle: ListenerHandle);
}
