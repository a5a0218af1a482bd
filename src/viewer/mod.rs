// SPDX-License-Identifier: MPL-2.0
//! Viewer orchestration.
//!
//! [`ViewerOrchestrator`] is the single mutable-state owner for one viewer
//! session: the active tool, the canonical global transform, the panel
//! grid, the image sequence, the cine session, and the measurement
//! snapshot all live here, constructed once per session and injected
//! where needed instead of being reached through globals.
//!
//! Data flow: a toolbar action lands on an orchestrator method, which
//! derives new state through the pure domain types and fans it out to
//! every mounted panel in one synchronous pass; engine notifications come
//! back through [`ViewerOrchestrator::handle_event`] and only update
//! derived display state.

use crate::cine::{CinePlayer, FrameChangeCallback, FrameRate};
use crate::config::defaults::{FIT_SCALE, ZOOM_IN_FACTOR, ZOOM_OUT_FACTOR};
use crate::config::ViewerConfig;
use crate::engine::{
    EngineEvent, FrameDispatcher, ImageId, ListenerRegistration, ListenerStack, LoadOutcome,
    LoadToken, RenderingEngine, SurfaceId,
};
use crate::error::{Error, Result};
use crate::export::{self, ExportFormat, ExportedImage};
use crate::measurements::MeasurementGroup;
use crate::panels::{GridLayout, Panel, PanelId, PanelRegistry};
use crate::scheduler::Scheduler;
use crate::sequence::ImageSequence;
use crate::study::{ImageMetadata, StudyDescriptor};
use crate::tools::{ToolActivation, ToolId, ToolKind, ToolSelection};
use crate::viewport::{FlipAxis, RotationDirection, ViewportTransform, WindowLevel};
use chrono::Utc;
use std::cell::RefCell;
use std::rc::Rc;

#[cfg(test)]
mod tests;

/// Number of times a demo study's single frame is repeated to form a
/// scrollable series.
const DEMO_SERIES_LEN: usize = 10;

/// Lifecycle state of the viewer page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerStatus {
    /// Engine and panels are still being brought up.
    Loading,
    /// The viewer is interactive.
    Ready,
    /// Engine startup failed; blocking error, recovered by re-entering
    /// the viewer.
    Failed(String),
}

/// Display-ready snapshot consumed by the viewport overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    pub metadata: Option<ImageMetadata>,
    pub transform: ViewportTransform,
    pub current_image_index: usize,
    pub total_images: usize,
}

/// Composes the viewport, tool, panel, cine, and measurement components
/// around the external rendering engine.
pub struct ViewerOrchestrator {
    engine: Rc<dyn RenderingEngine>,
    scheduler: Rc<dyn Scheduler>,
    config: ViewerConfig,
    study: StudyDescriptor,
    status: ViewerStatus,
    panels: PanelRegistry,
    tools: ToolSelection,
    /// Canonical copy of the transform shared by all panels. The
    /// engine's per-surface copies are overwritable mirrors.
    transform: ViewportTransform,
    sequence: Rc<RefCell<ImageSequence>>,
    dispatcher: Rc<FrameDispatcher>,
    cine: Option<CinePlayer>,
    measurements: MeasurementGroup,
    listeners: ListenerStack,
    metadata: Option<ImageMetadata>,
}

impl ViewerOrchestrator {
    /// Creates an orchestrator for one viewer session.
    ///
    /// The study's `image_url` seeds a demo series of [`DEMO_SERIES_LEN`]
    /// frames; [`ViewerOrchestrator::set_sequence`] replaces it when a
    /// real series is available.
    #[must_use]
    pub fn new(
        engine: Rc<dyn RenderingEngine>,
        scheduler: Rc<dyn Scheduler>,
        config: ViewerConfig,
        study: StudyDescriptor,
    ) -> Self {
        let dispatcher = Rc::new(FrameDispatcher::new(Rc::clone(&engine)));
        let panels = PanelRegistry::new(Rc::clone(&engine));
        let sequence = if study.image_url.is_empty() {
            ImageSequence::empty()
        } else {
            ImageSequence::demo_series(ImageId::new(study.image_url.clone()), DEMO_SERIES_LEN)
        };
        let transform = baseline_transform(&config);

        Self {
            engine,
            scheduler,
            config,
            study,
            status: ViewerStatus::Loading,
            panels,
            tools: ToolSelection::default(),
            transform,
            sequence: Rc::new(RefCell::new(sequence)),
            dispatcher,
            cine: None,
            measurements: MeasurementGroup::default(),
            listeners: ListenerStack::new(),
            metadata: None,
        }
    }

    /// Replaces the image sequence (extension point for real series
    /// loading). Resets the position to the first frame.
    pub fn set_sequence(&mut self, sequence: ImageSequence) {
        *self.sequence.borrow_mut() = sequence;
    }

    /// Brings the viewer up: starts the engine runtime, registers the
    /// tool set, mounts the initial panel grid onto the given surfaces,
    /// displays the first frame everywhere, and activates the default
    /// pan tool.
    ///
    /// # Errors
    ///
    /// Engine startup or surface-enable failures leave the viewer in
    /// [`ViewerStatus::Failed`] and are returned to the caller. There is
    /// no automatic retry.
    pub fn initialize(&mut self, layout: GridLayout, surfaces: &[SurfaceId]) -> Result<()> {
        match self.initialize_inner(layout, surfaces) {
            Ok(()) => {
                self.status = ViewerStatus::Ready;
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "viewer initialization failed");
                self.status = ViewerStatus::Failed(err.to_string());
                Err(err)
            }
        }
    }

    fn initialize_inner(&mut self, layout: GridLayout, surfaces: &[SurfaceId]) -> Result<()> {
        self.engine.initialize()?;
        for tool in ToolId::ALL {
            self.engine.add_tool(tool);
        }
        self.apply_layout(layout, surfaces)?;
        self.display_current_on_all();
        self.broadcast_tool_modes();
        Ok(())
    }

    /// Switches the grid layout, destroying and recreating every panel.
    ///
    /// The last known global transform and the active tool are re-applied
    /// to the new panels, so visual state survives a layout change. Any
    /// running cine session is disposed with the old panel set; the next
    /// play request creates a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the surface count does not
    /// match the layout, and propagates engine enable failures.
    pub fn set_layout(&mut self, layout: GridLayout, surfaces: &[SurfaceId]) -> Result<()> {
        self.apply_layout(layout, surfaces)?;
        self.display_current_on_all();
        self.broadcast_tool_modes();
        Ok(())
    }

    fn apply_layout(&mut self, layout: GridLayout, surfaces: &[SurfaceId]) -> Result<()> {
        if surfaces.len() != layout.panel_count() {
            return Err(Error::InvalidArgument(format!(
                "layout {} needs {} surfaces, got {}",
                layout.descriptor(),
                layout.panel_count(),
                surfaces.len()
            )));
        }

        // Teardown mirrors bring-up in reverse: cine first, then
        // listeners (newest first), then the panels themselves.
        if let Some(cine) = self.cine.take() {
            cine.dispose();
        }
        self.listeners.release_all();
        self.dispatcher.forget_all();

        self.panels.set_layout(layout, baseline_transform(&self.config));
        for (slot, &surface) in surfaces.iter().enumerate() {
            self.panels.mount(PanelId::new(slot), surface)?;
            self.listeners
                .push(ListenerRegistration::attach(Rc::clone(&self.engine), surface));
        }

        let transform = self.transform;
        self.panels.apply_transform(|_| Ok(transform))?;
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> &ViewerStatus {
        &self.status
    }

    /// Current grid layout.
    #[must_use]
    pub fn layout(&self) -> GridLayout {
        self.panels.layout()
    }

    /// The panels of the current layout.
    #[must_use]
    pub fn panels(&self) -> &[Panel] {
        self.panels.panels()
    }

    /// The currently active tool.
    #[must_use]
    pub fn active_tool(&self) -> ToolId {
        self.tools.current()
    }

    /// The latest measurement snapshot.
    #[must_use]
    pub fn measurements(&self) -> &MeasurementGroup {
        &self.measurements
    }

    /// Overlay-ready snapshot of metadata, transform, and position.
    #[must_use]
    pub fn overlay_snapshot(&self) -> OverlaySnapshot {
        let sequence = self.sequence.borrow();
        OverlaySnapshot {
            metadata: self.metadata.clone(),
            transform: self.transform,
            current_image_index: sequence.current_index(),
            total_images: sequence.len(),
        }
    }

    // =========================================================================
    // Tool selection
    // =========================================================================

    /// Makes `tool` the active tool on every panel.
    ///
    /// Re-activating the current tool performs no engine traffic.
    pub fn change_tool(&mut self, tool: ToolId) {
        if !self.tools.activate(tool) {
            return;
        }
        self.broadcast_tool_modes();
    }

    /// Pushes the current selection into the engine: the active tool is
    /// bound to the primary pointer button, every other tool goes
    /// passive. The engine's per-panel tool state always mirrors this
    /// single global selection.
    fn broadcast_tool_modes(&self) {
        let active = self.tools.current();
        for tool in ToolId::ALL {
            if tool != active {
                self.engine.set_tool_passive(tool);
            }
        }
        self.engine.set_tool_active(active, &ToolActivation::default());
    }

    // =========================================================================
    // Transform actions
    // =========================================================================

    /// Zooms every panel in by the configured toolbar factor.
    pub fn zoom_in(&mut self) -> Result<()> {
        let transform = self.transform.zoomed_by(ZOOM_IN_FACTOR)?;
        self.apply_global_transform(transform)
    }

    /// Zooms every panel out by the configured toolbar factor.
    pub fn zoom_out(&mut self) -> Result<()> {
        let transform = self.transform.zoomed_by(ZOOM_OUT_FACTOR)?;
        self.apply_global_transform(transform)
    }

    /// Sets an explicit display scale on every panel.
    pub fn set_scale(&mut self, scale: f64) -> Result<()> {
        let transform = self.transform.with_scale(scale)?;
        self.apply_global_transform(transform)
    }

    /// Returns every panel to the fit scale.
    pub fn fit(&mut self) -> Result<()> {
        self.set_scale(FIT_SCALE)
    }

    /// Rotates every panel 90 degrees.
    pub fn rotate(&mut self, direction: RotationDirection) -> Result<()> {
        self.apply_global_transform(self.transform.rotated(direction))
    }

    /// Toggles a mirror axis on every panel.
    pub fn flip(&mut self, axis: FlipAxis) -> Result<()> {
        self.apply_global_transform(self.transform.flipped(axis))
    }

    /// Toggles color inversion on every panel.
    pub fn invert_colors(&mut self) -> Result<()> {
        self.apply_global_transform(self.transform.inverted())
    }

    /// Applies a new window/level to every panel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a non-positive width; no
    /// panel is touched in that case.
    pub fn set_window_level(&mut self, width: f64, center: f64) -> Result<()> {
        let transform = self.transform.with_window_level(width, center)?;
        self.apply_global_transform(transform)
    }

    /// Resets every panel to the baseline transform with the configured
    /// default window/level.
    pub fn reset_transform(&mut self) -> Result<()> {
        self.apply_global_transform(baseline_transform(&self.config))
    }

    fn apply_global_transform(&mut self, transform: ViewportTransform) -> Result<()> {
        self.panels.apply_transform(|_| Ok(transform))?;
        // The overlay reads this canonical copy, so it is always the
        // last applied transform, never a stale engine readback.
        self.transform = transform;
        Ok(())
    }

    // =========================================================================
    // Image navigation (clamped; wraparound is cine's behavior only)
    // =========================================================================

    /// Steps to the next image, stopping at the end of the sequence.
    /// Returns whether the position changed.
    pub fn next_image(&mut self) -> bool {
        let advanced = self.sequence.borrow_mut().advance_clamped();
        if advanced {
            self.display_current_on_all();
        }
        advanced
    }

    /// Steps to the previous image, stopping at the start of the
    /// sequence. Returns whether the position changed.
    pub fn previous_image(&mut self) -> bool {
        let retreated = self.sequence.borrow_mut().retreat_clamped();
        if retreated {
            self.display_current_on_all();
        }
        retreated
    }

    fn display_current_on_all(&self) {
        let sequence = self.sequence.borrow();
        let Some(image_id) = sequence.current_id() else {
            return;
        };
        self.panels.for_each_mounted(|panel| {
            if let Some(surface) = panel.surface() {
                self.dispatcher.request(surface, image_id);
            }
        });
    }

    // =========================================================================
    // Cine
    // =========================================================================

    /// Starts or stops cine playback on the primary panel. Returns the
    /// resulting playing flag.
    ///
    /// With no mounted panels this is a guarded no-op returning `false`.
    ///
    /// # Errors
    ///
    /// Propagates the empty-sequence rejection from [`CinePlayer::play`].
    pub fn toggle_cine(&mut self) -> Result<bool> {
        let Some(surface) = self.primary_surface() else {
            return Ok(false);
        };
        self.ensure_cine(surface);
        match &self.cine {
            Some(player) => player.toggle(),
            None => Ok(false),
        }
    }

    /// Updates the cine frame rate, taking effect immediately when
    /// playing. The rate also becomes the default for future sessions.
    pub fn set_cine_rate(&mut self, hz: f64) {
        let rate = FrameRate::new(hz);
        self.config.cine_rate_hz = Some(rate.hz());
        if let Some(player) = &self.cine {
            player.set_frame_rate(rate.hz());
        }
    }

    /// Returns whether cine playback is running.
    #[must_use]
    pub fn cine_playing(&self) -> bool {
        self.cine.as_ref().is_some_and(CinePlayer::is_playing)
    }

    /// Registers a callback invoked with the new index on every cine
    /// frame change.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when no panel is mounted to
    /// bind the session to.
    pub fn set_cine_frame_callback(&mut self, callback: FrameChangeCallback) -> Result<()> {
        let Some(surface) = self.primary_surface() else {
            return Err(Error::InvalidArgument(
                "no mounted panel to bind cine to".to_string(),
            ));
        };
        self.ensure_cine(surface);
        if let Some(player) = &self.cine {
            player.set_frame_change_callback(callback);
        }
        Ok(())
    }

    fn ensure_cine(&mut self, surface: SurfaceId) {
        if self.cine.is_none() {
            self.cine = Some(CinePlayer::new(
                surface,
                Rc::clone(&self.sequence),
                Rc::clone(&self.dispatcher),
                Rc::clone(&self.scheduler),
                FrameRate::new(self.config.cine_rate()),
            ));
        }
    }

    fn primary_surface(&self) -> Option<SurfaceId> {
        self.panels.primary().and_then(Panel::surface)
    }

    // =========================================================================
    // Engine events
    // =========================================================================

    /// Consumes one engine notification.
    ///
    /// Called by the embedding event loop for every event the engine
    /// emits on a subscribed surface.
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::ImageRendered { surface: _ } => self.refresh_metadata(),
            EngineEvent::ImageLoaded {
                surface,
                token,
                outcome,
            } => self.finish_image_load(surface, token, outcome),
            EngineEvent::MeasurementCompleted { .. }
            | EngineEvent::MeasurementModified { .. }
            | EngineEvent::MeasurementRemoved { .. } => self.rebuild_measurements(),
        }
    }

    fn refresh_metadata(&mut self) {
        let frame_meta = self
            .sequence
            .borrow()
            .current_id()
            .and_then(|id| self.engine.frame_metadata(id));
        self.metadata = Some(ImageMetadata::assemble(&self.study, frame_meta));
    }

    fn finish_image_load(&mut self, surface: SurfaceId, token: LoadToken, outcome: LoadOutcome) {
        if !self.dispatcher.is_current(surface, token) {
            // A newer request already advanced this panel; the stale
            // result is dropped without effect.
            tracing::debug!(%surface, token = token.raw(), "stale image load superseded");
            return;
        }
        match outcome {
            LoadOutcome::Loaded(image) => self.engine.display_image(surface, &image),
            LoadOutcome::Failed(err) => {
                // The panel keeps its last successfully loaded frame;
                // cine and sibling panels are unaffected.
                tracing::warn!(%surface, error = %err, "image load failed, keeping last frame");
            }
        }
    }

    // =========================================================================
    // Measurements
    // =========================================================================

    /// Rebuilds the measurement snapshot wholesale from the engine's
    /// per-kind tool state on the primary panel.
    fn rebuild_measurements(&mut self) {
        let Some(surface) = self.primary_surface() else {
            self.measurements = MeasurementGroup::default();
            return;
        };
        let raw = ToolKind::ALL
            .iter()
            .map(|&kind| (kind, self.engine.tool_state(surface, kind)));
        self.measurements = MeasurementGroup::rebuild(raw);
    }

    /// Removes every measurement from every mounted panel and empties
    /// the snapshot.
    pub fn clear_measurements(&mut self) {
        self.panels.for_each_mounted(|panel| {
            if let Some(surface) = panel.surface() {
                for kind in ToolKind::ALL {
                    self.engine.clear_tool_state(surface, kind);
                }
                self.engine.update_image(surface);
            }
        });
        self.measurements = MeasurementGroup::default();
    }

    // =========================================================================
    // Export, print, resize, teardown
    // =========================================================================

    /// Captures the primary panel and encodes it in the requested
    /// format, bound to a `{patient}-{timestamp}` filename.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Export`] when no panel is mounted, the engine
    /// yields no capture, or encoding fails.
    pub fn export_image(&self, format: ExportFormat) -> Result<ExportedImage> {
        let frame = self.captured_primary_frame()?;
        let bytes = export::encode_frame(&frame, format)?;
        let patient = self
            .metadata
            .as_ref()
            .map_or("dicom-image", |meta| meta.patient_name.as_str());
        let filename = export::export_filename(patient, Utc::now(), format);
        Ok(ExportedImage {
            filename,
            format,
            bytes,
        })
    }

    /// Renders the print page for the current frame and metadata.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Export`] when no frame can be captured or
    /// encoded.
    pub fn print_document(&self) -> Result<String> {
        let frame = self.captured_primary_frame()?;
        let metadata = self
            .metadata
            .clone()
            .unwrap_or_else(|| ImageMetadata::assemble(&self.study, None));
        export::print_document(&metadata, &frame, Utc::now())
    }

    fn captured_primary_frame(&self) -> Result<crate::engine::CapturedFrame> {
        let surface = self
            .primary_surface()
            .ok_or_else(|| Error::Export("no mounted panel to capture".to_string()))?;
        self.engine
            .capture_frame(surface)
            .ok_or_else(|| Error::Export("engine returned no frame capture".to_string()))
    }

    /// Forwards a host window resize to every mounted surface.
    pub fn resize_all(&self) {
        self.panels.for_each_mounted(|panel| {
            if let Some(surface) = panel.surface() {
                self.engine.resize(surface);
            }
        });
    }

    /// Tears the session down: disposes the cine timer, detaches every
    /// listener in reverse attachment order, and disables all surfaces.
    pub fn shutdown(&mut self) {
        if let Some(cine) = self.cine.take() {
            cine.dispose();
        }
        self.listeners.release_all();
        self.dispatcher.forget_all();
        self.panels.unmount_all();
    }
}

impl std::fmt::Debug for ViewerOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewerOrchestrator")
            .field("status", &self.status)
            .field("layout", &self.panels.layout())
            .field("active_tool", &self.tools.current())
            .field("transform", &self.transform)
            .finish_non_exhaustive()
    }
}

/// Baseline transform from the configured default window/level, falling
/// back to the built-in defaults when the configured values are invalid.
fn baseline_transform(config: &ViewerConfig) -> ViewportTransform {
    let window =
        WindowLevel::new(config.window_width(), config.window_center()).unwrap_or_else(|_| {
            tracing::warn!(
                width = config.window_width(),
                "configured window width is invalid, using built-in default"
            );
            WindowLevel::default()
        });
    ViewportTransform::baseline(window)
}
