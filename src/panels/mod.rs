// SPDX-License-Identifier: MPL-2.0
//! Panel grid management.
//!
//! A panel is one rendering surface showing one image with its own stored
//! transform. The registry owns the set of panels for the active grid
//! layout. Changing the layout destroys and recreates every panel rather
//! than diffing; the extra re-render cost buys a much simpler invariant:
//! panel ids and transforms never survive a layout change.

use crate::engine::{RenderingEngine, SurfaceId};
use crate::error::{Error, Result};
use crate::viewport::ViewportTransform;
use std::fmt;
use std::rc::Rc;

/// Stable identifier of one grid slot within the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(usize);

impl PanelId {
    #[must_use]
    pub fn new(slot: usize) -> Self {
        Self(slot)
    }

    #[must_use]
    pub fn slot(self) -> usize {
        self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel-{}", self.0)
    }
}

/// Grid dimensions for the viewer layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    rows: usize,
    cols: usize,
}

impl GridLayout {
    /// Creates a layout with the given dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either dimension is zero.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidArgument(format!(
                "grid dimensions must be non-zero, got {rows}x{cols}"
            )));
        }
        Ok(Self { rows, cols })
    }

    /// Parses a `"rowsxcols"` descriptor such as `"2x2"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] on a malformed descriptor or a
    /// zero dimension.
    pub fn from_descriptor(descriptor: &str) -> Result<Self> {
        let malformed =
            || Error::InvalidArgument(format!("malformed layout descriptor {descriptor:?}"));
        let (rows, cols) = descriptor.split_once('x').ok_or_else(malformed)?;
        let rows: usize = rows.trim().parse().map_err(|_| malformed())?;
        let cols: usize = cols.trim().parse().map_err(|_| malformed())?;
        Self::new(rows, cols)
    }

    #[must_use]
    pub fn rows(self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(self) -> usize {
        self.cols
    }

    /// Number of panels this layout holds.
    #[must_use]
    pub fn panel_count(self) -> usize {
        self.rows * self.cols
    }

    /// Returns the `"rowsxcols"` descriptor for this layout.
    #[must_use]
    pub fn descriptor(self) -> String {
        format!("{}x{}", self.rows, self.cols)
    }
}

impl Default for GridLayout {
    fn default() -> Self {
        Self { rows: 1, cols: 1 }
    }
}

/// One grid slot: stored transform plus the attached surface, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    id: PanelId,
    surface: Option<SurfaceId>,
    transform: ViewportTransform,
}

impl Panel {
    fn fresh(id: PanelId, transform: ViewportTransform) -> Self {
        Self {
            id,
            surface: None,
            transform,
        }
    }

    #[must_use]
    pub fn id(&self) -> PanelId {
        self.id
    }

    /// The attached rendering surface, present iff the panel is mounted.
    #[must_use]
    pub fn surface(&self) -> Option<SurfaceId> {
        self.surface
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.surface.is_some()
    }

    /// The canonical stored transform for this panel.
    #[must_use]
    pub fn transform(&self) -> ViewportTransform {
        self.transform
    }
}

/// Owns the panels of the active grid layout.
pub struct PanelRegistry {
    engine: Rc<dyn RenderingEngine>,
    layout: GridLayout,
    panels: Vec<Panel>,
}

impl PanelRegistry {
    /// Creates an empty registry (no panels until the first `set_layout`).
    #[must_use]
    pub fn new(engine: Rc<dyn RenderingEngine>) -> Self {
        Self {
            engine,
            layout: GridLayout::default(),
            panels: Vec::new(),
        }
    }

    #[must_use]
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    #[must_use]
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    #[must_use]
    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get(id.slot())
    }

    /// The first panel of the grid, used as the cine/measurement/export
    /// authority.
    #[must_use]
    pub fn primary(&self) -> Option<&Panel> {
        self.panels.first()
    }

    #[must_use]
    pub fn mounted_count(&self) -> usize {
        self.panels.iter().filter(|p| p.is_mounted()).count()
    }

    /// Replaces all panels with `rows*cols` fresh ones carrying
    /// `baseline` as their transform. This is the only way the panel
    /// count changes. Mounted surfaces are disabled first.
    pub fn set_layout(&mut self, layout: GridLayout, baseline: ViewportTransform) {
        self.unmount_all();
        self.layout = layout;
        self.panels = (0..layout.panel_count())
            .map(|slot| Panel::fresh(PanelId::new(slot), baseline))
            .collect();
    }

    /// Attaches a rendering surface to a panel and enables it in the
    /// engine.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unknown panel id and
    /// propagates engine enable failures.
    pub fn mount(&mut self, id: PanelId, surface: SurfaceId) -> Result<()> {
        let panel = self
            .panels
            .get_mut(id.slot())
            .ok_or_else(|| Error::InvalidArgument(format!("unknown panel {id}")))?;
        self.engine.enable(surface)?;
        panel.surface = Some(surface);
        Ok(())
    }

    /// Detaches a panel's surface and disables it in the engine.
    pub fn unmount(&mut self, id: PanelId) {
        if let Some(panel) = self.panels.get_mut(id.slot()) {
            if let Some(surface) = panel.surface.take() {
                self.engine.disable(surface);
            }
        }
    }

    /// Detaches every mounted surface, last panel first.
    pub fn unmount_all(&mut self) {
        for panel in self.panels.iter_mut().rev() {
            if let Some(surface) = panel.surface.take() {
                self.engine.disable(surface);
            }
        }
    }

    /// Applies `f` to every mounted panel.
    pub fn for_each_mounted(&self, mut f: impl FnMut(&Panel)) {
        for panel in self.panels.iter().filter(|p| p.is_mounted()) {
            f(panel);
        }
    }

    /// Derives a new transform for every panel and pushes it to the
    /// engine for the mounted ones in a single synchronous fan-out.
    ///
    /// The updater is evaluated for all panels before anything is
    /// committed, so a failing updater leaves every stored transform and
    /// every engine mirror untouched; callers never observe a state where
    /// only some panels carry the new transform.
    ///
    /// # Errors
    ///
    /// Propagates the first updater error.
    pub fn apply_transform(
        &mut self,
        updater: impl Fn(ViewportTransform) -> Result<ViewportTransform>,
    ) -> Result<()> {
        let updated = self
            .panels
            .iter()
            .map(|panel| updater(panel.transform))
            .collect::<Result<Vec<_>>>()?;

        for (panel, transform) in self.panels.iter_mut().zip(updated) {
            panel.transform = transform;
            if let Some(surface) = panel.surface {
                self.engine.set_viewport(surface, &panel.transform);
                self.engine.update_image(surface);
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PanelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PanelRegistry")
            .field("layout", &self.layout)
            .field("panels", &self.panels)
            .finish_non_exhaustive()
    }
}
