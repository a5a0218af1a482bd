// SPDX-License-Identifier: MPL-2.0
//! Interactive tool enumeration and the single-selection controller.
//!
//! The rendering engine keeps per-panel tool state, but the viewer exposes
//! one global selection: exactly one interactive tool is active at a time
//! and every other registered tool is passive. [`ToolSelection`] is the
//! single source of truth for that selection; broadcasting the matching
//! active/passive modes into the engine is the orchestrator's job.

use std::fmt;

/// The closed set of interactive tools registered with the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    Pan,
    Zoom,
    /// Window width / window center adjustment via mouse drag.
    Wwwc,
    Magnify,
    Length,
    Angle,
    CobbAngle,
    RectangleRoi,
    EllipticalRoi,
    FreehandRoi,
    Probe,
    TextMarker,
    ArrowAnnotate,
    Bidirectional,
}

impl ToolId {
    /// Every known tool, in registration order.
    pub const ALL: [ToolId; 14] = [
        ToolId::Pan,
        ToolId::Zoom,
        ToolId::Wwwc,
        ToolId::Magnify,
        ToolId::Length,
        ToolId::Angle,
        ToolId::CobbAngle,
        ToolId::RectangleRoi,
        ToolId::EllipticalRoi,
        ToolId::FreehandRoi,
        ToolId::Probe,
        ToolId::TextMarker,
        ToolId::ArrowAnnotate,
        ToolId::Bidirectional,
    ];

    /// Returns the engine-facing tool name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ToolId::Pan => "Pan",
            ToolId::Zoom => "Zoom",
            ToolId::Wwwc => "Wwwc",
            ToolId::Magnify => "Magnify",
            ToolId::Length => "Length",
            ToolId::Angle => "Angle",
            ToolId::CobbAngle => "CobbAngle",
            ToolId::RectangleRoi => "RectangleRoi",
            ToolId::EllipticalRoi => "EllipticalRoi",
            ToolId::FreehandRoi => "FreehandRoi",
            ToolId::Probe => "Probe",
            ToolId::TextMarker => "TextMarker",
            ToolId::ArrowAnnotate => "ArrowAnnotate",
            ToolId::Bidirectional => "Bidirectional",
        }
    }

    /// Parses an engine-facing tool name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<ToolId> {
        ToolId::ALL.iter().copied().find(|tool| tool.name() == name)
    }

    /// Returns the measurement kind this tool produces records for, or
    /// `None` for purely navigational tools (pan, zoom, window/level,
    /// magnify).
    #[must_use]
    pub fn measurement_kind(self) -> Option<ToolKind> {
        match self {
            ToolId::Pan | ToolId::Zoom | ToolId::Wwwc | ToolId::Magnify => None,
            ToolId::Length => Some(ToolKind::Length),
            ToolId::Angle => Some(ToolKind::Angle),
            ToolId::CobbAngle => Some(ToolKind::CobbAngle),
            ToolId::RectangleRoi => Some(ToolKind::RectangleRoi),
            ToolId::EllipticalRoi => Some(ToolKind::EllipticalRoi),
            ToolId::FreehandRoi => Some(ToolKind::FreehandRoi),
            ToolId::Probe => Some(ToolKind::Probe),
            ToolId::TextMarker => Some(ToolKind::TextMarker),
            ToolId::ArrowAnnotate => Some(ToolKind::ArrowAnnotate),
            ToolId::Bidirectional => Some(ToolKind::Bidirectional),
        }
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The subset of tools that produce measurement records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToolKind {
    Length,
    Angle,
    CobbAngle,
    RectangleRoi,
    EllipticalRoi,
    FreehandRoi,
    Probe,
    TextMarker,
    ArrowAnnotate,
    Bidirectional,
}

impl ToolKind {
    /// Every measurement kind, in the order the measurement panel lists
    /// them.
    pub const ALL: [ToolKind; 10] = [
        ToolKind::Length,
        ToolKind::Angle,
        ToolKind::CobbAngle,
        ToolKind::RectangleRoi,
        ToolKind::EllipticalRoi,
        ToolKind::FreehandRoi,
        ToolKind::ArrowAnnotate,
        ToolKind::Bidirectional,
        ToolKind::Probe,
        ToolKind::TextMarker,
    ];

    /// Returns the engine-facing tool name for this kind.
    #[must_use]
    pub fn name(self) -> &'static str {
        ToolId::from(self).name()
    }
}

impl From<ToolKind> for ToolId {
    fn from(kind: ToolKind) -> Self {
        match kind {
            ToolKind::Length => ToolId::Length,
            ToolKind::Angle => ToolId::Angle,
            ToolKind::CobbAngle => ToolId::CobbAngle,
            ToolKind::RectangleRoi => ToolId::RectangleRoi,
            ToolKind::EllipticalRoi => ToolId::EllipticalRoi,
            ToolKind::FreehandRoi => ToolId::FreehandRoi,
            ToolKind::Probe => ToolId::Probe,
            ToolKind::TextMarker => ToolId::TextMarker,
            ToolKind::ArrowAnnotate => ToolId::ArrowAnnotate,
            ToolKind::Bidirectional => ToolId::Bidirectional,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Engine-side activation mode of one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolMode {
    /// The tool responds to pointer input.
    Active,
    /// The tool renders its existing annotations but ignores input.
    Passive,
}

/// Options passed to the engine when activating a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolActivation {
    /// Bitmask of pointer buttons the tool binds to.
    pub mouse_button_mask: u8,
}

impl Default for ToolActivation {
    fn default() -> Self {
        // Primary button.
        Self {
            mouse_button_mask: 1,
        }
    }
}

/// Single source of truth for the active interactive tool.
///
/// At most one tool is [`ToolMode::Active`] at any time; activation is
/// last-write-wins on the single-threaded event loop and idempotent for
/// the already-active tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSelection {
    active: ToolId,
}

impl ToolSelection {
    /// Creates a selection with the given initially active tool.
    #[must_use]
    pub fn new(initial: ToolId) -> Self {
        Self { active: initial }
    }

    /// Returns the currently active tool.
    #[must_use]
    pub fn current(&self) -> ToolId {
        self.active
    }

    /// Makes `tool` the active tool, demoting every other tool to passive.
    ///
    /// Returns `true` if the selection changed. Activating the already
    /// active tool is a safe no-op returning `false`, so callers can skip
    /// the engine broadcast and the change notification.
    pub fn activate(&mut self, tool: ToolId) -> bool {
        if self.active == tool {
            return false;
        }
        self.active = tool;
        true
    }

    /// Returns the mode the engine should hold for `tool`.
    #[must_use]
    pub fn mode_of(&self, tool: ToolId) -> ToolMode {
        if tool == self.active {
            ToolMode::Active
        } else {
            ToolMode::Passive
        }
    }
}

impl Default for ToolSelection {
    fn default() -> Self {
        Self::new(ToolId::Pan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_selection_is_pan() {
        let selection = ToolSelection::default();
        assert_eq!(selection.current(), ToolId::Pan);
        assert_eq!(selection.mode_of(ToolId::Pan), ToolMode::Active);
    }

    #[test]
    fn activate_changes_selection() {
        let mut selection = ToolSelection::default();
        assert!(selection.activate(ToolId::Wwwc));
        assert_eq!(selection.current(), ToolId::Wwwc);
    }

    #[test]
    fn activate_is_idempotent() {
        let mut selection = ToolSelection::default();
        assert!(selection.activate(ToolId::Length));
        assert!(!selection.activate(ToolId::Length));
        assert_eq!(selection.current(), ToolId::Length);
    }

    #[test]
    fn exactly_one_tool_active_for_every_pair() {
        for &first in &ToolId::ALL {
            for &second in &ToolId::ALL {
                if first == second {
                    continue;
                }
                let mut selection = ToolSelection::default();
                selection.activate(first);
                selection.activate(second);

                let active_count = ToolId::ALL
                    .iter()
                    .filter(|&&tool| selection.mode_of(tool) == ToolMode::Active)
                    .count();
                assert_eq!(active_count, 1);
                assert_eq!(selection.mode_of(second), ToolMode::Active);
                assert_eq!(selection.mode_of(first), ToolMode::Passive);
            }
        }
    }

    #[test]
    fn tool_names_round_trip() {
        for &tool in &ToolId::ALL {
            assert_eq!(ToolId::from_name(tool.name()), Some(tool));
        }
        assert_eq!(ToolId::from_name("NotATool"), None);
    }

    #[test]
    fn navigational_tools_have_no_measurement_kind() {
        assert_eq!(ToolId::Pan.measurement_kind(), None);
        assert_eq!(ToolId::Zoom.measurement_kind(), None);
        assert_eq!(ToolId::Wwwc.measurement_kind(), None);
        assert_eq!(ToolId::Magnify.measurement_kind(), None);
    }

    #[test]
    fn measurement_tools_map_to_their_kind() {
        for &kind in &ToolKind::ALL {
            let tool = ToolId::from(kind);
            assert_eq!(tool.measurement_kind(), Some(kind));
            assert_eq!(kind.name(), tool.name());
        }
    }

    #[test]
    fn default_activation_binds_primary_button() {
        assert_eq!(ToolActivation::default().mouse_button_mask, 1);
    }
}
