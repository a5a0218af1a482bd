// SPDX-License-Identifier: MPL-2.0
//! Measurement aggregation and display formatting.
//!
//! The rendering engine owns annotation geometry and hit-testing; this
//! module only collects the engine's per-tool records into a grouped,
//! display-ready snapshot. Groups are rebuilt wholesale on every
//! annotation notification rather than patched incrementally, so a
//! snapshot can never go stale from a partial update.

use crate::tools::ToolKind;
use std::collections::BTreeMap;

/// Payload of one engine-produced annotation, keyed by tool kind.
///
/// The engine reports records as loosely-typed data; this closed
/// enumeration is the crate-side model of the fields the display layer
/// actually reads. Records whose kind carries no displayable scalar are
/// [`MeasurementPayload::Opaque`].
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementPayload {
    /// A linear distance in millimeters.
    Length { mm: f64 },
    /// An angle in degrees.
    Angle { degrees: f64 },
    /// An enclosed region area in square millimeters.
    Area { mm2: f64 },
    /// A single-pixel intensity probe in Hounsfield units.
    Probe { hu: f64 },
    /// A free-text marker.
    Text { label: String },
    /// Recognized record with no displayable scalar.
    Opaque,
}

/// One annotation as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub payload: MeasurementPayload,
}

impl MeasurementRecord {
    #[must_use]
    pub fn length(mm: f64) -> Self {
        Self {
            payload: MeasurementPayload::Length { mm },
        }
    }

    #[must_use]
    pub fn angle(degrees: f64) -> Self {
        Self {
            payload: MeasurementPayload::Angle { degrees },
        }
    }

    #[must_use]
    pub fn area(mm2: f64) -> Self {
        Self {
            payload: MeasurementPayload::Area { mm2 },
        }
    }

    #[must_use]
    pub fn probe(hu: f64) -> Self {
        Self {
            payload: MeasurementPayload::Probe { hu },
        }
    }

    #[must_use]
    pub fn text(label: impl Into<String>) -> Self {
        Self {
            payload: MeasurementPayload::Text {
                label: label.into(),
            },
        }
    }

    #[must_use]
    pub fn opaque() -> Self {
        Self {
            payload: MeasurementPayload::Opaque,
        }
    }
}

/// Formats one record for the measurement panel.
///
/// Pure function of kind + payload. Kinds without a display format (and
/// kind/payload mismatches) render as an empty string rather than failing.
#[must_use]
pub fn display_text(kind: ToolKind, record: &MeasurementRecord) -> String {
    match (kind, &record.payload) {
        (ToolKind::Length, MeasurementPayload::Length { mm }) => {
            format!("Length: {mm:.2} mm")
        }
        (ToolKind::Angle, MeasurementPayload::Angle { degrees }) => {
            format!("Angle: {degrees:.2}°")
        }
        (
            ToolKind::RectangleRoi | ToolKind::EllipticalRoi,
            MeasurementPayload::Area { mm2 },
        ) => format!("Area: {mm2:.2} mm²"),
        (ToolKind::Probe, MeasurementPayload::Probe { hu }) => format!("HU: {hu:.2}"),
        (ToolKind::TextMarker, MeasurementPayload::Text { label }) => label.clone(),
        _ => String::new(),
    }
}

/// Display-ready snapshot of all measurements, grouped by tool kind.
///
/// Kinds with zero records are absent, never present with an empty list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementGroup {
    groups: BTreeMap<ToolKind, Vec<MeasurementRecord>>,
}

impl MeasurementGroup {
    /// Builds a group from the engine's raw per-kind tool state, dropping
    /// kinds with no records and keeping record order unchanged.
    #[must_use]
    pub fn rebuild<I>(raw_tool_state: I) -> Self
    where
        I: IntoIterator<Item = (ToolKind, Vec<MeasurementRecord>)>,
    {
        let groups = raw_tool_state
            .into_iter()
            .filter(|(_, records)| !records.is_empty())
            .collect();
        Self { groups }
    }

    /// Returns the kinds present in this group, in [`ToolKind`] order.
    pub fn kinds(&self) -> impl Iterator<Item = ToolKind> + '_ {
        self.groups.keys().copied()
    }

    /// Returns the records for `kind`, or `None` if the kind is absent.
    #[must_use]
    pub fn records_of(&self, kind: ToolKind) -> Option<&[MeasurementRecord]> {
        self.groups.get(&kind).map(Vec::as_slice)
    }

    /// Returns whether any kind has records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total record count across all kinds.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Returns the display lines for the measurement panel: one entry per
    /// present kind, with each record formatted via [`display_text`].
    #[must_use]
    pub fn formatted(&self) -> Vec<(ToolKind, Vec<String>)> {
        self.groups
            .iter()
            .map(|(&kind, records)| {
                let lines = records
                    .iter()
                    .map(|record| display_text(kind, record))
                    .collect();
                (kind, lines)
            })
            .collect()
    }
}
