// SPDX-License-Identifier: MPL-2.0
//! Study descriptor and overlay metadata.
//!
//! The study descriptor is supplied once at viewer entry by the search
//! flow and consumed read-only here. Per-frame fields (series and
//! instance numbers) come from the engine's metadata providers and are
//! merged in whenever a frame is rendered.

use crate::engine::FrameMetadata;
use serde::{Deserialize, Serialize};

/// The study selected for viewing, as handed over by the search page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyDescriptor {
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub patient_id: String,
    #[serde(default)]
    pub study_date: String,
    #[serde(default)]
    pub modality: String,
    #[serde(default)]
    pub accession_number: String,
    /// Engine-loadable id of the study's image data.
    #[serde(default)]
    pub image_url: String,
}

/// Metadata block shown by the viewport overlay and the print document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    pub patient_name: String,
    pub patient_id: String,
    pub study_date: String,
    pub modality: String,
    pub series_number: Option<i32>,
    pub instance_number: Option<i32>,
}

impl ImageMetadata {
    /// Assembles overlay metadata from the study descriptor and the
    /// engine's per-frame lookup. A missing patient name is rendered as
    /// "Anonymous".
    #[must_use]
    pub fn assemble(study: &StudyDescriptor, frame: Option<FrameMetadata>) -> Self {
        let patient_name = if study.patient_name.is_empty() {
            "Anonymous".to_string()
        } else {
            study.patient_name.clone()
        };
        Self {
            patient_name,
            patient_id: study.patient_id.clone(),
            study_date: study.study_date.clone(),
            modality: study.modality.clone(),
            series_number: frame.and_then(|f| f.series_number),
            instance_number: frame.and_then(|f| f.instance_number),
        }
    }
}
