//! This module handles the viewer's configuration, including loading and
//! saving user preferences to a `viewer.toml` file.
//!
//! # Examples
//!
//! ```no_run
//! use dicom_lens::config::{self, ViewerConfig};
//!
//! // Load existing configuration
//! let mut config = config::load().unwrap_or_default();
//!
//! // Modify a setting
//! config.cine_rate_hz = Some(15.0);
//!
//! // Save the modified configuration
//! config::save(&config).expect("Failed to save config");
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

pub use defaults::{
    DEFAULT_CINE_RATE_HZ, DEFAULT_WINDOW_CENTER, DEFAULT_WINDOW_WIDTH, FIT_SCALE,
    MAX_CINE_RATE_HZ, MIN_CINE_RATE_HZ, ZOOM_IN_FACTOR, ZOOM_OUT_FACTOR,
};

const CONFIG_FILE: &str = "viewer.toml";
const APP_NAME: &str = "DicomLens";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Window width applied by the reset action.
    #[serde(default)]
    pub default_window_width: Option<f64>,
    /// Window center applied by the reset action.
    #[serde(default)]
    pub default_window_center: Option<f64>,
    /// Cine playback rate in frames per second.
    #[serde(default)]
    pub cine_rate_hz: Option<f64>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_window_width: Some(DEFAULT_WINDOW_WIDTH),
            default_window_center: Some(DEFAULT_WINDOW_CENTER),
            cine_rate_hz: Some(DEFAULT_CINE_RATE_HZ),
        }
    }
}

impl ViewerConfig {
    /// Window width to use at reset, falling back to the built-in default.
    #[must_use]
    pub fn window_width(&self) -> f64 {
        self.default_window_width.unwrap_or(DEFAULT_WINDOW_WIDTH)
    }

    /// Window center to use at reset, falling back to the built-in default.
    #[must_use]
    pub fn window_center(&self) -> f64 {
        self.default_window_center.unwrap_or(DEFAULT_WINDOW_CENTER)
    }

    /// Cine rate to use, falling back to the built-in default.
    #[must_use]
    pub fn cine_rate(&self) -> f64 {
        self.cine_rate_hz.unwrap_or(DEFAULT_CINE_RATE_HZ)
    }
}

fn get_default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(APP_NAME);
        path.push(CONFIG_FILE);
        path
    })
}

pub fn load() -> Result<ViewerConfig> {
    if let Some(path) = get_default_config_path() {
        if path.exists() {
            return load_from_path(&path);
        }
    }
    Ok(ViewerConfig::default())
}

pub fn save(config: &ViewerConfig) -> Result<()> {
    if let Some(path) = get_default_config_path() {
        return save_to_path(config, &path);
    }
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<ViewerConfig> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content).unwrap_or_default())
}

pub fn save_to_path(config: &ViewerConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
