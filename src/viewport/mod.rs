// SPDX-License-Identifier: MPL-2.0
//! Per-panel display transform model.
//!
//! A [`ViewportTransform`] captures everything the rendering engine needs to
//! present one frame on one panel: contrast mapping (window/level), scale,
//! rotation, flips, and color inversion. All derivation operations are pure
//! and return a new transform; pushing a transform to the engine is the
//! orchestrator's job.

use crate::config::defaults::{DEFAULT_WINDOW_CENTER, DEFAULT_WINDOW_WIDTH};
use crate::error::{Error, Result};

/// Contrast-mapping parameters (VOI window).
///
/// The width is guaranteed positive by construction, so a
/// `ViewportTransform` can never carry a degenerate window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowLevel {
    width: f64,
    center: f64,
}

impl WindowLevel {
    /// Creates a new window/level pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `width` is not strictly
    /// positive.
    pub fn new(width: f64, center: f64) -> Result<Self> {
        if !(width > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "window width must be positive, got {width}"
            )));
        }
        Ok(Self { width, center })
    }

    /// Returns the window width.
    #[must_use]
    pub fn width(self) -> f64 {
        self.width
    }

    /// Returns the window center.
    #[must_use]
    pub fn center(self) -> f64 {
        self.center
    }
}

impl Default for WindowLevel {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_WIDTH,
            center: DEFAULT_WINDOW_CENTER,
        }
    }
}

/// Rotation step direction for the toolbar rotate actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// Mirror axis for the toolbar flip actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    Horizontal,
    Vertical,
}

/// Normalizes an angle in degrees into `[0, 360)`.
///
/// Handles negative inputs correctly: `-90` normalizes to `270`.
#[must_use]
pub fn normalize_degrees(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}

/// One panel's display transform.
///
/// The orchestrator holds the canonical copy; the engine's copy is a
/// derived mirror that is overwritten on every fan-out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportTransform {
    window: WindowLevel,
    scale: f64,
    rotation_degrees: i32,
    hflip: bool,
    vflip: bool,
    invert: bool,
}

impl ViewportTransform {
    /// Returns the fixed baseline transform: scale 1, no rotation, no
    /// flips, no inversion, with the given window/level.
    #[must_use]
    pub fn baseline(window: WindowLevel) -> Self {
        Self {
            window,
            scale: 1.0,
            rotation_degrees: 0,
            hflip: false,
            vflip: false,
            invert: false,
        }
    }

    /// Returns the window/level.
    #[must_use]
    pub fn window(&self) -> WindowLevel {
        self.window
    }

    /// Returns the display scale.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the rotation in degrees, always in `[0, 360)`.
    #[must_use]
    pub fn rotation_degrees(&self) -> i32 {
        self.rotation_degrees
    }

    /// Returns whether the image is mirrored horizontally.
    #[must_use]
    pub fn hflip(&self) -> bool {
        self.hflip
    }

    /// Returns whether the image is mirrored vertically.
    #[must_use]
    pub fn vflip(&self) -> bool {
        self.vflip
    }

    /// Returns whether colors are inverted.
    #[must_use]
    pub fn invert(&self) -> bool {
        self.invert
    }

    /// Returns a transform with the scale multiplied by `factor`.
    ///
    /// No upper or lower clamp is imposed here; clamping is a policy
    /// decision left to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `factor` is not strictly
    /// positive and finite, which would break the `scale > 0` invariant.
    pub fn zoomed_by(self, factor: f64) -> Result<Self> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "zoom factor must be positive and finite, got {factor}"
            )));
        }
        Ok(Self {
            scale: self.scale * factor,
            ..self
        })
    }

    /// Returns a transform with the scale replaced.
    ///
    /// Used by the fit action and explicit zoom presets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `scale` is not strictly
    /// positive and finite.
    pub fn with_scale(self, scale: f64) -> Result<Self> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(Error::InvalidArgument(format!(
                "scale must be positive and finite, got {scale}"
            )));
        }
        Ok(Self { scale, ..self })
    }

    /// Returns a transform rotated 90 degrees in the given direction.
    #[must_use]
    pub fn rotated(self, direction: RotationDirection) -> Self {
        let step = match direction {
            RotationDirection::Clockwise => 90,
            RotationDirection::CounterClockwise => -90,
        };
        Self {
            rotation_degrees: normalize_degrees(self.rotation_degrees + step),
            ..self
        }
    }

    /// Returns a transform with the given mirror axis toggled.
    #[must_use]
    pub fn flipped(self, axis: FlipAxis) -> Self {
        match axis {
            FlipAxis::Horizontal => Self {
                hflip: !self.hflip,
                ..self
            },
            FlipAxis::Vertical => Self {
                vflip: !self.vflip,
                ..self
            },
        }
    }

    /// Returns a transform with the window/level replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `width` is not strictly
    /// positive. The receiver is unchanged on error.
    pub fn with_window_level(self, width: f64, center: f64) -> Result<Self> {
        let window = WindowLevel::new(width, center)?;
        Ok(Self { window, ..self })
    }

    /// Returns a transform with color inversion toggled.
    #[must_use]
    pub fn inverted(self) -> Self {
        Self {
            invert: !self.invert,
            ..self
        }
    }
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self::baseline(WindowLevel::default())
    }
}
