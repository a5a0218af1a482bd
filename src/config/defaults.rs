// SPDX-License-Identifier: MPL-2.0
//! Centralized default values for all configuration constants.
//!
//! This module serves as the single source of truth for default values
//! used across the viewer core. Constants are organized by category.
//!
//! # Categories
//!
//! - **Window/Level**: default contrast-mapping parameters
//! - **Zoom**: toolbar zoom step factors
//! - **Cine**: playback frame-rate bounds

// ==========================================================================
// Window/Level Defaults
// ==========================================================================

/// Default window width applied at reset (soft-tissue preset).
pub const DEFAULT_WINDOW_WIDTH: f64 = 400.0;

/// Default window center applied at reset.
pub const DEFAULT_WINDOW_CENTER: f64 = 40.0;

// ==========================================================================
// Zoom Defaults
// ==========================================================================

/// Multiplier applied to the current scale on a toolbar zoom-in.
pub const ZOOM_IN_FACTOR: f64 = 1.2;

/// Multiplier applied to the current scale on a toolbar zoom-out.
pub const ZOOM_OUT_FACTOR: f64 = 0.8;

/// Scale used by the fit action.
pub const FIT_SCALE: f64 = 1.0;

// ==========================================================================
// Cine Defaults
// ==========================================================================

/// Default cine playback rate in frames per second.
pub const DEFAULT_CINE_RATE_HZ: f64 = 10.0;

/// Minimum allowed cine playback rate.
pub const MIN_CINE_RATE_HZ: f64 = 1.0;

/// Maximum allowed cine playback rate.
pub const MAX_CINE_RATE_HZ: f64 = 30.0;

// ==========================================================================
// Compile-time Validation
// ==========================================================================

const _: () = {
    // Window/level validation
    assert!(DEFAULT_WINDOW_WIDTH > 0.0);

    // Zoom validation
    assert!(ZOOM_IN_FACTOR > 1.0);
    assert!(ZOOM_OUT_FACTOR > 0.0);
    assert!(ZOOM_OUT_FACTOR < 1.0);
    assert!(FIT_SCALE > 0.0);

    // Cine validation
    assert!(MIN_CINE_RATE_HZ > 0.0);
    assert!(MAX_CINE_RATE_HZ > MIN_CINE_RATE_HZ);
    assert!(DEFAULT_CINE_RATE_HZ >= MIN_CINE_RATE_HZ);
    assert!(DEFAULT_CINE_RATE_HZ <= MAX_CINE_RATE_HZ);
};
