//! Parameters structure for AimCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Yaw setpoint used when `center_x` is not given.
pub const DEFAULT_CENTER_X: f64 = 400.0;

/// Pitch setpoint used when `center_y` is not given.
pub const DEFAULT_CENTER_Y: f64 = 300.0;

/// History capacity used when `max_history_len` is not given.
pub const DEFAULT_MAX_HISTORY_LEN: usize = 2000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Aim control.
///
/// Any key missing from `aim_ctrl.toml` takes its default value.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Params {

    // ---- PITCH ----

    /// Proportional gain of the pitch controller
    pub y_kp: f64,

    /// Derivative gain of the pitch controller
    pub y_kd: f64,

    /// Pitch setpoint
    pub center_y: f64,

    // ---- YAW ----

    /// Proportional gain of the yaw controller
    pub z_kp: f64,

    /// Derivative gain of the yaw controller
    pub z_kd: f64,

    /// Yaw setpoint
    pub center_x: f64,

    // ---- HISTORY ----

    /// Maximum number of orientation samples held between detections
    pub max_history_len: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            y_kp: 0.0,
            y_kd: 0.0,
            center_y: DEFAULT_CENTER_Y,
            z_kp: 0.0,
            z_kd: 0.0,
            center_x: DEFAULT_CENTER_X,
            max_history_len: DEFAULT_MAX_HISTORY_LEN,
        }
    }
}
