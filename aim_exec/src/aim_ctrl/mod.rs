//! # Aim control module
//!
//! Turns target detections into gimbal velocity commands. AimCtrl holds the orientation history
//! and the yaw and pitch controllers, and is driven one event at a time:
//!
//! - An orientation event is appended to the history.
//! - A detection event synchronises the history to the detection, composes the rotation made
//!   since the image was captured, transforms the target into the gimbal frame and runs the
//!   controllers.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::*;
pub use state::*;

use crate::calib;
use util::params::LoadError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during AimCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum AimCtrlError {
    #[error("AimCtrl has not been initialised")]
    NotInit,

    #[error("Could not load the AimCtrl parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Could not load the calibration profiles: {0}")]
    CalibLoadError(LoadError),

    #[error("Invalid calibration: {0}")]
    CalibError(calib::CalibError),
}
