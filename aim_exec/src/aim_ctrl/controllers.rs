//! # Aiming controllers module
//!
//! This module provides the PD controllers used for AimCtrl, one for each gimbal axis.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
use comms_if::eqpt::aim::VelocityCmd;
use crate::frame_tf::EulerZyx;

use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PD controller driven once per detection.
///
/// Detections arrive at an uneven rate and the derivative is taken per event rather than per
/// unit time, so no time is tracked.
#[derive(Debug, Serialize, Clone, Default)]
pub struct PdController {
    /// Proportional gain
    k_p: f64,

    /// Derivative gain
    k_d: f64,

    /// Setpoint the measurement is compared against
    center: f64,

    /// Previous error, `None` before the first measurement
    prev_error: Option<f64>,
}

/// The aiming controllers
#[derive(Debug, Serialize, Clone, Default)]
pub struct AimControllers {
    /// Yaw error controller, gains `z_kp`/`z_kd` and centre `center_x`
    yaw_ctrl: PdController,

    /// Pitch error controller, gains `y_kp`/`y_kd` and centre `center_y`
    pitch_ctrl: PdController,
}

/// Errors and outputs of one pass through the controllers.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct CtrlOutput {
    pub yaw_error: f64,

    pub pitch_error: f64,

    pub cmd: VelocityCmd,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PdController {

    /// Create a new controller with the given gains and setpoint.
    pub fn new(k_p: f64, k_d: f64, center: f64) -> Self {
        Self {
            k_p, k_d, center,
            prev_error: None
        }
    }

    /// Replace the gains and setpoint, keeping the previous error.
    pub fn set_gains(&mut self, k_p: f64, k_d: f64, center: f64) {
        self.k_p = k_p;
        self.k_d = k_d;
        self.center = center;
    }

    /// Error between a measurement and the setpoint.
    pub fn error(&self, measured: f64) -> f64 {
        measured - self.center
    }

    /// Get the value of the controller for the given measurement.
    ///
    /// Returns the error along with the output. With no previous error the derivative is zero.
    pub fn get(&mut self, measured: f64) -> (f64, f64) {
        let error = self.error(measured);

        let deriv = match self.prev_error {
            Some(e) => error - e,
            None => 0f64
        };

        let out = self.k_p * error + self.k_d * deriv;

        self.prev_error = Some(error);

        (error, out)
    }

    pub fn prev_error(&self) -> Option<f64> {
        self.prev_error
    }
}

impl AimControllers {

    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &Params) -> Self {
        Self {
            yaw_ctrl: PdController::new(params.z_kp, params.z_kd, params.center_x),
            pitch_ctrl: PdController::new(params.y_kp, params.y_kd, params.center_y)
        }
    }

    /// Apply new parameters without losing the previous errors.
    pub fn set_params(&mut self, params: &Params) {
        self.yaw_ctrl.set_gains(params.z_kp, params.z_kd, params.center_x);
        self.pitch_ctrl.set_gains(params.y_kp, params.y_kd, params.center_y);
    }

    /// Run both controllers on the pointing angles.
    pub fn get_velocity_cmd(&mut self, angles: &EulerZyx) -> CtrlOutput {
        let (yaw_error, angular_yaw) = self.yaw_ctrl.get(angles.yaw_rad);
        let (pitch_error, angular_pitch) = self.pitch_ctrl.get(angles.pitch_rad);

        CtrlOutput {
            yaw_error,
            pitch_error,
            cmd: VelocityCmd {
                angular_yaw,
                angular_pitch
            }
        }
    }

    pub fn yaw(&self) -> &PdController {
        &self.yaw_ctrl
    }

    pub fn pitch(&self) -> &PdController {
        &self.pitch_ctrl
    }
}

// -----------------------------------------------------------------------------------------------
// TESTS
// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_first_call_is_proportional() {
        let mut ctrl = PdController::new(2.0, 5.0, 1.0);

        let (error, out) = ctrl.get(4.0);

        assert_eq!(error, 3.0);
        assert_eq!(out, 6.0);
        assert_eq!(ctrl.prev_error(), Some(3.0));
    }

    #[test]
    fn test_derivative() {
        let mut ctrl = PdController::new(2.0, 5.0, 0.0);

        ctrl.get(1.0);
        let (_, out) = ctrl.get(1.5);

        assert_eq!(out, 2.0 * 1.5 + 5.0 * 0.5);

        // No change in error, no derivative
        let (_, out) = ctrl.get(1.5);
        assert_eq!(out, 2.0 * 1.5);
    }

    #[test]
    fn test_set_gains_keeps_prev_error() {
        let mut ctrl = PdController::new(1.0, 1.0, 0.0);
        ctrl.get(2.0);

        ctrl.set_gains(0.0, 3.0, 0.0);
        let (_, out) = ctrl.get(3.0);

        assert_eq!(out, 3.0);
    }

    #[test]
    fn test_axis_mapping() {
        let params = Params {
            y_kp: 1.0,
            z_kp: 10.0,
            center_x: 0.5,
            center_y: 0.25,
            ..Default::default()
        };
        let mut ctrls = AimControllers::new(&params);

        let out = ctrls.get_velocity_cmd(&EulerZyx {
            yaw_rad: 1.0,
            pitch_rad: 1.0,
            roll_rad: 0.0
        });

        assert_eq!(out.yaw_error, 0.5);
        assert_eq!(out.pitch_error, 0.75);
        assert_eq!(out.cmd.angular_yaw, 5.0);
        assert_eq!(out.cmd.angular_pitch, 0.75);
    }
}
