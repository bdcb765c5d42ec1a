//! Implementations for the AimCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{AimControllers, AimCtrlError, Params};
use comms_if::eqpt::aim::VelocityCmd;
use crate::{
    calib::{CalibParams, CalibProfile},
    frame_tf::{self, EulerZyx, TargetDetection},
    orient_hist::{OrientationHistory, OrientationSample},
    rot_comp,
    time_sync::{self, SyncFallback}
};
use util::{
    params,
    module::State,
    session::Session,
    time::duration_to_seconds};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Aim control module state
pub struct AimCtrl {

    pub(crate) params: Params,

    /// Selected calibration profile, `None` until initialised
    pub(crate) calib: Option<CalibProfile>,

    pub(crate) history: OrientationHistory,

    pub(crate) controllers: AimControllers,

    pub(crate) report: StatusReport,
}

/// Data required to initialise AimCtrl.
#[derive(Debug, Clone)]
pub struct InitData {
    /// Parameter file for the controllers, relative to the params directory
    pub params_file: String,

    /// Calibration profile file, relative to the params directory
    pub calib_file: String,

    /// Profile to use instead of the file's default
    pub profile: Option<String>,
}

/// A single event handled by AimCtrl.
#[derive(Debug, Clone, Copy)]
pub enum AimEvent {
    /// A new gimbal attitude, appended to the history.
    Orientation(OrientationSample),

    /// A new detection, produces a velocity command.
    Detection(TargetDetection),
}

/// Status report for AimCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// True if the detection was degenerate and the zero command was produced
    pub degenerate: bool,

    pub yaw_error: f64,

    pub pitch_error: f64,

    /// Euler angles of the target rotation
    pub angles: EulerZyx,

    /// Length of the orientation history after processing
    pub window_len: usize,

    /// Number of orientation samples pruned by the synchronisation
    pub num_pruned: usize,

    /// Fallback used during synchronisation, `None` if no detection was synchronised
    pub sync_fallback: Option<SyncFallback>,

    /// Time between the image capture and the processing of the detection
    ///
    /// Units: seconds
    pub latency_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl AimCtrl {
    /// Create an initialised instance from parameters and a calibration profile.
    pub fn new(params: Params, calib: CalibProfile) -> Self {
        let mut ctrl = Self::default();
        ctrl.set_params(params);
        ctrl.calib = Some(calib);
        ctrl
    }

    /// Replace the parameters.
    ///
    /// The previous errors of the controllers are kept, so the derivative term stays continuous
    /// across a change of gains.
    pub fn set_params(&mut self, params: Params) {
        self.controllers.set_params(&params);
        self.history.set_max_len(params.max_history_len);
        self.params = params;
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn history(&self) -> &OrientationHistory {
        &self.history
    }

    pub fn controllers(&self) -> &AimControllers {
        &self.controllers
    }

    /// Compute the command for a detection.
    fn proc_detection(
        &mut self,
        det: &TargetDetection
    ) -> Result<VelocityCmd, AimCtrlError> {
        let calib = self.calib.as_ref().ok_or(AimCtrlError::NotInit)?;

        // Degenerate detections leave the history and the controllers untouched
        if !det.is_valid() {
            debug!("Degenerate detection at {}, holding the gimbal", det.timestamp());
            self.report.degenerate = true;
            return Ok(VelocityCmd::zero());
        }

        if let Some(latency_s) = duration_to_seconds(
            Utc::now().signed_duration_since(det.timestamp())
        ) {
            self.report.latency_s = latency_s;
        }

        let sync = time_sync::sync_to_detection(&mut self.history, det.timestamp());
        self.report.num_pruned = sync.num_pruned;
        self.report.sync_fallback = Some(sync.fallback);

        let net_quat = rot_comp::compose_net_quaternion(&self.history);
        let q = net_quat.quaternion();
        debug!(
            "Net rotation over {} samples: [{:.6}, {:.6}, {:.6}, {:.6}]",
            sync.window_len, q.w, q.i, q.j, q.k
        );
        let net_rotation = *net_quat.to_rotation_matrix().matrix();

        let pointing = match frame_tf::pointing_error(det, calib, &net_rotation) {
            Some(p) => p,
            None => {
                self.report.degenerate = true;
                return Ok(VelocityCmd::zero())
            }
        };

        debug!(
            "Target in gimbal frame: [{:.3}, {:.3}, {:.3}]",
            pointing.target_gimbal[0], pointing.target_gimbal[1], pointing.target_gimbal[2]
        );
        debug!(
            "Target euler angles zyx: [{:.6}, {:.6}, {:.6}]",
            pointing.angles.yaw_rad, pointing.angles.pitch_rad, pointing.angles.roll_rad
        );

        let out = self.controllers.get_velocity_cmd(&pointing.angles);

        self.report.angles = pointing.angles;
        self.report.yaw_error = out.yaw_error;
        self.report.pitch_error = out.pitch_error;

        Ok(out.cmd)
    }
}

impl Default for AimCtrl {
    fn default() -> Self {
        let params = Params::default();

        Self {
            history: OrientationHistory::new(
                OrientationSample::identity(Utc::now()),
                params.max_history_len
            ),
            controllers: AimControllers::new(&params),
            calib: None,
            report: StatusReport::default(),
            params,
        }
    }
}

impl State for AimCtrl {
    type InitData = InitData;
    type InitError = AimCtrlError;

    type InputData = AimEvent;
    type OutputData = Option<VelocityCmd>;
    type StatusReport = StatusReport;
    type ProcError = AimCtrlError;

    /// Initialise the AimCtrl module.
    ///
    /// A missing controller parameter file is not an error, the defaults are used. The
    /// calibration file is required.
    fn init(&mut self, init_data: Self::InitData, _session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        let params = match params::load(&init_data.params_file) {
            Ok(p) => p,
            Err(e) if e.is_not_found() => {
                warn!(
                    "No AimCtrl parameter file found at {}, using the defaults",
                    init_data.params_file
                );
                Params::default()
            },
            Err(e) => return Err(AimCtrlError::ParamLoadError(e))
        };

        // Select the calibration profile
        let calib_params: CalibParams = params::load(&init_data.calib_file)
            .map_err(AimCtrlError::CalibLoadError)?;
        let calib = calib_params.select(init_data.profile.as_deref())
            .map_err(AimCtrlError::CalibError)?;

        info!(
            "AimCtrl using calibration profile \"{}\" (offset {:?} mm)",
            calib.name,
            calib.offset_mm.as_slice()
        );
        info!("AimCtrl parameters: {:?}", params);

        self.set_params(params);
        self.calib = Some(calib);

        Ok(())
    }

    /// Process a single event.
    ///
    /// Orientation events produce no command, detection events always produce one.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        let output = match input_data {
            AimEvent::Orientation(sample) => {
                self.history.append(*sample);
                None
            },
            AimEvent::Detection(det) => Some(self.proc_detection(det)?)
        };

        self.report.window_len = self.history.len();

        Ok((output, self.report))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
