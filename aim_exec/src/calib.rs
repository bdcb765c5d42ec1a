//! # Calibration profiles
//!
//! Mechanical calibration of the camera relative to the gimbal's rotation centre. Each robot
//! variant mounts its camera differently, so the constants are grouped into named profiles in
//! `calib.toml` and one profile is selected when the executable starts.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::BTreeMap;

use nalgebra::{Matrix3, Vector3};
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Maps the camera optical axes onto the robot axes: optical z (forward) becomes robot x, optical
/// x (right) becomes robot -y and optical y becomes robot z. Rows are given in row-major order.
///
/// The determinant is -1, so downstream code must not assume a proper rotation.
pub const OPTICAL_TO_ROBOT: [[f64; 3]; 3] = [
    [0.0, 0.0, 1.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
];

/// Tolerance used when checking that a remap matrix is orthonormal.
const REMAP_TOLERANCE: f64 = 1e-6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The contents of `calib.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CalibParams {
    /// Name of the profile used unless another is requested on the command line.
    pub profile: String,

    pub profiles: BTreeMap<String, CalibProfileParams>,
}

/// A profile as written in the parameter file.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CalibProfileParams {
    /// Vector from the camera to the gimbal rotation centre, in the robot frame.
    ///
    /// Units: millimeters, the same as the detector's target positions.
    pub offset_mm: [f64; 3],

    /// Camera axis to robot axis remap, row-major.
    #[serde(default = "default_remap")]
    pub remap: [[f64; 3]; 3],
}

/// A validated calibration profile.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibProfile {
    pub name: String,

    pub offset_mm: Vector3<f64>,

    pub remap: Matrix3<f64>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum CalibError {
    #[error("No calibration profile named \"{0}\", available profiles are {1:?}")]
    UnknownProfile(String, Vec<String>),

    #[error("The remap matrix of profile \"{0}\" is not orthonormal: {1}")]
    RemapNotOrthonormal(String, Matrix3<f64>),

    #[error("The offset of profile \"{0}\" is not finite: {1:?}")]
    NonFiniteOffset(String, [f64; 3]),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CalibParams {
    /// Select a profile, `name` overrides the file's default profile if given.
    pub fn select(&self, name: Option<&str>) -> Result<CalibProfile, CalibError> {
        let name = name.unwrap_or(&self.profile);

        match self.profiles.get(name) {
            Some(p) => CalibProfile::from_params(name, p),
            None => Err(CalibError::UnknownProfile(
                name.to_string(),
                self.profiles.keys().cloned().collect()
            ))
        }
    }
}

impl CalibProfile {
    /// Build and validate a profile.
    pub fn from_params(name: &str, params: &CalibProfileParams) -> Result<Self, CalibError> {
        if !params.offset_mm.iter().all(|v| v.is_finite()) {
            return Err(CalibError::NonFiniteOffset(name.to_string(), params.offset_mm));
        }

        let r = &params.remap;
        let remap = Matrix3::new(
            r[0][0], r[0][1], r[0][2],
            r[1][0], r[1][1], r[1][2],
            r[2][0], r[2][1], r[2][2],
        );

        // Scaling or shear would distort the direction to the target
        if (remap.transpose() * remap - Matrix3::identity()).norm() > REMAP_TOLERANCE {
            return Err(CalibError::RemapNotOrthonormal(name.to_string(), remap));
        }

        Ok(Self {
            name: name.to_string(),
            offset_mm: Vector3::from(params.offset_mm),
            remap,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn default_remap() -> [[f64; 3]; 3] {
    OPTICAL_TO_ROBOT
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
