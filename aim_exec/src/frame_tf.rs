//! # Frame transformation
//!
//! Converts a detected target position from the camera's optical frame into the gimbal frame,
//! corrects it for the rotation the gimbal made since the image was captured, and derives the
//! yaw and pitch pointing errors.
//!
//! The steps are:
//!
//! 1. Reject detections flagged as "nothing detected".
//! 2. Remap the optical axes onto the robot axes.
//! 3. Add the camera to gimbal centre offset.
//! 4. Apply the net rotation from the orientation history.
//! 5. Find the axis-angle rotation between the forward axis and the target direction.
//! 6. Transpose the rotation matrix and decompose it into ZYX Euler angles.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use comms_if::eqpt::aim::ArmorDetection;
use log::warn;
use nalgebra::{Matrix3, Vector3};
use serde::Serialize;
use util::maths::{clamped_acos, clamped_asin};

use crate::calib::CalibProfile;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Components and magnitudes below this are treated as zero.
pub const DEGENERATE_EPSILON: f64 = std::f64::EPSILON;

/// Cross products shorter than this are considered to have no defined direction.
const AXIS_EPSILON: f64 = 1e-12;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A target detection in the camera's optical frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetDetection {
    timestamp: DateTime<Utc>,

    position: Vector3<f64>,
}

/// Euler angles of a rotation in the ZYX (yaw-pitch-roll) convention.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EulerZyx {
    pub yaw_rad: f64,

    pub pitch_rad: f64,

    /// Computed for completeness, nothing downstream uses it.
    pub roll_rad: f64,
}

/// Result of transforming a valid detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointingError {
    /// Target position in the current gimbal frame.
    pub target_gimbal: Vector3<f64>,

    /// Angles of the transposed target rotation.
    pub angles: EulerZyx,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TargetDetection {
    pub fn new(timestamp: DateTime<Utc>, position: Vector3<f64>) -> Self {
        Self {
            timestamp,
            position
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    /// False if the detector reported nothing.
    ///
    /// The detector marks an empty image with a zero `x` component. A vector of near-zero length
    /// has no direction and is rejected too.
    pub fn is_valid(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.position[0].abs() >= DEGENERATE_EPSILON
            && self.position.norm() >= DEGENERATE_EPSILON
    }
}

impl From<&ArmorDetection> for TargetDetection {
    fn from(det: &ArmorDetection) -> Self {
        Self::new(det.timestamp, Vector3::from(det.position))
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compute the pointing error for a detection.
///
/// Returns `None` if the detection is not valid or the corrected target lies on the gimbal
/// centre, in which case the gimbal should not move.
pub fn pointing_error(
    det: &TargetDetection,
    calib: &CalibProfile,
    net_rotation: &Matrix3<f64>
) -> Option<PointingError> {
    if !det.is_valid() {
        return None;
    }

    let target_gimbal = to_gimbal_frame(det.position(), calib, net_rotation);

    let dist = target_gimbal.norm();
    if dist < DEGENERATE_EPSILON || !dist.is_finite() {
        warn!(
            "Target at {:?} maps onto the gimbal centre ({:?}), ignoring it",
            det.position().as_slice(),
            target_gimbal.as_slice()
        );
        return None;
    }

    let (axis, angle) = forward_to_direction(&(target_gimbal / dist));
    let rotation = axis_angle_matrix(&axis, angle).transpose();

    Some(PointingError {
        target_gimbal,
        angles: euler_zyx(&rotation),
    })
}

/// Move a camera-frame position into the current gimbal frame.
pub fn to_gimbal_frame(
    position: &Vector3<f64>,
    calib: &CalibProfile,
    net_rotation: &Matrix3<f64>
) -> Vector3<f64> {
    net_rotation * (calib.remap * position + calib.offset_mm)
}

/// Axis and angle of the rotation which carries the forward (x) axis onto `direction`.
///
/// `direction` must be a unit vector. When the two are (anti)parallel the cross product has no
/// direction, the z axis is used instead: it is perpendicular to forward, so the angle alone
/// still gives the right rotation.
pub fn forward_to_direction(direction: &Vector3<f64>) -> (Vector3<f64>, f64) {
    let forward = Vector3::x();

    let angle = clamped_acos(forward.dot(direction));

    let cross = forward.cross(direction);
    let cross_norm = cross.norm();
    let axis = if cross_norm < AXIS_EPSILON {
        Vector3::z()
    }
    else {
        cross / cross_norm
    };

    (axis, angle)
}

/// Rotation matrix of `angle` radians about the unit vector `axis`.
pub fn axis_angle_matrix(axis: &Vector3<f64>, angle: f64) -> Matrix3<f64> {
    let (sin, cos) = angle.sin_cos();

    let skew = Matrix3::new(
        0.0, -axis[2], axis[1],
        axis[2], 0.0, -axis[0],
        -axis[1], axis[0], 0.0,
    );

    Matrix3::identity() * cos + axis * axis.transpose() * (1.0 - cos) + skew * sin
}

/// Decompose a rotation matrix into ZYX Euler angles.
///
/// At gimbal lock (pitch of +/- pi/2) yaw and roll are not unique, the values returned still
/// reconstruct the matrix.
pub fn euler_zyx(m: &Matrix3<f64>) -> EulerZyx {
    EulerZyx {
        yaw_rad: m[(1, 0)].atan2(m[(0, 0)]),
        pitch_rad: clamped_asin(-m[(2, 0)]),
        roll_rad: m[(2, 1)].atan2(m[(2, 2)]),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::calib::{CalibProfileParams, OPTICAL_TO_ROBOT};
    use chrono::TimeZone;
    use nalgebra::{Rotation3, Unit, UnitQuaternion};
    use std::f64::consts::{FRAC_PI_2, PI};

    fn calib(offset_mm: [f64; 3]) -> CalibProfile {
        CalibProfile::from_params("test", &CalibProfileParams {
            offset_mm,
            remap: OPTICAL_TO_ROBOT,
        }).unwrap()
    }

    fn det(position: [f64; 3]) -> TargetDetection {
        TargetDetection::new(Utc.timestamp_millis_opt(1000).unwrap(), Vector3::from(position))
    }

    #[test]
    fn test_validity() {
        assert!(det([10.0, 0.0, 500.0]).is_valid());
        assert!(!det([0.0, 0.0, 0.0]).is_valid());
        assert!(!det([0.0, 20.0, 500.0]).is_valid());
        assert!(!det([std::f64::NAN, 0.0, 500.0]).is_valid());
    }

    #[test]
    fn test_degenerate_detection_has_no_error() {
        let rot = Matrix3::identity();

        assert!(pointing_error(&det([0.0, 0.0, 0.0]), &calib([142.0, -45.0, 0.0]), &rot).is_none());
        assert!(pointing_error(&det([1e-20, 0.0, 0.0]), &calib([142.0, -45.0, 0.0]), &rot).is_none());
    }

    #[test]
    fn test_target_on_gimbal_centre() {
        // The offset exactly cancels the remapped position
        let err = pointing_error(
            &det([1.0, 0.0, 0.0]),
            &calib([0.0, 1.0, 0.0]),
            &Matrix3::identity()
        );

        assert!(err.is_none());
    }

    #[test]
    fn test_gimbal_frame() {
        let target = to_gimbal_frame(
            &Vector3::new(1.0, 0.0, 0.0),
            &calib([142.0, -45.0, 0.0]),
            &Matrix3::identity()
        );

        assert_eq!(target, Vector3::new(142.0, -46.0, 0.0));

        // A quarter turn of yaw moves a forward target to the left
        let yaw = *UnitQuaternion::from_euler_angles(0.0, 0.0, FRAC_PI_2)
            .to_rotation_matrix()
            .matrix();
        let target = to_gimbal_frame(&Vector3::new(0.0, 0.0, 100.0), &calib([0.0; 3]), &yaw);

        assert!((target - Vector3::new(0.0, 100.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_forward_target() {
        // Straight ahead in the optical frame with no offset
        let err = pointing_error(
            &det([1e-3, 0.0, 1000.0]),
            &calib([0.0; 3]),
            &Matrix3::identity()
        ).unwrap();

        assert!(err.angles.yaw_rad.abs() < 1e-5);
        assert!(err.angles.pitch_rad.abs() < 1e-5);
        assert!(err.angles.roll_rad.abs() < 1e-5);
    }

    #[test]
    fn test_level_target_angles() {
        let err = pointing_error(
            &det([1.0, 0.0, 0.0]),
            &calib([142.0, -45.0, 0.0]),
            &Matrix3::identity()
        ).unwrap();

        // The target rotation about -z, transposed, is a positive yaw of the target's bearing
        let bearing = 46f64.atan2(142.0);
        assert!((err.angles.yaw_rad - bearing).abs() < 1e-12);
        assert!(err.angles.pitch_rad.abs() < 1e-12);
        assert!(err.angles.roll_rad.abs() < 1e-12);
    }

    #[test]
    fn test_elevated_target_pitch() {
        // Robot frame target straight ahead and 45 degrees up
        let (axis, angle) = forward_to_direction(&Vector3::new(1.0, 0.0, 1.0).normalize());
        let angles = euler_zyx(&axis_angle_matrix(&axis, angle).transpose());

        assert!((angles.pitch_rad - PI / 4.0).abs() < 1e-12);
        assert!(angles.yaw_rad.abs() < 1e-12);
    }

    #[test]
    fn test_parallel_directions_are_guarded() {
        let (axis, angle) = forward_to_direction(&Vector3::x());
        assert_eq!(axis, Vector3::z());
        assert_eq!(angle, 0.0);

        let (axis, angle) = forward_to_direction(&-Vector3::x());
        assert_eq!(axis, Vector3::z());
        assert_eq!(angle, PI);

        // Slightly longer than unit due to rounding, acos must not produce NaN
        let (_, angle) = forward_to_direction(&Vector3::new(1.0 + 1e-15, 0.0, 0.0));
        assert_eq!(angle, 0.0);

        let angles = euler_zyx(&axis_angle_matrix(&Vector3::z(), PI).transpose());
        assert!(!angles.yaw_rad.is_nan() && !angles.pitch_rad.is_nan());
    }

    #[test]
    fn test_axis_angle_matches_nalgebra() {
        let axis = Vector3::new(0.3, -0.5, 0.8).normalize();

        for &angle in &[0.0, 0.1, 1.0, 2.5, PI] {
            let ours = axis_angle_matrix(&axis, angle);
            let theirs = Rotation3::from_axis_angle(&Unit::new_normalize(axis), angle);

            assert!((ours - theirs.matrix()).norm() < 1e-12);
        }
    }

    #[test]
    fn test_euler_round_trip() {
        let axes = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.2, -0.7, 0.4),
            Vector3::new(-1.0, 0.3, 2.0),
        ];
        let angles = [-2.8, -1.2, -0.3, 0.05, 0.7, 1.4, 3.0];

        let mut num_checked = 0;

        for axis in axes.iter() {
            let axis = axis.normalize();

            for &angle in angles.iter() {
                let m = axis_angle_matrix(&axis, angle);
                let e = euler_zyx(&m);

                // Stay away from gimbal lock
                if e.pitch_rad.abs() >= FRAC_PI_2 - 0.01 {
                    continue;
                }

                let rebuilt = Rotation3::from_euler_angles(e.roll_rad, e.pitch_rad, e.yaw_rad);
                assert!(
                    (m - rebuilt.matrix()).norm() < 1e-6,
                    "Round trip failed for axis {:?} angle {}", axis.as_slice(), angle
                );
                num_checked += 1;
            }
        }

        assert!(num_checked > 30);
    }
}
