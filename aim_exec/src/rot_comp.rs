//! # Rotation composition
//!
//! Chains the relative rotation between each pair of neighbouring samples in the (synchronised)
//! orientation history, giving the net rotation of the gimbal between the detection's baseline
//! attitude and its latest attitude.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::{Matrix3, UnitQuaternion};

use crate::orient_hist::OrientationHistory;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Compose the net rotation across the history as a quaternion.
///
/// Each leg is `q_i^-1 * q_(i+1)`, multiplied onto the accumulator earliest leg first. A history
/// of one sample gives the identity.
pub fn compose_net_quaternion(history: &OrientationHistory) -> UnitQuaternion<f64> {
    let net = history.iter()
        .zip(history.iter().skip(1))
        .fold(UnitQuaternion::identity(), |acc, (prev, next)| {
            acc * (prev.attitude().inverse() * next.attitude())
        });

    // Long windows accumulate rounding error in the norm
    UnitQuaternion::new_normalize(*net.quaternion())
}

/// Compose the net rotation across the history as a rotation matrix.
pub fn compose_net_rotation(history: &OrientationHistory) -> Matrix3<f64> {
    *compose_net_quaternion(history).to_rotation_matrix().matrix()
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::orient_hist::OrientationSample;
    use chrono::{DateTime, TimeZone, Utc};
    use nalgebra::Vector3;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn history_of(attitudes: &[UnitQuaternion<f64>]) -> OrientationHistory {
        let mut hist = OrientationHistory::new(OrientationSample::new(t(0), attitudes[0]), 1000);
        for (i, q) in attitudes.iter().enumerate().skip(1) {
            hist.append(OrientationSample::new(t(i as i64), *q));
        }
        hist
    }

    fn turn(roll: f64, pitch: f64, yaw: f64) -> UnitQuaternion<f64> {
        UnitQuaternion::from_euler_angles(roll, pitch, yaw)
    }

    #[test]
    fn test_identical_samples_give_identity() {
        let q = turn(0.3, -0.2, 1.1);

        for len in 1..20 {
            let hist = history_of(&vec![q; len]);
            let rot = compose_net_rotation(&hist);

            assert!(
                (rot - Matrix3::identity()).norm() < 1e-12,
                "Window of {} samples gave {}", len, rot
            );
        }
    }

    #[test]
    fn test_single_sample_is_identity() {
        let hist = history_of(&[turn(1.0, 0.5, -0.5)]);

        assert!((compose_net_rotation(&hist) - Matrix3::identity()).norm() < 1e-12);
    }

    #[test]
    fn test_resampled_window_matches() {
        let start = turn(0.1, 0.2, 0.3);
        let end = turn(-0.4, 0.1, 1.2);

        let fine = history_of(&[
            start,
            turn(0.0, 0.2, 0.5),
            turn(-0.1, 0.25, 0.7),
            turn(-0.2, 0.2, 0.9),
            turn(-0.3, 0.15, 1.0),
            end,
        ]);
        let coarse = history_of(&[start, turn(2.0, -1.0, 0.0), end]);

        let fine_rot = compose_net_rotation(&fine);
        let coarse_rot = compose_net_rotation(&coarse);

        assert!((fine_rot - coarse_rot).norm() < 1e-9);

        // Both must equal the single leg from start to end
        let direct = *(start.inverse() * end).to_rotation_matrix().matrix();
        assert!((fine_rot - direct).norm() < 1e-9);
    }

    #[test]
    fn test_pure_yaw_window() {
        let hist = history_of(&[
            turn(0.0, 0.0, 0.0),
            turn(0.0, 0.0, 0.1),
            turn(0.0, 0.0, 0.25),
        ]);

        let rot = compose_net_rotation(&hist);
        let rotated = rot * Vector3::new(1.0, 0.0, 0.0);

        assert!((rotated - Vector3::new(0.25f64.cos(), 0.25f64.sin(), 0.0)).norm() < 1e-12);
    }
}
