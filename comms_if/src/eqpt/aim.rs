//! # Aiming Communications Module
//!
//! Target detections coming from the vision pipeline and the gimbal velocity commands produced
//! from them.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_nanoseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The position of a detected armor plate, as published by the detector.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ArmorDetection {
    /// UTC timestamp at which the image containing the target was captured
    #[serde(with = "ts_nanoseconds")]
    pub timestamp: DateTime<Utc>,

    /// Position of the target in the camera's optical frame, `[x, y, z]`.
    ///
    /// A near-zero `x` means nothing was detected in the image.
    pub position: [f64; 3],
}

/// Angular velocity demand for the gimbal.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct VelocityCmd {
    /// Rate about the gimbal's yaw (vertical) axis
    pub angular_yaw: f64,

    /// Rate about the gimbal's pitch axis
    pub angular_pitch: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VelocityCmd {
    /// The command which holds the gimbal still.
    pub fn zero() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_cmd() {
        let cmd = VelocityCmd::zero();

        assert_eq!(cmd.angular_yaw, 0.0);
        assert_eq!(cmd.angular_pitch, 0.0);
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"angular_yaw":0.0,"angular_pitch":0.0}"#
        );
    }
}
