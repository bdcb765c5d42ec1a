//! # IMU Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_nanoseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An attitude sample published by the gimbal IMU.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// UTC timestamp at which the attitude was measured
    #[serde(with = "ts_nanoseconds")]
    pub timestamp: DateTime<Utc>,

    /// The attitude quaternion, in the order `[w, x, y, z]`.
    ///
    /// The IMU should send a unit quaternion, receivers normalise it anyway.
    pub quaternion: [f64; 4],
}
