//! # Orientation history
//!
//! An ordered store of the gimbal attitudes reported by the IMU. Detections are imaged some time
//! before they reach the controller, the history keeps enough attitude samples to work out how
//! far the gimbal has turned since.
//!
//! The history is never empty: it is seeded with an identity attitude on creation and no
//! operation can remove the final sample.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::collections::VecDeque;
use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use comms_if::eqpt::imu::ImuSample;
use log::trace;
use nalgebra::{Quaternion, UnitQuaternion};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Quaternions with a norm below this are rejected rather than normalised.
const MIN_QUAT_NORM: f64 = 1e-9;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A timestamped attitude of the gimbal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    timestamp: DateTime<Utc>,

    attitude: UnitQuaternion<f64>,
}

/// Time ordered history of orientation samples.
#[derive(Debug, Clone)]
pub struct OrientationHistory {
    samples: VecDeque<OrientationSample>,

    /// Maximum number of samples held, the oldest sample is dropped when exceeded.
    max_len: usize,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons an IMU sample can't be turned into an orientation.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SampleError {
    #[error("The attitude quaternion {0:?} contains non-finite values")]
    NonFinite([f64; 4]),

    #[error("The attitude quaternion {0:?} is too close to zero to be normalised")]
    ZeroNorm([f64; 4]),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OrientationSample {
    pub fn new(timestamp: DateTime<Utc>, attitude: UnitQuaternion<f64>) -> Self {
        Self {
            timestamp,
            attitude,
        }
    }

    /// A sample with no rotation at the given time.
    pub fn identity(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, UnitQuaternion::identity())
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn attitude(&self) -> &UnitQuaternion<f64> {
        &self.attitude
    }
}

impl TryFrom<&ImuSample> for OrientationSample {
    type Error = SampleError;

    fn try_from(sample: &ImuSample) -> Result<Self, Self::Error> {
        let [w, x, y, z] = sample.quaternion;

        if !sample.quaternion.iter().all(|c| c.is_finite()) {
            return Err(SampleError::NonFinite(sample.quaternion));
        }

        let quat = Quaternion::new(w, x, y, z);
        if quat.norm() < MIN_QUAT_NORM {
            return Err(SampleError::ZeroNorm(sample.quaternion));
        }

        Ok(Self::new(sample.timestamp, UnitQuaternion::from_quaternion(quat)))
    }
}

impl OrientationHistory {
    /// Create a new history containing only `seed`.
    ///
    /// A `max_len` of zero is treated as one.
    pub fn new(seed: OrientationSample, max_len: usize) -> Self {
        let mut samples = VecDeque::new();
        samples.push_back(seed);

        Self {
            samples,
            max_len: max_len.max(1),
        }
    }

    /// Number of samples in the history, always at least one.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrientationSample> {
        self.samples.iter()
    }

    pub fn get(&self, index: usize) -> Option<&OrientationSample> {
        self.samples.get(index)
    }

    /// The oldest retained sample.
    pub fn earliest(&self) -> &OrientationSample {
        &self.samples[0]
    }

    /// The most recent sample.
    pub fn latest(&self) -> &OrientationSample {
        &self.samples[self.samples.len() - 1]
    }

    /// Change the capacity, dropping the oldest samples if the history is now too long.
    pub fn set_max_len(&mut self, max_len: usize) {
        self.max_len = max_len.max(1);
        self.enforce_max_len();
    }

    /// Add a sample to the end of the history.
    ///
    /// The caller must ensure samples are appended in timestamp order, this is not checked.
    pub fn append(&mut self, sample: OrientationSample) {
        self.samples.push_back(sample);
        self.enforce_max_len();

        trace!("Orientation history length: {}", self.samples.len());
    }

    /// Find the index of the first sample whose timestamp is at or after `timestamp`.
    ///
    /// Returns `None` if every sample is older than `timestamp`.
    pub fn find_boundary(&self, timestamp: DateTime<Utc>) -> Option<usize> {
        self.samples.iter().position(|s| s.timestamp >= timestamp)
    }

    /// Remove all samples before `index`, returning the number removed.
    ///
    /// If `index` is at or past the end of the history the latest sample is kept.
    pub fn prune_before(&mut self, index: usize) -> usize {
        let num_pruned = index.min(self.samples.len() - 1);

        self.samples.drain(..num_pruned);

        num_pruned
    }

    fn enforce_max_len(&mut self) {
        while self.samples.len() > self.max_len {
            self.samples.pop_front();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    fn t(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn history_at(times_ms: &[i64]) -> OrientationHistory {
        let mut hist = OrientationHistory::new(OrientationSample::identity(t(times_ms[0])), 100);
        for &ms in &times_ms[1..] {
            hist.append(OrientationSample::identity(t(ms)));
        }
        hist
    }

    #[test]
    fn test_find_boundary() {
        let hist = history_at(&[0, 10, 20, 30]);

        assert_eq!(hist.find_boundary(t(-5)), Some(0));
        assert_eq!(hist.find_boundary(t(0)), Some(0));
        assert_eq!(hist.find_boundary(t(15)), Some(2));
        assert_eq!(hist.find_boundary(t(30)), Some(3));
        assert_eq!(hist.find_boundary(t(31)), None);
    }

    #[test]
    fn test_prune_never_empties() {
        for index in 0..10 {
            let mut hist = history_at(&[0, 10, 20, 30]);
            let pruned = hist.prune_before(index);

            assert!(hist.len() >= 1);
            assert_eq!(pruned + hist.len(), 4);
        }

        let mut hist = history_at(&[0, 10, 20, 30]);
        assert_eq!(hist.prune_before(100), 3);
        assert_eq!(hist.latest().timestamp(), t(30));
        assert_eq!(hist.prune_before(100), 0);
        assert_eq!(hist.len(), 1);
    }

    #[test]
    fn test_prune_keeps_order() {
        let mut hist = history_at(&[0, 10, 20, 30]);

        assert_eq!(hist.prune_before(2), 2);
        assert_eq!(hist.earliest().timestamp(), t(20));
        assert_eq!(hist.latest().timestamp(), t(30));
    }

    #[test]
    fn test_max_len() {
        let mut hist = OrientationHistory::new(OrientationSample::identity(t(0)), 3);
        for ms in 1..10 {
            hist.append(OrientationSample::identity(t(ms)));
        }

        assert_eq!(hist.len(), 3);
        assert_eq!(hist.earliest().timestamp(), t(7));

        hist.set_max_len(0);
        assert_eq!(hist.len(), 1);
        assert_eq!(hist.latest().timestamp(), t(9));
    }

    #[test]
    fn test_sample_from_imu() {
        let imu = ImuSample {
            timestamp: t(5),
            quaternion: [2.0, 0.0, 0.0, 0.0],
        };
        let sample = OrientationSample::try_from(&imu).unwrap();
        assert_eq!(sample.attitude().scalar(), 1.0);

        let zero = ImuSample {
            timestamp: t(5),
            quaternion: [0.0; 4],
        };
        assert_eq!(
            OrientationSample::try_from(&zero),
            Err(SampleError::ZeroNorm([0.0; 4]))
        );

        let nan = ImuSample {
            timestamp: t(5),
            quaternion: [1.0, std::f64::NAN, 0.0, 0.0],
        };
        assert!(matches!(
            OrientationSample::try_from(&nan),
            Err(SampleError::NonFinite(_))
        ));
    }
}
