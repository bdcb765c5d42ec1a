//! # Time synchronisation
//!
//! Aligns the orientation history with the capture time of a detection. After synchronisation the
//! history starts at the last attitude sampled before the image was captured and runs up to the
//! latest attitude, which is exactly the window whose rotation must be compensated.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;

use crate::orient_hist::OrientationHistory;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which fallback, if any, was used to pick the rotation baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncFallback {
    /// The baseline is the last sample before the detection.
    None,

    /// The detection is older than every retained sample, the earliest sample is the baseline.
    DetectionOlderThanHistory,

    /// No sample is at or after the detection, the whole retained window is used with the
    /// earliest sample as the baseline.
    NoSampleAfterDetection,
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Outcome of synchronising the history with a detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SyncReport {
    /// Index of the first sample at or after the detection, before pruning.
    pub boundary: Option<usize>,

    /// Number of samples removed from the history.
    pub num_pruned: usize,

    /// Number of samples left in the history.
    pub window_len: usize,

    pub fallback: SyncFallback,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Prune the history so that it covers the window from `det_timestamp` to now.
///
/// One sample strictly before the boundary is retained as the baseline, along with every sample
/// from the boundary onward.
pub fn sync_to_detection(
    history: &mut OrientationHistory,
    det_timestamp: DateTime<Utc>
) -> SyncReport {
    let boundary = history.find_boundary(det_timestamp);

    let (num_pruned, fallback) = match boundary {
        Some(0) => {
            warn!(
                "Detection at {} is older than the orientation history (earliest sample at {}), \
                using the earliest sample as the baseline",
                det_timestamp,
                history.earliest().timestamp()
            );
            (0, SyncFallback::DetectionOlderThanHistory)
        },
        Some(start_index) => (history.prune_before(start_index - 1), SyncFallback::None),
        None => {
            warn!(
                "No orientation sample at or after detection at {} (latest sample at {}), \
                using the full retained window of {} samples",
                det_timestamp,
                history.latest().timestamp(),
                history.len()
            );
            (0, SyncFallback::NoSampleAfterDetection)
        }
    };

    SyncReport {
        boundary,
        num_pruned,
        window_len: history.len(),
        fallback,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::orient_hist::OrientationSample;
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
    fn test_keeps_one_sample_before_boundary() {
        let mut hist = history_at(&[0, 10, 20, 30, 40]);

        let report = sync_to_detection(&mut hist, t(25));

        assert_eq!(report.boundary, Some(3));
        assert_eq!(report.num_pruned, 2);
        assert_eq!(report.window_len, 3);
        assert_eq!(report.fallback, SyncFallback::None);
        assert_eq!(hist.earliest().timestamp(), t(20));
        assert_eq!(hist.latest().timestamp(), t(40));
    }

    #[test]
    fn test_exact_timestamp_match() {
        let mut hist = history_at(&[0, 10, 20, 30]);

        let report = sync_to_detection(&mut hist, t(20));

        assert_eq!(report.boundary, Some(2));
        assert_eq!(hist.earliest().timestamp(), t(10));
        assert_eq!(hist.len(), 3);
    }

    #[test]
    fn test_detection_older_than_history() {
        let mut hist = history_at(&[100, 110, 120]);

        let report = sync_to_detection(&mut hist, t(50));

        assert_eq!(report.fallback, SyncFallback::DetectionOlderThanHistory);
        assert_eq!(report.num_pruned, 0);
        assert_eq!(hist.len(), 3);
    }

    #[test]
    fn test_no_sample_after_detection() {
        let mut hist = history_at(&[0, 10, 20]);

        let report = sync_to_detection(&mut hist, t(500));

        assert_eq!(report.boundary, None);
        assert_eq!(report.fallback, SyncFallback::NoSampleAfterDetection);
        assert_eq!(report.window_len, 3);
        assert_eq!(hist.earliest().timestamp(), t(0));
    }

    #[test]
    fn test_repeated_sync_is_stable() {
        let mut hist = history_at(&[0, 10, 20, 30]);

        sync_to_detection(&mut hist, t(25));
        let report = sync_to_detection(&mut hist, t(25));

        // Baseline already at index 0 so nothing more is removed
        assert_eq!(report.num_pruned, 0);
        assert_eq!(hist.len(), 2);
    }
}
