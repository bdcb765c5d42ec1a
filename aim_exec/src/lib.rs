//! # Aiming library.
//!
//! This library allows other crates in the workspace to access items defined inside the aiming
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Aim control module - turns detections into gimbal velocity commands
pub mod aim_ctrl;

/// Calibration profiles - camera mounting constants for each robot
pub mod calib;

/// Command server - publishes velocity commands
pub mod cmd_server;

/// Frame transformation - moves a target into the gimbal frame and finds the pointing error
pub mod frame_tf;

/// Orientation history - buffer of gimbal attitudes between detections
pub mod orient_hist;

/// Rotation composition - net rotation across the orientation history
pub mod rot_comp;

/// Stream client - receives IMU samples and detections
pub mod stream_client;

/// Time synchronisation - aligns the orientation history with a detection
pub mod time_sync;
