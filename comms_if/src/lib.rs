//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for the equipment streams (IMU, detector, gimbal)
pub mod eqpt;

/// Network module
pub mod net;
