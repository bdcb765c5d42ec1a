//! # Equipment Interface
//!
//! This module defines the interface structures which are streamed between the equipment and the
//! aiming executable.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod aim;
pub mod imu;
