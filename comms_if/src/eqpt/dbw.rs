//! # Drive By Wire Equipment Commands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Demands that are sent from the control module to the drive by wire unit
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq)]
pub struct DbwDems {
    /// The demanded throttle opening, between 0 and 1 where 1 is fully open.
    pub throttle: f64,

    /// The demanded braking torque in newton meters.
    pub brake_torque_nm: f64,

    /// The demanded steering angle in radians.
    ///
    /// Follows the right hand rule about the vehicle's Z+ (upwards) axis, so
    /// that positive angles steer to the left and negative angles steer to
    /// the right.
    pub steer_rad: f64
}
