//! Parameters structure for TrajPlan

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Trajectory planning.
#[derive(Debug, Default, Deserialize)]
pub struct Params {

    /// Number of route waypoints covered by the published plan.
    pub look_ahead_wps: usize,

    /// Deceleration used to shape the speed ramp into a stop line.
    ///
    /// Units: meters/second/second
    pub max_decel_mss: f64,

    /// Number of waypoints short of the stop line at which the vehicle comes
    /// to rest, so the front of the vehicle does not cross the line.
    pub stop_standoff_wps: usize,

    /// Profile speeds below this value are snapped to zero.
    ///
    /// Units: meters/second
    pub min_profile_speed_ms: f64,

    /// Gain from heading error to angular rate demand.
    ///
    /// Units: 1/second
    pub heading_gain: f64,

    /// Largest angular rate the plan may demand.
    ///
    /// Units: radians/second
    pub max_angular_rads: f64
}
