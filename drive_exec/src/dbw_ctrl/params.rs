//! Parameters structure for DbwCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Drive by wire control.
#[derive(Debug, Default, Deserialize)]
pub struct Params {

    // ---- GEOMETRY ----

    /// Mass of the vehicle including fuel.
    ///
    /// Units: kilograms
    pub vehicle_mass_kg: f64,

    /// Radius of the vehicle's wheels.
    ///
    /// Units: meters
    pub wheel_radius_m: f64,

    /// Distance between the front and rear axles.
    ///
    /// Units: meters
    pub wheel_base_m: f64,

    /// Ratio between the steering wheel angle and the road wheel angle.
    pub steer_ratio: f64,

    // ---- CAPABILITIES ----

    /// Lowest speed used when converting a yaw rate into a turn radius.
    ///
    /// Units: meters/second
    pub min_speed_ms: f64,

    /// Largest lateral acceleration the steering may demand.
    ///
    /// Units: meters/second/second
    pub max_lat_accel_mss: f64,

    /// Largest magnitude steering angle demand.
    ///
    /// Units: radians
    pub max_steer_angle_rad: f64,

    /// Largest deceleration the brakes may demand (lowest negative value).
    ///
    /// Units: meters/second/second
    pub decel_limit_mss: f64,

    /// Largest throttle opening the controller may demand, between 0 and 1.
    pub max_throttle: f64,

    // ---- CONTROL ----

    /// Throttle controller proportional gain.
    pub throttle_k_p: f64,

    /// Throttle controller integral gain.
    pub throttle_k_i: f64,

    /// Throttle controller derivative gain.
    pub throttle_k_d: f64,

    /// Time constant of the speed measurement filter.
    ///
    /// Units: seconds
    pub filter_tau_s: f64,

    /// Nominal time between control steps, used for the filter and for the
    /// first step after drive by wire is enabled.
    ///
    /// Units: seconds
    pub sample_time_s: f64,

    // ---- BRAKING ----

    /// Below this speed a zero speed target engages the hold brake.
    ///
    /// Units: meters/second
    pub hold_speed_ms: f64,

    /// Brake torque applied to keep the vehicle at rest.
    ///
    /// Units: newton meters
    pub hold_brake_torque_nm: f64,

    /// Throttle demands below this value allow the brakes to engage when the
    /// vehicle is above the target speed.
    pub brake_throttle_threshold: f64
}
