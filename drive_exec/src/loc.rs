//! # Localisation module
//!
//! This module provides the types describing where the vehicle is and how it
//! is moving. The estimates themselves are produced off-board and arrive over
//! the vehicle bus.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Serialize, Deserialize};
use nalgebra::{Vector2, Vector3, UnitQuaternion};

// Internal
use util::maths::map_pi_to_2pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose (position and attitude in the map frame) of the vehicle.
///
/// More specifically this represents the Vehicle Body (VB) frame in the Map
/// (M) frame.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default)]
pub struct Pose {

    /// The position in the map frame
    pub position_m: Vector3<f64>,

    /// The attitude of the vehicle in the map frame. This is a quaternion
    /// that will rotate an object from the map frame into the VB frame.
    pub attitude_q: UnitQuaternion<f64>
}

/// The current velocity feedback of the vehicle.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, Default)]
pub struct Twist {
    /// Linear (forwards) velocity in meters/second
    pub linear_ms: f64,

    /// Angular velocity about the map Z+ axis in radians/second
    pub angular_rads: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {

    /// Build a pose from a planar position and heading, as recieved over the
    /// vehicle bus.
    pub fn from_xy_yaw(x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        Self {
            position_m: Vector3::new(x_m, y_m, 0.0),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw_rad)
        }
    }

    /// Return the heading (angle to the positive map X axis) of the vehicle
    /// in radians.
    ///
    /// Heading is given in the range [0, 2*pi], with 0 being in the map X
    /// direction.
    pub fn get_heading(&self) -> f64 {
        map_pi_to_2pi(self.attitude_q.euler_angles().2)
    }

    /// Return the 2D position of the vehicle in the map frame.
    pub fn position2(&self) -> Vector2<f64> {
        Vector2::new(self.position_m[0], self.position_m[1])
    }

    /// Return the unit vector pointing along the vehicle's forward direction,
    /// projected into the map XY plane.
    pub fn forward2(&self) -> Vector2<f64> {
        let fwd = self.attitude_q.transform_vector(&Vector3::x());
        Vector2::new(fwd[0], fwd[1])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_heading() {
        const PI: f64 = std::f64::consts::PI;

        let pose = Pose::from_xy_yaw(0.0, 0.0, 0.0);
        assert!(pose.get_heading().abs() < 1e-9);

        let pose = Pose::from_xy_yaw(0.0, 0.0, PI / 2.0);
        assert!((pose.get_heading() - PI / 2.0).abs() < 1e-9);

        // Negative yaws map into the upper half of the [0, 2pi] range
        let pose = Pose::from_xy_yaw(0.0, 0.0, -PI / 2.0);
        assert!((pose.get_heading() - 3.0 * PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_forward2() {
        let pose = Pose::from_xy_yaw(1.0, 2.0, std::f64::consts::PI / 2.0);
        let fwd = pose.forward2();

        assert!(fwd[0].abs() < 1e-9);
        assert!((fwd[1] - 1.0).abs() < 1e-9);
    }
}
