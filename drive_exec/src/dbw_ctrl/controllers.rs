//! # Drive by wire controllers module
//!
//! This module provides the low level controllers used by DbwCtrl: the
//! throttle PID, the speed measurement filter and the steering geometry
//! controller.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller with output limiting and integral anti windup.
#[derive(Debug, Serialize, Clone, Default)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Lowest output the controller may produce
    min: f64,

    /// Highest output the controller may produce
    max: f64,

    /// Previous error
    last_error: f64,

    /// The integral accumulation
    integral: f64
}

/// A first order low pass filter.
#[derive(Debug, Serialize, Clone, Default)]
pub struct LowPassFilter {
    a: f64,
    b: f64,

    /// Last filtered value
    last_val: f64,

    /// False until the first sample has been taken
    ready: bool
}

/// Converts a twist demand into a steering angle using the vehicle's
/// geometry.
#[derive(Debug, Serialize, Clone, Default)]
pub struct YawController {
    /// Distance between the front and rear axles
    ///
    /// Units: meters
    wheel_base_m: f64,

    /// Ratio between the steering wheel angle and the road wheel angle
    steer_ratio: f64,

    /// Lowest speed used when converting a yaw rate into a turn radius
    ///
    /// Units: meters/second
    min_speed_ms: f64,

    /// Largest lateral acceleration the steering may demand
    ///
    /// Units: meters/second/second
    max_lat_accel_mss: f64,

    /// Largest magnitude steering angle
    ///
    /// Units: radians
    max_steer_angle_rad: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains and output limits.
    pub fn new(k_p: f64, k_i: f64, k_d: f64, min: f64, max: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            min, max,
            last_error: 0f64,
            integral: 0f64
        }
    }

    /// Get the output of the controller for the given error and timestep.
    pub fn step(&mut self, error: f64, dt_s: f64) -> f64 {
        // A degenerate timestep carries no integral or derivative
        // information
        if dt_s <= 0.0 {
            return (self.k_p * error + self.k_i * self.integral)
                .max(self.min)
                .min(self.max);
        }

        let integral = self.integral + error * dt_s;
        let derivative = (error - self.last_error) / dt_s;

        let val =
            self.k_p * error
            + self.k_i * integral
            + self.k_d * derivative;

        let out = if val > self.max {
            self.max
        }
        else if val < self.min {
            self.min
        }
        else {
            // The integral accumulation is only kept while the output is
            // unsaturated, stopping windup against the limits
            self.integral = integral;
            val
        };

        self.last_error = error;

        out
    }

    /// Reset the integral accumulation, keeping the gains and limits.
    pub fn reset(&mut self) {
        self.integral = 0f64;
    }
}

impl LowPassFilter {

    /// Create a new filter with time constant `tau_s`, sampled every `ts_s`
    /// seconds.
    pub fn new(tau_s: f64, ts_s: f64) -> Self {
        let ratio = tau_s / ts_s;

        Self {
            a: 1.0 / (ratio + 1.0),
            b: ratio / (ratio + 1.0),
            last_val: 0f64,
            ready: false
        }
    }

    /// Filter the given sample.
    ///
    /// The first sample passes straight through so the filter does not have
    /// to charge up from zero.
    pub fn filt(&mut self, val: f64) -> f64 {
        let filtered = if self.ready {
            self.a * val + self.b * self.last_val
        }
        else {
            self.ready = true;
            val
        };

        self.last_val = filtered;

        filtered
    }

    /// Get the last filtered value.
    pub fn get(&self) -> f64 {
        self.last_val
    }
}

impl YawController {

    /// Create a new controller for the given vehicle geometry.
    pub fn new(
        wheel_base_m: f64,
        steer_ratio: f64,
        min_speed_ms: f64,
        max_lat_accel_mss: f64,
        max_steer_angle_rad: f64
    ) -> Self {
        Self {
            wheel_base_m,
            steer_ratio,
            min_speed_ms,
            max_lat_accel_mss,
            max_steer_angle_rad
        }
    }

    /// Get the steering angle that achieves the demanded twist at the
    /// current speed.
    pub fn get_steering(
        &self,
        linear_ms: f64,
        angular_rads: f64,
        current_ms: f64
    ) -> f64 {
        // Scale the yaw rate to the speed actually being driven
        let mut angular_rads = if linear_ms.abs() > 0.0 {
            current_ms * angular_rads / linear_ms
        }
        else {
            0.0
        };

        // Limit the yaw rate so the lateral acceleration stays in bounds
        if current_ms.abs() > 0.1 {
            let max_yaw_rate_rads = (self.max_lat_accel_mss / current_ms).abs();

            angular_rads = angular_rads
                .max(-max_yaw_rate_rads)
                .min(max_yaw_rate_rads);
        }

        if angular_rads.abs() > 0.0 {
            let radius_m = current_ms.max(self.min_speed_ms) / angular_rads;

            self.get_angle(radius_m)
        }
        else {
            0.0
        }
    }

    /// Steering angle that turns the vehicle about the given radius.
    fn get_angle(&self, radius_m: f64) -> f64 {
        let angle_rad = (self.wheel_base_m / radius_m).atan() * self.steer_ratio;

        angle_rad
            .max(-self.max_steer_angle_rad)
            .min(self.max_steer_angle_rad)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pid_output_limits() {
        let mut pid = PidController::new(1.0, 0.0, 0.0, -1.0, 1.0);

        assert_eq!(pid.step(5.0, 0.02), 1.0);
        assert_eq!(pid.step(-5.0, 0.02), -1.0);
        assert_eq!(pid.step(0.5, 0.02), 0.5);
    }

    #[test]
    fn test_pid_anti_windup() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, -1.0, 1.0);

        // A saturating step must not be accumulated
        assert_eq!(pid.step(100.0, 1.0), 1.0);

        // If it had been, this small error would still saturate the output
        let out = pid.step(0.1, 1.0);
        assert!((out - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_pid_derivative() {
        let mut pid = PidController::new(0.0, 0.0, 1.0, -10.0, 10.0);

        // First error rises from the initial zero
        assert!((pid.step(1.0, 0.5) - 2.0).abs() < 1e-9);

        // Constant error has no derivative
        assert_eq!(pid.step(1.0, 0.5), 0.0);
    }

    #[test]
    fn test_pid_reset() {
        let mut pid = PidController::new(0.0, 1.0, 0.0, -10.0, 10.0);

        pid.step(1.0, 1.0);
        pid.step(1.0, 1.0);

        pid.reset();

        assert_eq!(pid.step(0.0, 1.0), 0.0);
    }

    #[test]
    fn test_low_pass_filter() {
        let mut filter = LowPassFilter::new(0.5, 0.02);

        // First sample passes straight through
        assert_eq!(filter.filt(1.0), 1.0);

        // Later samples are smoothed towards the history
        let out = filter.filt(0.0);
        assert!((out - 25.0 / 26.0).abs() < 1e-9);
        assert_eq!(filter.get(), out);
    }

    #[test]
    fn test_yaw_controller() {
        let yaw = YawController::new(2.8498, 14.8, 0.1, 3.0, 8.0);

        // No angular demand gives no steering
        assert_eq!(yaw.get_steering(10.0, 0.0, 10.0), 0.0);

        // Zero linear demand gives no steering either
        assert_eq!(yaw.get_steering(0.0, 0.5, 10.0), 0.0);

        // At speed the yaw rate is capped by the lateral acceleration limit
        // (3.0 / 10.0 = 0.3 rad/s) before being turned into an angle
        let expected = (2.8498f64 / (10.0 / 0.3)).atan() * 14.8;
        assert!((yaw.get_steering(10.0, 1.0, 10.0) - expected).abs() < 1e-9);
    }
}
