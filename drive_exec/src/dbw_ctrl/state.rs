//! Implementations for the DbwCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;
use std::time::Instant;

// Internal
use super::{DbwCtrlError, LowPassFilter, Params, PidController, YawController};
use comms_if::eqpt::dbw::DbwDems;
use util::{
    params,
    module::State,
    archive::{Archived, Archiver},
    session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive by wire control module state
#[derive(Default)]
pub struct DbwCtrl {

    pub(crate) params: Params,

    /// Throttle controller
    throttle_ctrl: PidController,

    /// Filter over the measured vehicle speed
    vel_filter: LowPassFilter,

    /// Steering geometry controller
    yaw_ctrl: YawController,

    /// Instant of the previous enabled control step, used to derive the
    /// controller timestep.
    prev_step_time: Option<Instant>,

    initialised: bool,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    output: DbwDems,
    arch_output: Archiver
}

/// Input data to Drive by wire control.
#[derive(Clone, Copy, Default)]
pub struct InputData {
    /// True while drive by wire is enabled. While false the controllers are
    /// held reset and zero demands are output.
    pub dbw_enabled: bool,

    /// Linear speed target from the trajectory planner.
    ///
    /// Units: meters/second
    pub target_linear_ms: f64,

    /// Angular rate target from the trajectory planner.
    ///
    /// Units: radians/second
    pub target_angular_rads: f64,

    /// Measured vehicle speed.
    ///
    /// Units: meters/second
    pub current_linear_ms: f64
}

/// Status report for DbwCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True while drive by wire is disabled and the controllers are reset.
    pub passive: bool,

    /// True when the hold brake is applied.
    pub holding: bool,

    /// Speed error seen by the throttle controller.
    ///
    /// Units: meters/second
    pub speed_error_ms: f64,

    /// Filtered measure of the vehicle speed.
    ///
    /// Units: meters/second
    pub filtered_speed_ms: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for DbwCtrl {
    type InitData = &'static str;
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = DbwDems;
    type StatusReport = StatusReport;
    type ProcError = super::DbwCtrlError;

    /// Initialise the DbwCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        // Load the parameters
        self.params = match params::load(init_data) {
            Ok(p) => p,
            Err(e) => return Err(e)
        };

        self.setup_controllers();
        self.initialised = true;

        // Create the arch folder for dbw_ctrl
        let mut arch_path = session.arch_root.clone();
        arch_path.push("dbw_ctrl");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report = Archiver::from_path(
            session, "dbw_ctrl/status_report.csv"
        ).unwrap();
        self.arch_output = Archiver::from_path(
            session, "dbw_ctrl/output.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of Drive by wire control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        if !self.initialised {
            return Err(DbwCtrlError::NotInitialised);
        }

        // While drive by wire is disabled a safety driver has the vehicle.
        // Output zero demands and keep the controllers cleared so no stale
        // state kicks the vehicle when it is re-enabled.
        if !input_data.dbw_enabled {
            self.throttle_ctrl.reset();
            self.prev_step_time = None;
            self.report.passive = true;

            let output = DbwDems::default();
            self.output = output;

            return Ok((output, self.report));
        }

        // Timestep since the last enabled cycle, falling back to the nominal
        // period on the first one
        let now = Instant::now();
        let dt_s = match self.prev_step_time {
            Some(t0) => (now - t0).as_secs_f64(),
            None => self.params.sample_time_s
        };
        self.prev_step_time = Some(now);

        // Smooth the noisy speed measurement
        let current_ms = self.vel_filter.filt(input_data.current_linear_ms);
        self.report.filtered_speed_ms = current_ms;

        // Steering follows the demanded twist directly
        let steer_rad = self.yaw_ctrl.get_steering(
            input_data.target_linear_ms,
            input_data.target_angular_rads,
            current_ms
        );

        let error_ms = input_data.target_linear_ms - current_ms;
        self.report.speed_error_ms = error_ms;

        let mut throttle = self.throttle_ctrl.step(error_ms, dt_s);
        let mut brake_torque_nm = 0.0;

        if input_data.target_linear_ms == 0.0
            && current_ms < self.params.hold_speed_ms
        {
            // Stopped for a light, hold the vehicle on the brakes
            throttle = 0.0;
            brake_torque_nm = self.params.hold_brake_torque_nm;
            self.report.holding = true;
        }
        else if throttle < self.params.brake_throttle_threshold
            && error_ms < 0.0
        {
            // Above the target speed, brake with the torque that gives the
            // wanted deceleration
            throttle = 0.0;

            let decel_mss = error_ms.max(self.params.decel_limit_mss);
            brake_torque_nm = decel_mss.abs()
                * self.params.vehicle_mass_kg
                * self.params.wheel_radius_m;
        }

        let output = DbwDems {
            throttle,
            brake_torque_nm,
            steer_rad
        };

        trace!(
            "DbwCtrl throttle: {:.3}, brake: {:.1} Nm, steer: {:.3} rad",
            output.throttle,
            output.brake_torque_nm,
            output.steer_rad
        );

        // Update the output in self
        self.output = output;

        Ok((output, self.report))
    }
}

impl Archived for DbwCtrl {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Write each one individually
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

impl DbwCtrl {

    /// Build the controllers from the loaded parameters.
    fn setup_controllers(&mut self) {
        self.throttle_ctrl = PidController::new(
            self.params.throttle_k_p,
            self.params.throttle_k_i,
            self.params.throttle_k_d,
            0.0,
            self.params.max_throttle
        );

        self.vel_filter = LowPassFilter::new(
            self.params.filter_tau_s,
            self.params.sample_time_s
        );

        self.yaw_ctrl = YawController::new(
            self.params.wheel_base_m,
            self.params.steer_ratio,
            self.params.min_speed_ms,
            self.params.max_lat_accel_mss,
            self.params.max_steer_angle_rad
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Build a controller with nominal parameters, skipping the parameter
    /// file and archive setup done by init.
    fn controller() -> DbwCtrl {
        let params = Params {
            vehicle_mass_kg: 1736.35,
            wheel_radius_m: 0.2413,
            wheel_base_m: 2.8498,
            steer_ratio: 14.8,
            min_speed_ms: 0.1,
            max_lat_accel_mss: 3.0,
            max_steer_angle_rad: 8.0,
            decel_limit_mss: -5.0,
            max_throttle: 1.0,
            throttle_k_p: 0.3,
            throttle_k_i: 0.1,
            throttle_k_d: 0.0,
            filter_tau_s: 0.5,
            sample_time_s: 0.02,
            hold_speed_ms: 0.1,
            hold_brake_torque_nm: 400.0,
            brake_throttle_threshold: 0.1
        };

        let mut dbw = DbwCtrl {
            params,
            initialised: true,
            ..Default::default()
        };
        dbw.setup_controllers();

        dbw
    }

    #[test]
    fn test_disabled_gives_zero_demands() {
        let mut dbw = controller();

        let input = InputData {
            dbw_enabled: false,
            target_linear_ms: 10.0,
            target_angular_rads: 0.0,
            current_linear_ms: 5.0
        };

        let (output, report) = dbw.proc(&input).unwrap();

        assert!(report.passive);
        assert_eq!(output, DbwDems::default());
    }

    #[test]
    fn test_hold_brake_when_stopped() {
        let mut dbw = controller();

        let input = InputData {
            dbw_enabled: true,
            target_linear_ms: 0.0,
            target_angular_rads: 0.0,
            current_linear_ms: 0.05
        };

        let (output, report) = dbw.proc(&input).unwrap();

        assert!(report.holding);
        assert_eq!(output.throttle, 0.0);
        assert_eq!(output.brake_torque_nm, 400.0);
        assert_eq!(output.steer_rad, 0.0);
    }

    #[test]
    fn test_brake_above_target_speed() {
        let mut dbw = controller();

        let input = InputData {
            dbw_enabled: true,
            target_linear_ms: 5.0,
            target_angular_rads: 0.0,
            current_linear_ms: 10.0
        };

        let (output, report) = dbw.proc(&input).unwrap();

        assert!(!report.holding);
        assert_eq!(output.throttle, 0.0);

        // The 5 m/s error saturates at the deceleration limit
        let expected_nm = 5.0 * 1736.35 * 0.2413;
        assert!((output.brake_torque_nm - expected_nm).abs() < 1e-9);
    }

    #[test]
    fn test_throttle_up_to_target_speed() {
        let mut dbw = controller();

        let input = InputData {
            dbw_enabled: true,
            target_linear_ms: 10.0,
            target_angular_rads: 0.0,
            current_linear_ms: 0.0
        };

        let (output, _) = dbw.proc(&input).unwrap();

        // A 10 m/s error drives the proportional term alone to 3.0, which
        // saturates the throttle at the fully open position
        assert_eq!(output.throttle, 1.0);
        assert_eq!(output.brake_torque_nm, 0.0);
    }

    #[test]
    fn test_throttle_tracks_small_errors() {
        let mut dbw = controller();

        let input = InputData {
            dbw_enabled: true,
            target_linear_ms: 1.0,
            target_angular_rads: 0.0,
            current_linear_ms: 0.0
        };

        let (output, _) = dbw.proc(&input).unwrap();

        // Inside the clamp range the output follows the gains, it is not
        // pinned against an artificially low limit
        let expected = 0.3 * 1.0 + 0.1 * (1.0 * 0.02);
        assert!((output.throttle - expected).abs() < 1e-9);
        assert!(output.throttle < 1.0);
    }

    #[test]
    fn test_steering_follows_twist() {
        let mut dbw = controller();

        let input = InputData {
            dbw_enabled: true,
            target_linear_ms: 10.0,
            target_angular_rads: 1.0,
            current_linear_ms: 10.0
        };

        let (output, _) = dbw.proc(&input).unwrap();

        // Yaw rate capped at 3.0 / 10.0 rad/s by the lateral acceleration
        // limit
        let expected_rad = (2.8498f64 / (10.0 / 0.3)).atan() * 14.8;
        assert!((output.steer_rad - expected_rad).abs() < 1e-9);
    }

    #[test]
    fn test_not_initialised() {
        let mut dbw = DbwCtrl::default();

        assert!(matches!(
            dbw.proc(&InputData::default()),
            Err(DbwCtrlError::NotInitialised)
        ));
    }
}
