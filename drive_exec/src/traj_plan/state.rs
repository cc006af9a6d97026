//! Implementations for the TrajPlan state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Vector2, Vector3};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{Params, TrajPlanError};
use crate::loc::Pose;
use crate::route::{Route, RouteIndex};
use util::{
    maths,
    params,
    module::State,
    archive::{Archived, Archiver},
    session::Session};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Plan points closer to the vehicle than this are skipped when deriving the
/// desired heading.
///
/// Units: meters
const TARGET_MIN_DIST_M: f64 = 0.1;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory planning module state
#[derive(Default)]
pub struct TrajPlan {

    pub(crate) params: Params,

    route_index: Option<Arc<RouteIndex>>,

    pub(crate) report: StatusReport,
    arch_report: Archiver
}

/// Input data to Trajectory planning.
pub struct InputData {
    /// Current vehicle pose estimate.
    pub pose: Pose,

    /// The route waypoint the vehicle is currently at.
    pub car_wp_idx: usize,

    /// Route waypoint of the stop line demanded by TlFusion, or -1 if there
    /// is nothing to stop for.
    pub stop_wp_idx: i64
}

impl Default for InputData {
    fn default() -> Self {
        InputData {
            pose: Pose::default(),
            car_wp_idx: 0,
            stop_wp_idx: -1
        }
    }
}

/// A single point of the published plan.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlanWaypoint {
    /// Index of the route waypoint this plan point sits on.
    pub wp_idx: usize,

    /// Position of the point in the map frame.
    ///
    /// Units: meters
    pub position_m: Vector3<f64>,

    /// Speed demand at this point.
    ///
    /// Units: meters/second
    pub speed_ms: f64
}

/// Output plan from TrajPlan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputData {
    /// The planned points ahead of the vehicle, in route order.
    pub waypoints: Vec<PlanWaypoint>,

    /// Linear speed demand for the drive by wire control module.
    ///
    /// Units: meters/second
    pub target_linear_ms: f64,

    /// Angular rate demand for the drive by wire control module.
    ///
    /// Units: radians/second
    pub target_angular_rads: f64
}

/// Status report for TrajPlan processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True when the plan is ramping down to a stop line.
    pub decelerating: bool,

    /// Number of points in the published plan.
    pub plan_len: usize,

    /// The stop waypoint shaping the plan, or -1.
    pub stop_wp_idx: i64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TrajPlan {
    type InitData = (&'static str, Arc<RouteIndex>);
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = super::TrajPlanError;

    /// Initialise the TrajPlan module.
    ///
    /// Expected init data is the path to the parameter file and the shared
    /// route index.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let (params_path, route_index) = init_data;

        // Load the parameters
        self.params = match params::load(params_path) {
            Ok(p) => p,
            Err(e) => return Err(e)
        };

        self.route_index = Some(route_index);

        // Create the arch folder for traj_plan
        let mut arch_path = session.arch_root.clone();
        arch_path.push("traj_plan");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report = Archiver::from_path(
            session, "traj_plan/status_report.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of Trajectory planning.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();
        self.report.stop_wp_idx = input_data.stop_wp_idx;

        let route_index = match self.route_index {
            Some(ref ri) => ri,
            None => return Err(TrajPlanError::NotInitialised)
        };

        let route = route_index.get_route();
        let num_wps = route.get_num_waypoints();

        if input_data.stop_wp_idx >= num_wps as i64 {
            return Err(TrajPlanError::InvalidStopIdx(input_data.stop_wp_idx));
        }

        let horizon_end = input_data.car_wp_idx + self.params.look_ahead_wps;

        // Decide whether the stop line shapes this plan. A negative index
        // means no stop, and a stop beyond the horizon is not yet relevant.
        let stop_wp_idx = match input_data.stop_wp_idx {
            idx if idx < 0 => None,
            idx if idx as usize >= horizon_end => None,
            idx => Some(idx as usize)
        };

        let waypoints = match stop_wp_idx {
            None => self.horizon_plan(route, input_data.car_wp_idx),
            Some(stop) => {
                self.report.decelerating = true;
                self.decelerate_plan(route, input_data.car_wp_idx, stop)
            }
        };

        // Derive the twist targets from the front of the plan
        let target_linear_ms = match waypoints.first() {
            Some(wp) => wp.speed_ms,
            None => 0.0
        };
        let target_angular_rads =
            self.calc_angular_target(&input_data.pose, &waypoints);

        self.report.plan_len = waypoints.len();

        trace!(
            "TrajPlan len: {}, linear: {:.2} m/s, angular: {:.3} rad/s",
            waypoints.len(),
            target_linear_ms,
            target_angular_rads
        );

        Ok((
            OutputData {
                waypoints,
                target_linear_ms,
                target_angular_rads
            },
            self.report
        ))
    }
}

impl Archived for TrajPlan {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.arch_report.serialise(self.report)?;

        Ok(())
    }
}

impl TrajPlan {

    /// Build the free running plan, following the route at its nominal
    /// speeds. The horizon wraps around the end of the route.
    fn horizon_plan(&self, route: &Route, car_wp_idx: usize)
        -> Vec<PlanWaypoint>
    {
        let num_wps = route.get_num_waypoints();

        (0..self.params.look_ahead_wps)
            .map(|k| {
                let wp_idx = (car_wp_idx + k) % num_wps;
                let wp = &route.waypoints[wp_idx];

                PlanWaypoint {
                    wp_idx,
                    position_m: wp.position_m,
                    speed_ms: wp.speed_ms
                }
            })
            .collect()
    }

    /// Build the plan for a horizon cut short by a stop line.
    ///
    /// Speeds follow a constant deceleration ramp into the stop, capped at
    /// the route's nominal speed, and are zeroed over the standoff
    /// waypoints just short of the line.
    fn decelerate_plan(
        &self,
        route: &Route,
        car_wp_idx: usize,
        stop_wp_idx: usize
    ) -> Vec<PlanWaypoint> {
        let plan_len = stop_wp_idx.saturating_sub(car_wp_idx);

        // On (or past) the stop line itself the only valid demand is an
        // immediate halt at the current waypoint
        if plan_len == 0 {
            let wp = &route.waypoints[car_wp_idx];

            return vec![PlanWaypoint {
                wp_idx: car_wp_idx,
                position_m: wp.position_m,
                speed_ms: 0.0
            }];
        }

        let stop_offset = plan_len.saturating_sub(self.params.stop_standoff_wps);

        let mut waypoints = Vec::with_capacity(plan_len);

        for k in 0..plan_len {
            let wp_idx = car_wp_idx + k;
            let wp = &route.waypoints[wp_idx];

            let speed_ms = if k >= stop_offset {
                0.0
            }
            else {
                let dist_m = route.distance_between_m(
                    wp_idx,
                    car_wp_idx + stop_offset
                );

                let ramp_ms = (2.0 * self.params.max_decel_mss * dist_m).sqrt();
                let speed_ms = ramp_ms.min(wp.speed_ms);

                if speed_ms < self.params.min_profile_speed_ms {
                    0.0
                }
                else {
                    speed_ms
                }
            };

            waypoints.push(PlanWaypoint {
                wp_idx,
                position_m: wp.position_m,
                speed_ms
            });
        }

        waypoints
    }

    /// Angular rate demand steering the vehicle onto the front of the plan.
    fn calc_angular_target(&self, pose: &Pose, waypoints: &[PlanWaypoint])
        -> f64
    {
        let position_m = pose.position2();

        // The first plan point meaningfully ahead of the vehicle fixes the
        // desired heading
        let target = waypoints.iter().find(|wp| {
            (Vector2::new(wp.position_m[0], wp.position_m[1]) - position_m)
                .norm()
                > TARGET_MIN_DIST_M
        });

        let target = match target {
            Some(t) => t,
            None => return 0.0
        };

        let to_target =
            Vector2::new(target.position_m[0], target.position_m[1])
            - position_m;
        let desired_heading_rad =
            maths::map_pi_to_2pi(to_target[1].atan2(to_target[0]));

        let error_rad =
            maths::get_ang_dist_2pi(pose.get_heading(), desired_heading_rad);

        (error_rad * self.params.heading_gain)
            .max(-self.params.max_angular_rads)
            .min(self.params.max_angular_rads)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::route::Waypoint;

    /// Build a planner over a straight route, skipping the parameter and
    /// archive setup done by init.
    fn planner(num_wps: usize, speed_ms: f64) -> TrajPlan {
        let waypoints = (0..num_wps)
            .map(|i| Waypoint {
                position_m: Vector3::new(i as f64, 0.0, 0.0),
                yaw_rad: 0.0,
                speed_ms
            })
            .collect();

        let route = Arc::new(Route::from_waypoints(waypoints).unwrap());

        TrajPlan {
            params: Params {
                look_ahead_wps: 50,
                max_decel_mss: 1.0,
                stop_standoff_wps: 2,
                min_profile_speed_ms: 0.5,
                heading_gain: 1.0,
                max_angular_rads: 0.5
            },
            route_index: Some(Arc::new(RouteIndex::build(route).unwrap())),
            ..Default::default()
        }
    }

    #[test]
    fn test_free_running_plan() {
        let mut plan = planner(50, 11.1);

        let input = InputData {
            pose: Pose::from_xy_yaw(10.0, 0.0, 0.0),
            car_wp_idx: 10,
            stop_wp_idx: -1
        };

        let (output, report) = plan.proc(&input).unwrap();

        assert!(!report.decelerating);
        assert_eq!(output.waypoints.len(), 50);
        assert_eq!(output.waypoints[0].wp_idx, 10);

        // The horizon wraps around the end of the route
        assert_eq!(output.waypoints[40].wp_idx, 0);

        assert_eq!(output.target_linear_ms, 11.1);
        assert_eq!(output.target_angular_rads, 0.0);
    }

    #[test]
    fn test_decel_plan_cut_at_stop_line() {
        let mut plan = planner(50, 11.1);

        let input = InputData {
            pose: Pose::from_xy_yaw(10.0, 0.0, 0.0),
            car_wp_idx: 10,
            stop_wp_idx: 40
        };

        let (output, report) = plan.proc(&input).unwrap();

        assert!(report.decelerating);
        assert_eq!(output.waypoints.len(), 30);
        assert_eq!(output.waypoints[0].wp_idx, 10);

        // Speeds never increase along the ramp
        let mut prev_ms = f64::MAX;
        for wp in &output.waypoints {
            assert!(wp.speed_ms <= prev_ms);
            prev_ms = wp.speed_ms;
        }

        // The standoff waypoints just short of the line are at rest
        assert_eq!(output.waypoints[28].speed_ms, 0.0);
        assert_eq!(output.waypoints[29].speed_ms, 0.0);

        // First point follows the deceleration ramp from 28 m out
        assert!((output.target_linear_ms - (2.0f64 * 28.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_stop_beyond_horizon_ignored() {
        let mut plan = planner(80, 11.1);

        let input = InputData {
            pose: Pose::from_xy_yaw(10.0, 0.0, 0.0),
            car_wp_idx: 10,
            stop_wp_idx: 70
        };

        let (output, report) = plan.proc(&input).unwrap();

        assert!(!report.decelerating);
        assert_eq!(output.waypoints.len(), 50);
        assert_eq!(output.target_linear_ms, 11.1);
    }

    #[test]
    fn test_stop_on_car_waypoint() {
        let mut plan = planner(50, 11.1);

        let input = InputData {
            pose: Pose::from_xy_yaw(10.0, 0.0, 0.0),
            car_wp_idx: 10,
            stop_wp_idx: 10
        };

        let (output, _) = plan.proc(&input).unwrap();

        assert_eq!(output.waypoints.len(), 1);
        assert_eq!(output.waypoints[0].wp_idx, 10);
        assert_eq!(output.target_linear_ms, 0.0);
        assert_eq!(output.target_angular_rads, 0.0);
    }

    #[test]
    fn test_invalid_stop_idx() {
        let mut plan = planner(50, 11.1);

        let input = InputData {
            pose: Pose::from_xy_yaw(10.0, 0.0, 0.0),
            car_wp_idx: 10,
            stop_wp_idx: 100
        };

        assert!(matches!(
            plan.proc(&input),
            Err(TrajPlanError::InvalidStopIdx(100))
        ));
    }

    #[test]
    fn test_angular_target_clamped() {
        let mut plan = planner(50, 11.1);

        // Facing along the route there is no heading error
        let input = InputData {
            pose: Pose::from_xy_yaw(10.0, 0.0, 0.0),
            car_wp_idx: 10,
            stop_wp_idx: -1
        };
        let (output, _) = plan.proc(&input).unwrap();
        assert_eq!(output.target_angular_rads, 0.0);

        // Facing 90 degrees off the route the demand saturates, turning
        // clockwise back towards it
        let input = InputData {
            pose: Pose::from_xy_yaw(10.0, 0.0, std::f64::consts::FRAC_PI_2),
            car_wp_idx: 10,
            stop_wp_idx: -1
        };
        let (output, _) = plan.proc(&input).unwrap();
        assert_eq!(output.target_angular_rads, -0.5);
    }
}
