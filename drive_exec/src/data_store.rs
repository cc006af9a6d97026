//! # Data Store

use comms_if::eqpt::dbw::DbwDems;
use log::{info, warn};

use crate::{
    dbw_ctrl,
    loc::{Pose, Twist},
    tl_fusion, traj_plan,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Elapsed session time at the start of the cycle
    pub sim_time_s: f64,

    // Drive by wire
    /// True while the drive by wire unit will act on demands from this
    /// software. Toggled by messages from the vehicle bus, while false a
    /// safety driver has the vehicle.
    pub dbw_enabled: bool,

    // Vehicle state estimate
    /// Latest vehicle pose from the bus
    pub veh_pose: Option<Pose>,

    /// Latest vehicle twist from the bus
    pub veh_twist: Option<Twist>,

    /// Route waypoint the vehicle is at, updated from `veh_pose` each cycle
    pub car_wp_idx: Option<usize>,

    // Traffic lights
    /// True once the light observation source has produced at least one
    /// observation this session
    pub tl_source_alive: bool,

    // TlFusion
    pub tl_fusion: tl_fusion::TlFusion,
    pub tl_fusion_input: tl_fusion::InputData,
    pub tl_fusion_output: tl_fusion::OutputData,
    pub tl_fusion_status_rpt: tl_fusion::StatusReport,

    // TrajPlan
    pub traj_plan: traj_plan::TrajPlan,
    pub traj_plan_input: traj_plan::InputData,
    pub traj_plan_output: traj_plan::OutputData,
    pub traj_plan_status_rpt: traj_plan::StatusReport,

    // DbwCtrl
    pub dbw_ctrl: dbw_ctrl::DbwCtrl,
    pub dbw_ctrl_input: dbw_ctrl::InputData,
    pub dbw_ctrl_output: DbwDems,
    pub dbw_ctrl_status_rpt: dbw_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Enable drive by wire, demands will be acted on from the next cycle.
    pub fn enable_dbw(&mut self) {
        if !self.dbw_enabled {
            info!("Drive by wire enabled");
            self.dbw_enabled = true;
        }
    }

    /// Disable drive by wire, handing the vehicle back to the safety driver.
    pub fn disable_dbw(&mut self) {
        if self.dbw_enabled {
            warn!("Drive by wire disabled");
            self.dbw_enabled = false;
        }
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        if self.num_cycles % (cycle_frequency_hz as u128) == 0 {
            self.is_1_hz_cycle = true;
        } else {
            self.is_1_hz_cycle = false;
        }

        self.tl_fusion_input = tl_fusion::InputData::default();
        self.tl_fusion_output = tl_fusion::OutputData::default();
        self.tl_fusion_status_rpt = tl_fusion::StatusReport::default();

        self.traj_plan_input = traj_plan::InputData::default();
        self.traj_plan_output = traj_plan::OutputData::default();
        self.traj_plan_status_rpt = traj_plan::StatusReport::default();

        self.dbw_ctrl_input = dbw_ctrl::InputData::default();
        self.dbw_ctrl_output = DbwDems::default();
        self.dbw_ctrl_status_rpt = dbw_ctrl::StatusReport::default();

        self.sim_time_s = util::session::get_elapsed_seconds();
    }
}
