//! # Vehicle bus message processor module
//!
//! The message processor handles messages coming from the vehicle bus, or from a scenario script
//! standing in for it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;

// Internal
use comms_if::msg::VehMsg;
use drive_lib::{
    data_store::DataStore,
    loc::{Pose, Twist},
    tl_fusion::Observation};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a vehicle bus message.
///
/// Mutates the datastore to pass data and commands to different modules.
pub(crate) fn exec(ds: &mut DataStore, msg: &VehMsg) {

    // Handle different messages
    match msg {
        VehMsg::DbwEnable => {
            debug!("Recieved DbwEnable message");
            ds.enable_dbw();
        },
        VehMsg::DbwDisable => {
            debug!("Recieved DbwDisable message");
            ds.disable_dbw();
        },
        VehMsg::Pose { x_m, y_m, yaw_rad } => {
            ds.veh_pose = Some(Pose::from_xy_yaw(*x_m, *y_m, *yaw_rad));
        },
        VehMsg::Twist { linear_ms, angular_rads } => {
            ds.veh_twist = Some(Twist {
                linear_ms: *linear_ms,
                angular_rads: *angular_rads
            });
        },
        VehMsg::Lights { lights } => {
            ds.tl_fusion_input.observation =
                Some(Observation::SimLights(lights.clone()));
            ds.tl_source_alive = true;
        }
    }

}
