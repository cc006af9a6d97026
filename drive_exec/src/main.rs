//! Main drive software executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Vehicle bus message processing
//!         - Localisation of the vehicle on the route
//!         - Traffic light fusion processing
//!         - Trajectory planning processing
//!         - Drive by wire control processing
//!
//! # Modules
//!
//! All modules (e.g. `dbw_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use drive_lib::{*,
    data_store::DataStore,
    route::{Route, RouteIndex}};

mod msg_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};
use structopt::StructOpt;

// Internal
use util::{
    raise_error,
    module::State,
    logger::{logger_init, LevelFilter},
    session::{self, Session},
    script_interpreter::{ScriptInterpreter, PendingMsgs},
    archive::Archived
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Target period of one cycle.
const CYCLE_PERIOD_S: f64 = 0.02;

/// Number of cycles per second
const CYCLE_FREQUENCY_HZ: f64 = 1.0 / CYCLE_PERIOD_S;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Executable command line arguments
#[derive(Debug, StructOpt)]
#[structopt(name = "drive_exec", about = "Drive software executable")]
struct CliArgs {
    /// Path to the route CSV file to follow
    route_path: String,

    /// Path to a scenario script standing in for the live vehicle bus
    #[structopt(short, long)]
    script: Option<String>
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "drive_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Trace, &session)
        .wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Drive Software Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- PARSE ARGUMENTS ----

    let args = CliArgs::from_args();

    debug!("CLI arguments: {:?}", args);

    // ---- LOAD ROUTE ----

    let route = Route::from_csv(&args.route_path)
        .wrap_err("Failed to load the route")?;

    info!(
        "Loaded route with {} waypoints ({:.1} m)",
        route.get_num_waypoints(),
        route.get_length_m()
    );

    let route_index = Arc::new(
        RouteIndex::build(Arc::new(route))
            .wrap_err("Failed to index the route")?
    );

    // ---- INITIALISE MSG SOURCE ----

    // Msg source is used to determine where vehicle bus messages come from.
    // Only scripted scenarios are supported at the minute.
    let mut msg_source = match args.script {
        Some(ref script_path) => {
            info!("Loading script from \"{}\"", script_path);

            // Load the script interpreter
            let si = ScriptInterpreter::new(script_path)
                .wrap_err("Failed to load script")?;

            // Display some info
            info!(
                "Loaded script lasts {:.02} s and contains {} messages\n",
                si.get_duration(),
                si.get_num_msgs()
            );

            MsgSource::Script(si)
        },
        None => {
            return Err(eyre!(
                "No scenario script provided, running against the live \
                vehicle bus is not yet supported"
            ));
        }
    };

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.tl_fusion.init(("tl_fusion.toml", route_index.clone()), &session)
        .wrap_err("Failed to initialise TlFusion")?;
    info!("TlFusion init complete");

    ds.traj_plan.init(("traj_plan.toml", route_index.clone()), &session)
        .wrap_err("Failed to initialise TrajPlan")?;
    info!("TrajPlan init complete");

    ds.dbw_ctrl.init("dbw_ctrl.toml", &session)
        .wrap_err("Failed to initialise DbwCtrl")?;
    info!("DbwCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut last_stop_wp_idx: i64 = -1;

    loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(CYCLE_FREQUENCY_HZ);

        // ---- MESSAGE PROCESSING ----

        // Branch depending on the source
        match msg_source {
            // If no source no point in continuing so break
            MsgSource::None => raise_error!("No message source present"),

            MsgSource::Script(ref mut si) =>
                match si.get_pending_msgs() {
                    PendingMsgs::None => (),
                    PendingMsgs::Some(ref msg_vec) => {
                        for msg in msg_vec.iter() {
                            msg_processor::exec(&mut ds, msg);
                        }
                    }
                    // Exit if end of script reached
                    PendingMsgs::EndOfScript => {
                        info!("End of scenario script reached, stopping");
                        break
                    }
                }
        };

        // ---- LOCALISATION ----

        // Fix the vehicle on the route from the latest pose estimate
        if let Some(ref pose) = ds.veh_pose {
            ds.car_wp_idx = Some(
                route_index.nearest_ahead(&pose.position2())
            );
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        // TlFusion processing, needs the vehicle fixed on the route
        if let Some(car_wp_idx) = ds.car_wp_idx {
            ds.tl_fusion_input.car_wp_idx = car_wp_idx;
            ds.tl_fusion_input.source_alive = ds.tl_source_alive;

            match ds.tl_fusion.proc(&ds.tl_fusion_input) {
                Ok((o, r)) => {
                    ds.tl_fusion_output = o;
                    ds.tl_fusion_status_rpt = r;
                },
                // With the light picture unusable there is no safe stop
                // decision to fall back on, so stop the exec
                Err(e) => {
                    return Err(e).wrap_err("Error during TlFusion processing")
                }
            };

            // Log transitions of the stop decision
            if ds.tl_fusion_output.stop_wp_idx != last_stop_wp_idx {
                info!(
                    "Stop waypoint changed: {} -> {} ({:?})",
                    last_stop_wp_idx,
                    ds.tl_fusion_output.stop_wp_idx,
                    ds.tl_fusion_output.class
                );
                last_stop_wp_idx = ds.tl_fusion_output.stop_wp_idx;
            }
        }

        // TrajPlan processing, needs a pose
        if let (Some(pose), Some(car_wp_idx)) = (ds.veh_pose, ds.car_wp_idx) {
            ds.traj_plan_input.pose = pose;
            ds.traj_plan_input.car_wp_idx = car_wp_idx;
            ds.traj_plan_input.stop_wp_idx = ds.tl_fusion_output.stop_wp_idx;

            match ds.traj_plan.proc(&ds.traj_plan_input) {
                Ok((o, r)) => {
                    ds.traj_plan_output = o;
                    ds.traj_plan_status_rpt = r;
                },
                Err(e) => {
                    // A failed plan leaves the targets at zero, which brakes
                    // the vehicle, so just issue the warning and continue.
                    warn!("Error during TrajPlan processing: {}", e)
                }
            };
        }

        // DbwCtrl processing. This always runs so that the vehicle is held
        // on the brakes while there is no pose or plan.
        ds.dbw_ctrl_input.dbw_enabled = ds.dbw_enabled;
        ds.dbw_ctrl_input.target_linear_ms =
            ds.traj_plan_output.target_linear_ms;
        ds.dbw_ctrl_input.target_angular_rads =
            ds.traj_plan_output.target_angular_rads;
        ds.dbw_ctrl_input.current_linear_ms = match ds.veh_twist {
            Some(ref twist) => twist.linear_ms,
            None => 0.0
        };

        match ds.dbw_ctrl.proc(&ds.dbw_ctrl_input) {
            Ok((o, r)) => {
                ds.dbw_ctrl_output = o;
                ds.dbw_ctrl_status_rpt = r;
            },
            Err(e) => warn!("Error during DbwCtrl processing: {}", e)
        };

        // ---- WRITE ARCHIVES ----

        match ds.tl_fusion.write() {
            Ok(_) => (),
            Err(e) => warn!("Could not write TlFusion archives: {}", e)
        };
        match ds.traj_plan.write() {
            Ok(_) => (),
            Err(e) => warn!("Could not write TrajPlan archives: {}", e)
        };
        match ds.dbw_ctrl.write() {
            Ok(_) => (),
            Err(e) => warn!("Could not write DbwCtrl archives: {}", e)
        };

        // ---- PLAN TELEMETRY ----

        // Save the latest plan on the 1Hz for offline inspection
        if ds.is_1_hz_cycle && !ds.traj_plan_output.waypoints.is_empty() {
            session::save_with_timestamp(
                "plans/plan.json",
                ds.traj_plan_output.clone()
            );
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match Duration::from_secs_f64(CYCLE_PERIOD_S)
            .checked_sub(cycle_dur)
        {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64()
                        - Duration::from_secs_f64(CYCLE_PERIOD_S).as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    info!("End of execution");

    session.exit();

    Ok(())
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Various sources for the vehicle bus messages incoming to the exec.
#[allow(dead_code)]
enum MsgSource {
    None,
    Script(ScriptInterpreter)
}
