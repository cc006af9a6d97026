//! Trajectory planning module
//!
//! TrajPlan publishes a short horizon of route waypoints ahead of the
//! vehicle, each with a speed demand. When TlFusion demands a stop the
//! horizon is cut at the stop line and the speeds ramp down so the vehicle
//! comes to rest just short of it. The plan also carries the linear and
//! angular rate targets consumed by the drive by wire control module.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during TrajPlan operation.
#[derive(Debug, thiserror::Error)]
pub enum TrajPlanError {
    #[error("The module has not been initialised")]
    NotInitialised,

    #[error("Stop waypoint {0} is not on the route")]
    InvalidStopIdx(i64)
}
