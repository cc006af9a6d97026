//! Parameters structure for TlFusion

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Traffic light fusion.
#[derive(Debug, Default, Deserialize)]
pub struct Params {

    /// Position of each stop line in the map frame. The order of this list
    /// matches the order of the light states published by the simulator.
    ///
    /// Units: meters,
    /// Frame: Map
    pub stop_line_pos_m: Vec<[f64; 2]>,

    /// Classifications below this confidence are treated as `Unknown`.
    pub confidence_threshold: f64,

    /// Maximum distance between a stop line and its associated route
    /// waypoint before a warning is raised.
    ///
    /// Units: meters
    pub max_stop_line_wp_dist_m: f64
}
