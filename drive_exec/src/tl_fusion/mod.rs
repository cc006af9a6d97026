//! Traffic light fusion module
//!
//! TlFusion decides whether the vehicle must stop for a traffic light. It
//! takes light observations (from the classifier worker or directly from the
//! simulator ground truth), debounces them over consecutive frames, and
//! publishes the route waypoint of the stop line to halt at, or `-1` if
//! there is nothing to stop for.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;
mod worker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;
pub use worker::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of consecutive frames that must agree on a light class before
/// it is committed as the published state.
pub const STATE_COUNT_THRESHOLD: u32 = 3;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during TlFusion operation.
#[derive(Debug, thiserror::Error)]
pub enum TlFusionError {
    #[error("The module has not been initialised")]
    NotInitialised,

    #[error(
        "Recieved {num_lights} light states but {num_stop_lines} stop lines \
        are defined"
    )]
    StopLineCountMismatch {
        num_lights: usize,
        num_stop_lines: usize
    },

    #[error("Could not decode a camera frame: {0}")]
    ImageDecodeError(image::ImageError),

    #[error("The classifier failed to process a frame: {0}")]
    ClassifierError(String),

    #[error("Failed to send signal {0:?} between threads")]
    SendError(WorkerSignal)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<std::sync::mpsc::SendError<WorkerSignal>> for TlFusionError {
    fn from(e: std::sync::mpsc::SendError<WorkerSignal>) -> Self {
        Self::SendError(e.0)
    }
}
