//! Drive by wire control module
//!
//! DbwCtrl turns the twist targets published by the trajectory planner into
//! throttle, brake and steering demands for the drive by wire unit. While
//! drive by wire is disabled the controllers are held reset so that no stale
//! state kicks the vehicle when it is re-enabled.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod controllers;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during DbwCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum DbwCtrlError {
    #[error("The module has not been initialised")]
    NotInitialised
}
