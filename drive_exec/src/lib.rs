//! # Drive library.
//!
//! This library allows other crates in the workspace to access items defined inside the drive
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Camera client - recieves frames pushed by the platform's camera feed
pub mod cam_client;

/// Global data store for the executable
pub mod data_store;

/// Localisation types - the vehicle's idea of where it is in the world
pub mod loc;

/// Route module - the fixed list of waypoints the vehicle follows, plus the spatial index over it
pub mod route;

/// Drive by wire control module - converts the planned trajectory into actuator demands
pub mod dbw_ctrl;

/// Traffic light fusion module - debounces light classifications into a committed stop decision
pub mod tl_fusion;

/// Trajectory planning module - builds the look-ahead plan with the deceleration profile
pub mod traj_plan;
