//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Vehicle bus message definitions
pub mod msg;

/// Command and response definitions for equipment (like the drive by wire unit)
pub mod eqpt;
