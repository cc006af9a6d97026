//! # Traffic Light Equipment Communications Module

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A classification produced by the classifier for a single camera frame
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct Classification {
    /// The class assigned to the frame
    pub class: LightClass,

    /// Confidence in the assigned class, between 0 and 1 where 1 is certain.
    pub confidence: f64
}

/// Ground truth state of a single light, as published by the simulator
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct LightState {
    /// Position of the light along the map X axis in meters
    pub x_m: f64,

    /// Position of the light along the map Y axis in meters
    pub y_m: f64,

    /// The current class of the light
    pub class: LightClass
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Possible classes of a traffic light.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Hash, Eq, PartialEq)]
pub enum LightClass {
    Red,
    Yellow,
    Green,

    /// The light state could not be determined
    Unknown
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for LightClass {
    fn default() -> Self {
        LightClass::Unknown
    }
}
