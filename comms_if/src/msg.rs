//! # Vehicle bus message module
//!
//! This module provides the messages which arrive at the drive software from
//! the rest of the vehicle, either over the bus or from a scenario script.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use serde_json::{self, Value};
use thiserror::Error;

// Internal
use crate::eqpt::tl::LightState;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A message sent to the drive software by the rest of the vehicle.
///
/// The `type` field of the JSON representation identifies the message, and
/// should be used by the software's message processor to determine where to
/// send the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VehMsg {
    /// Hand authority over the actuators to the software
    DbwEnable,

    /// Return authority over the actuators to the driver
    DbwDisable,

    /// The latest pose estimate from the localisation system
    Pose {
        /// Position along the map X axis in meters
        x_m: f64,

        /// Position along the map Y axis in meters
        y_m: f64,

        /// Heading about the map Z+ (upwards) axis in radians
        yaw_rad: f64
    },

    /// The latest velocity feedback from the vehicle
    Twist {
        /// Linear (forwards) velocity in meters/second
        linear_ms: f64,

        /// Angular velocity about the Z+ axis in radians/second
        angular_rads: f64
    },

    /// Ground truth light states from the simulator
    Lights {
        lights: Vec<LightState>
    }
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum MsgParseError {
    #[error("Message contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("Message has an invalid type ({0})")]
    InvalidType(String),

    #[error("Message body is invalid: {0}")]
    InvalidBody(serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehMsg {

    /// Parse a new message from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, MsgParseError> {
        // Parse the JSON string into a value
        let val: Value = match serde_json::from_str(json_str) {
            Ok(v) => v,
            Err(e) => return Err(MsgParseError::InvalidJson(e))
        };

        // Check the type of the message is present before handing over to
        // serde, so that a missing type gets a clearer error than a bad body
        match val["type"].as_str() {
            Some(_) => (),
            None => return Err(MsgParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };

        match serde_json::from_value(val) {
            Ok(m) => Ok(m),
            Err(e) => Err(MsgParseError::InvalidBody(e))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::tl::LightClass;

    #[test]
    fn test_from_json() {
        let msg = VehMsg::from_json(
            r#"{"type": "pose", "x_m": 1.0, "y_m": -2.0, "yaw_rad": 0.5}"#
        ).unwrap();

        assert_eq!(msg, VehMsg::Pose { x_m: 1.0, y_m: -2.0, yaw_rad: 0.5 });

        let msg = VehMsg::from_json(
            r#"{"type": "lights", "lights": [
                {"x_m": 10.0, "y_m": 0.0, "class": "Red"}
            ]}"#
        ).unwrap();

        match msg {
            VehMsg::Lights { lights } => {
                assert_eq!(lights.len(), 1);
                assert_eq!(lights[0].class, LightClass::Red);
            }
            _ => panic!("Expected a lights message")
        }
    }

    #[test]
    fn test_from_json_errors() {
        assert!(matches!(
            VehMsg::from_json("not json at all"),
            Err(MsgParseError::InvalidJson(_))
        ));
        assert!(matches!(
            VehMsg::from_json(r#"{"x_m": 1.0}"#),
            Err(MsgParseError::InvalidType(_))
        ));
        assert!(matches!(
            VehMsg::from_json(r#"{"type": "pose", "x_m": 1.0}"#),
            Err(MsgParseError::InvalidBody(_))
        ));
    }
}
