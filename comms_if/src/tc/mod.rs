//! # Telecommand module
//!
//! This module provides telecommand functionality to the communications 
//! interface.
//!
//! Telecommands are JSON objects with a `type` and an optional `payload`:
//!
//! ```json
//! {"type": "SET_LINE_REF", "payload": [1400, 1400, 1400]}
//! {"type": "OVERRIDE", "payload": {"power": 20, "str_angle_deg": -10}}
//! {"type": "STOP"}
//! ```

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod follow;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Serialize, Deserialize};
use serde_json::{self, Value};
use thiserror::Error;

// Internal
use follow::{DriveOverride, StrategyId};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the line follower by an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tc {
    /// No operation.
    None,

    /// Stop the control loop and bring the vehicle to rest.
    Stop,

    /// Replace the in-memory line calibration reference.
    SetLineRef([f64; 3]),

    /// Replace the in-memory cliff calibration reference.
    SetCliffRef([f64; 3]),

    /// Select the line error estimation strategy.
    SetStrategy(StrategyId),

    /// Capture the next sensor sample as the centred target profile.
    CalibrateTarget,

    /// Take manual control of drive power and steering.
    Override(DriveOverride),

    /// Return control to the line follower.
    ClearOverride,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("TC has an invalid type ({0})")]
    InvalidType(String),

    #[error("TC of type {0} has an invalid or missing payload: {1}")]
    InvalidPayload(String, serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {

    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        // Parse the JSON string into a value first so type errors can be reported separately from
        // payload errors.
        let val: Value = match serde_json::from_str(json_str) {
            Ok(v) => v,
            Err(e) => return Err(TcParseError::InvalidJson(e))
        };

        let tc_type = match val["type"].as_str() {
            Some(s) => s.to_string(),
            None => return Err(TcParseError::InvalidType(String::from(
                "Expected \"type\" to be a string"
            )))
        };

        if !Self::TYPES.contains(&tc_type.as_str()) {
            return Err(TcParseError::InvalidType(
                format!("{} is not a recognised TC type", tc_type)
            ))
        }

        serde_json::from_value(val).map_err(|e| TcParseError::InvalidPayload(tc_type, e))
    }

    /// Serialise the TC into JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// All recognised values of the `type` field.
    const TYPES: [&'static str; 8] = [
        "NONE",
        "STOP",
        "SET_LINE_REF",
        "SET_CLIFF_REF",
        "SET_STRATEGY",
        "CALIBRATE_TARGET",
        "OVERRIDE",
        "CLEAR_OVERRIDE",
    ];
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_unit_tcs() {
        assert_eq!(Tc::from_json(r#"{"type": "STOP"}"#).unwrap(), Tc::Stop);
        assert_eq!(
            Tc::from_json(r#"{"type": "CLEAR_OVERRIDE"}"#).unwrap(),
            Tc::ClearOverride
        );
    }

    #[test]
    fn test_parse_payload_tcs() {
        assert_eq!(
            Tc::from_json(r#"{"type": "SET_LINE_REF", "payload": [1400, 1300.5, 1200]}"#)
                .unwrap(),
            Tc::SetLineRef([1400.0, 1300.5, 1200.0])
        );
        assert_eq!(
            Tc::from_json(r#"{"type": "SET_STRATEGY", "payload": "CENTROID"}"#).unwrap(),
            Tc::SetStrategy(StrategyId::Centroid)
        );
        assert_eq!(
            Tc::from_json(
                r#"{"type": "OVERRIDE", "payload": {"power": 20, "str_angle_deg": -10}}"#
            ).unwrap(),
            Tc::Override(DriveOverride { power: 20.0, str_angle_deg: -10.0 })
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Tc::from_json("{not json"),
            Err(TcParseError::InvalidJson(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "PARALLEL_PARK"}"#),
            Err(TcParseError::InvalidType(_))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"payload": 3}"#),
            Err(TcParseError::InvalidType(_))
        ));
        // A reference must have exactly three entries
        assert!(matches!(
            Tc::from_json(r#"{"type": "SET_LINE_REF", "payload": [1, 2]}"#),
            Err(TcParseError::InvalidPayload(_, _))
        ));
        assert!(matches!(
            Tc::from_json(r#"{"type": "OVERRIDE"}"#),
            Err(TcParseError::InvalidPayload(_, _))
        ));
    }

    #[test]
    fn test_json_cycle() {
        let tc = Tc::SetCliffRef([200.0, 210.0, 190.0]);
        let json = tc.to_json().unwrap();
        assert_eq!(Tc::from_json(&json).unwrap(), tc);
    }
}
