//! # Line following telecommand payloads

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A manual drive demand which replaces the automatic line following output while it is active.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveOverride {
    /// Requested drive power, between -100 and 100.
    ///
    /// Positive power is "forwards".
    pub power: f64,

    /// Requested steering angle in degrees. Clamped by locomotion control to its steering range.
    pub str_angle_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Identifies one of the line error estimation strategies.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyId {
    /// Contrast/edge based estimation.
    Edge,

    /// Reference-weighted centroid of the sensor positions.
    Centroid,

    /// Deviation from a calibrated centred sensor profile.
    Target,
}
