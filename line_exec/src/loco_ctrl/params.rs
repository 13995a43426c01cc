//! Parameters structure for LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Locomotion control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- CAPABILITIES ----

    /// Maximum steering angle either side of straight ahead.
    ///
    /// Units: degrees
    pub max_str_angle_deg: f64,

    /// Maximum wheel power magnitude.
    pub max_power: f64,

    // ---- WIRING ----

    /// Sign applied to the left wheel power for forward motion.
    pub left_sign: f64,

    /// Sign applied to the right wheel power for forward motion.
    pub right_sign: f64,

    /// Offset added to every angle written to the steering servo, so that a zero demand points
    /// the wheels straight ahead.
    ///
    /// Units: degrees
    pub str_trim_deg: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            max_str_angle_deg: 30.0,
            max_power: 100.0,
            left_sign: 1.0,
            right_sign: -1.0,
            str_trim_deg: 0.0,
        }
    }
}
