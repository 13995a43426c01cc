//! Parameters structure for FollowCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use super::RecoveryMode;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the line following control loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    /// Target period of one tick.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Drive power while tracking the line.
    pub tracking_power: f64,

    /// Manoeuvre driven while the line is lost.
    pub recovery_mode: RecoveryMode,

    /// Fraction of `tracking_power` used while recovering.
    pub recovery_power_frac: f64,

    /// Stop the wheels on any tick where a cliff is detected.
    pub cliff_guard: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            cycle_period_s: 0.01,
            tracking_power: 10.0,
            recovery_mode: RecoveryMode::Neutral,
            recovery_power_frac: 0.5,
            cliff_guard: false,
        }
    }
}
