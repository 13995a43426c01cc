//! Steering control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use super::GainSchedule;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for steering control
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {

    /// Proportional gain
    ///
    /// Units: degrees per unit error
    pub k_p: f64,

    /// Derivative gain
    ///
    /// Units: degrees per unit error per second
    pub k_d: f64,

    /// Gain schedule applied on top of `k_p` and `k_d`.
    pub gain_schedule: GainSchedule,

    /// Weight of the previous filtered error in the error filter. Zero disables the filter.
    pub filter_beta: f64,

    /// Smallest time step used in the derivative.
    ///
    /// Units: seconds
    pub min_dt_s: f64,

    /// Steering angle demand limit.
    ///
    /// Units: degrees
    pub max_str_angle_deg: f64,

    /// Polarity of the steering output, `+1` or `-1`. Set to `-1` on a vehicle whose servo turns
    /// away from the line for a positive angle.
    pub str_sign: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            k_p: 15.0,
            k_d: 5.0,
            gain_schedule: GainSchedule::Fixed,
            filter_beta: 0.0,
            min_dt_s: 1e-3,
            max_str_angle_deg: 30.0,
            str_sign: 1.0,
        }
    }
}
