//! # Steering control module
//!
//! Steering control turns the line error into a steering angle demand using a PD controller.
//! There is no integral term: a line follower has no steady-state disturbance worth integrating
//! and the integral winds up every time the line is lost.
//!
//! The gains can be fixed, or scheduled with the size of the error so that large errors are
//! corrected harder (more proportional) while small ones are damped less.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use controllers::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the controller gains follow the size of the error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GainSchedule {
    /// Use `k_p` and `k_d` as configured.
    Fixed,

    /// `k_p * (1 + kp_scale * |e|)` and `k_d / (1 + kd_scale * |e|)`.
    Adaptive {
        kp_scale: f64,
        kd_scale: f64
    }
}

/// Possible errors that can occur during SteerCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum SteerCtrlError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(&'static str),

    #[error("Could not load the parameters: {0}")]
    ParamLoad(#[from] util::params::LoadError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl GainSchedule {

    /// Get the `(k_p, k_d)` pair to use for the given error.
    pub fn gains(&self, k_p: f64, k_d: f64, error: f64) -> (f64, f64) {
        match *self {
            GainSchedule::Fixed => (k_p, k_d),
            GainSchedule::Adaptive { kp_scale, kd_scale } => {
                let mag = error.abs();
                (k_p * (1.0 + kp_scale * mag), k_d / (1.0 + kd_scale * mag))
            }
        }
    }
}
