//! # Line following control module
//!
//! Closes the loop between the line sensor and the chassis. Each tick:
//!
//! 1. The sensor array is read and filtered.
//! 2. The line error and loss state are estimated.
//! 3. While tracking, steering control turns the error into a steering angle and locomotion
//!    control drives at the tracking power. While recovering, a fixed recovery manoeuvre is
//!    driven instead.
//! 4. The demands are written to the chassis.
//!
//! External collaborators talk to the loop through a `FollowHandle`, which can be cloned and
//! shared between threads. Requests made through the handle are picked up once at the start of
//! the next tick.
//!
//! Whatever way the loop ends (stop request, fault, or the controller being dropped) the wheels
//! are stopped and the steering returned to neutral.
//!
//! Each module is driven through its `State::proc`, and the status reports of the estimator,
//! steering and locomotion control are carried in the loop's own `StatusReport`.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod handle;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use handle::*;
pub use params::*;
pub use state::*;
use crate::{
    eqpt::EqptError,
    line_est::{CalibRef, LineEstError},
    loco_ctrl::LocoCtrlError,
    sensor_array::SensorArrayError,
    steer_ctrl::SteerCtrlError
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The mode of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FollowMode {
    /// The line is seen and steering control is active.
    Tracking,

    /// The line is lost and the recovery manoeuvre is being driven.
    Recovering,
}

/// The manoeuvre driven while the line is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryMode {
    /// Steer straight ahead and creep forwards.
    Neutral,

    /// Full steering lock toward the side the line was last seen on, reversing.
    SignBiased,
}

/// Possible errors that can occur during FollowCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum FollowError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(&'static str),

    #[error("Invalid calibration reference {0:?}, every channel must be a finite number")]
    InvalidCalibRef(CalibRef),

    #[error("Could not load the parameters: {0}")]
    ParamLoad(#[from] util::params::LoadError),

    #[error("Line sensor failure: {0}")]
    Sensor(#[from] SensorArrayError),

    #[error("Line estimation error: {0}")]
    LineEst(#[from] LineEstError),

    #[error("Steering control error: {0}")]
    SteerCtrl(#[from] SteerCtrlError),

    #[error("Locomotion control error: {0}")]
    LocoCtrl(#[from] LocoCtrlError),

    #[error("Actuator failure, chassis stopped: {0}")]
    Actuator(EqptError),
}
