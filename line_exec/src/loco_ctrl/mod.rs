//! Locomotion control module
//!
//! Converts a requested drive power and steering angle into the powers of the two rear drive
//! wheels. The inner wheel is slowed by the cosine of the steering angle so the rear axle doesn't
//! scrub in turns.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod params;
mod state;
mod calc_ackerman;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Serialize;

// Internal
pub use cmd::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Signed power of each drive wheel, in `[-max_power, max_power]`.
///
/// The motors are mounted mirrored, so driving straight forward is `(+p, -p)` with the default
/// wheel signs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WheelPowers {
    pub left: f64,
    pub right: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LocoCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum LocoCtrlError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(&'static str),

    #[error("Could not load the parameters: {0}")]
    ParamLoad(#[from] util::params::LoadError),

    #[error("Recieved an invalid drive command: {0:?}")]
    InvalidCmd(DriveCmd),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WheelPowers {
    /// Both wheels stopped.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The powers with both signs flipped.
    pub fn reversed(&self) -> Self {
        Self {
            left: -self.left,
            right: -self.right
        }
    }
}
