//! Line sensor array module
//!
//! Reads the three analog line sensor channels and low-pass filters them into a `SensorSample`
//! once per cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector3;
use serde::Serialize;

// Internal
pub use params::*;
pub use state::*;
use crate::eqpt::EqptError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A filtered reading of the line sensor, ordered left, centre, right.
///
/// Produced once per cycle by the `SensorArray` and never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSample(Vector3<f64>);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A single faulty read. The previous filtered value is kept for the cycle.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorFault {
    #[error("Equipment error: {0}")]
    Eqpt(EqptError),

    #[error("Channel {channel} read {value}, outside the valid range")]
    OutOfRange { channel: usize, value: f64 },
}

/// Possible errors that can occur during SensorArray operation.
#[derive(Debug, thiserror::Error)]
pub enum SensorArrayError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(&'static str),

    #[error("Could not load the parameters: {0}")]
    ParamLoad(#[from] util::params::LoadError),

    #[error("{0} consecutive faulty reads, last fault: {1}")]
    FaultLimitExceeded(u64, SensorFault),

    #[error("Reading the sensor took {0:.6} s, longer than the {1:.6} s limit")]
    ReadOverrun(f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SensorSample {
    /// Create a sample from the left, centre and right readings.
    pub fn new(left: f64, centre: f64, right: f64) -> Self {
        Self(Vector3::new(left, centre, right))
    }

    pub fn left(&self) -> f64 {
        self.0[0]
    }

    pub fn centre(&self) -> f64 {
        self.0[1]
    }

    pub fn right(&self) -> f64 {
        self.0[2]
    }

    /// The readings as a vector.
    pub fn values(&self) -> &Vector3<f64> {
        &self.0
    }

    /// The same sample seen by a robot mirrored about its centreline.
    pub fn mirrored(&self) -> Self {
        Self::new(self.right(), self.centre(), self.left())
    }

    /// The readings with their mean removed, which cancels ambient lighting.
    pub fn residuals(&self) -> Vector3<f64> {
        self.0.add_scalar(-self.0.mean())
    }

    /// The largest absolute deviation of a channel from the mean.
    pub fn spread(&self) -> f64 {
        self.residuals().amax()
    }
}

impl From<[f64; 3]> for SensorSample {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}
