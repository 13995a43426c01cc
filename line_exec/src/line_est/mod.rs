//! Line error estimation module
//!
//! Converts a filtered `SensorSample` into a signed lateral line error in [-1, 1] and a "line
//! lost" flag.
//!
//! # Sign convention
//!
//! A positive error means the line is toward the left sensor, and the steering controller turns
//! that into a positive steering angle. Mirroring a sample (swapping left and right) negates the
//! error for every strategy.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;
mod calc_edge;
mod calc_centroid;
mod calc_target;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use params::*;
pub use state::*;
use crate::sensor_array::SensorSample;
use comms_if::tc::follow::StrategyId;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A calibration reference, one threshold per channel, ordered left, centre, right.
///
/// Used to classify each channel as line or background (line references) or as floor or drop-off
/// (cliff references). It never feeds the continuous error of the edge strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibRef(pub [f64; 3]);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Strategies available to compute the line error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstStrategy {
    /// Contrast/edge based, lighting invariant. The default.
    Edge,

    /// Strength-weighted centroid of the channels past their calibration reference.
    Centroid,

    /// Deviation from a calibrated centred profile.
    Target,
}

/// Whether the tracked line is darker or lighter than the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// Dark line on a light floor, the line reads lower than the floor.
    Dark,

    /// Light line on a dark floor, the line reads higher than the floor.
    Light,
}

/// How to decide that the line has been lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossTest {
    /// Lost when the contrast spread collapses, independent of the calibration reference.
    Spread,

    /// Lost when the spread collapses or when no channel classifies differently from the others
    /// against the calibration reference.
    Reference,
}

/// Possible errors that can occur during LineEst operation.
#[derive(Debug, thiserror::Error)]
pub enum LineEstError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(&'static str),

    #[error("Could not load the parameters: {0}")]
    ParamLoad(#[from] util::params::LoadError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CalibRef {
    /// A reference halfway between a reading over the line and a reading over the background.
    pub fn from_line_and_background(line: &SensorSample, background: &SensorSample) -> Self {
        let mid = (line.values() + background.values()) * 0.5;
        Self([mid[0], mid[1], mid[2]])
    }

    /// Classify each channel, `true` meaning the channel sees the line.
    pub fn classify(&self, sample: &SensorSample, polarity: Polarity) -> [bool; 3] {
        let mut status = [false; 3];
        for (i, s) in status.iter_mut().enumerate() {
            *s = match polarity {
                Polarity::Dark => sample.values()[i] <= self.0[i],
                Polarity::Light => sample.values()[i] > self.0[i],
            };
        }
        status
    }

    /// Whether every entry is a finite number.
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl Polarity {
    /// Sign applied to the edge signals so that the line always produces a positive step into it.
    pub fn edge_sign(&self) -> f64 {
        match self {
            Polarity::Dark => 1.0,
            Polarity::Light => -1.0,
        }
    }
}

impl From<StrategyId> for EstStrategy {
    fn from(id: StrategyId) -> Self {
        match id {
            StrategyId::Edge => EstStrategy::Edge,
            StrategyId::Centroid => EstStrategy::Centroid,
            StrategyId::Target => EstStrategy::Target,
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Determine if the robot is over a cliff (or the sensor has been lifted off the floor).
///
/// Almost no light is reflected from a drop-off, so any channel reading at or below its cliff
/// threshold means danger.
pub fn cliff_status(sample: &SensorSample, cliff_ref: &CalibRef) -> bool {
    sample
        .values()
        .iter()
        .zip(cliff_ref.0.iter())
        .any(|(v, r)| v <= r)
}
