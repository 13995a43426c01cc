//! Parameters structure for LineEst

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use super::{CalibRef, EstStrategy, LossTest, Polarity};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for line error estimation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- CONFIGURATION ----

    /// Strategy used at startup.
    pub strategy: EstStrategy,

    /// Polarity of the line against the floor.
    pub polarity: Polarity,

    /// Test used for loss detection.
    pub loss_test: LossTest,

    /// Startup line calibration reference.
    pub line_ref: CalibRef,

    /// Startup cliff calibration reference.
    pub cliff_ref: CalibRef,

    /// Centred target profile for the target strategy, if already calibrated.
    pub target: Option<[f64; 3]>,

    // ---- THRESHOLDS ----

    /// Contrast spread (largest deviation of a channel from the mean) below which the line is
    /// lost.
    ///
    /// Units: raw sensor units
    pub spread_thresh: f64,

    /// Minimum normalised edge magnitude for a reading to be trusted.
    pub edge_mag_thresh: f64,

    /// Minimum difference between the normalised edge magnitudes for a reading to be directional.
    pub edge_asym_thresh: f64,

    /// Normalised edge magnitude above which both edges are considered strong (a corner or an
    /// intersection).
    pub corner_edge_thresh: f64,

    /// Gain applied to the edge error before clamping.
    pub damping: f64,

    /// Added to the spread before normalising.
    pub spread_eps: f64,

    /// Added to the target profile's left-right span before normalising.
    ///
    /// Units: raw sensor units
    pub target_eps: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            strategy: EstStrategy::Edge,
            polarity: Polarity::Dark,
            loss_test: LossTest::Spread,
            line_ref: CalibRef([1000.0; 3]),
            cliff_ref: CalibRef([500.0; 3]),
            target: None,
            spread_thresh: 25.0,
            edge_mag_thresh: 0.15,
            edge_asym_thresh: 0.10,
            corner_edge_thresh: 1.0,
            damping: 0.7,
            spread_eps: 1e-6,
            target_eps: 50.0,
        }
    }
}
