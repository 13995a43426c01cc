//! Centroid line error calculation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::{CalibRef, LineEst, Polarity};
use crate::sensor_array::SensorSample;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Lateral position of each channel, left to right.
const CHANNEL_POSITIONS: [f64; 3] = [1.0, 0.0, -1.0];

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineEst {

    /// Calculate the line error as the strength-weighted centroid of the channel positions.
    ///
    /// A channel's strength is how far past its calibration reference it reads, relative to the
    /// reference. Channels on the background side of the reference have no strength.
    pub(crate) fn calc_centroid(&self, sample: &SensorSample, reference: &CalibRef) -> f64 {
        let mut weighted = 0.0;
        let mut total = 0.0;

        for i in 0..3 {
            let v = sample.values()[i];
            let r = reference.0[i];
            let denom = r.abs().max(self.params.spread_eps);

            let strength = match self.params.polarity {
                Polarity::Dark => (r - v) / denom,
                Polarity::Light => (v - r) / denom,
            }.max(0.0);

            weighted += strength * CHANNEL_POSITIONS[i];
            total += strength;
        }

        if total > 0.0 {
            weighted / total
        }
        else {
            0.0
        }
    }
}
