//! Target profile line error calculation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;

use super::{LineEst, Polarity};
use crate::sensor_array::SensorSample;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineEst {

    /// Calculate the line error from the deviation of the side channels from the calibrated
    /// centred profile.
    ///
    /// Falls back to the edge strategy while no target has been calibrated.
    pub(crate) fn calc_target(&mut self, sample: &SensorSample) -> f64 {
        let target = match self.target {
            Some(t) => t,
            None => {
                if !self.target_missing_warned {
                    warn!("LineEst: no calibrated target, using the edge strategy");
                    self.target_missing_warned = true;
                }
                self.report.target_missing = true;
                return self.calc_edge(sample)
            }
        };

        // A dark line under the left sensor drives the left reading down
        let sign = match self.params.polarity {
            Polarity::Dark => -1.0,
            Polarity::Light => 1.0,
        };

        let dev_l = sample.left() - target.left();
        let dev_r = sample.right() - target.right();
        let norm = (target.left() - target.right()).abs() + self.params.target_eps;

        sign * (dev_l - dev_r) / norm
    }
}
