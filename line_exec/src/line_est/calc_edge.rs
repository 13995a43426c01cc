//! Contrast/edge line error calculation

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;

use super::LineEst;
use crate::sensor_array::SensorSample;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LineEst {

    /// Calculate the line error from the contrast edges either side of the centre channel.
    ///
    /// The mean reading is removed and the result normalised by the spread, so a uniform change
    /// in lighting leaves the error unchanged. An edge is the step from a side channel into the
    /// centre, signed so that stepping onto the line is positive whatever its polarity. The
    /// dominant edge decides which side the line is on.
    pub(crate) fn calc_edge(&mut self, sample: &SensorSample) -> f64 {
        let p = &self.params;
        let res = sample.residuals();
        let spread = self.report.spread + p.spread_eps;
        let pol = p.polarity.edge_sign();

        let edge_l = pol * (res[1] - res[0]) / spread;
        let edge_r = pol * (res[1] - res[2]) / spread;

        let mag_l = edge_l.abs();
        let mag_r = edge_r.abs();

        if mag_l.max(mag_r) < p.edge_mag_thresh
            || (mag_l - mag_r).abs() < p.edge_asym_thresh
            || mag_l == mag_r
        {
            debug!(
                "LineEst: ambiguous edges (left {:+.3}, right {:+.3}), holding centre",
                edge_l, edge_r
            );
            self.report.ambiguous = true;
            return 0.0
        }

        // Line on the left steps up into the centre from the left, and the reverse on the right
        let mut error = if mag_l > mag_r { edge_l } else { -edge_r };

        // Both edges strong: the line is turning hard (or crossing), so push harder toward the
        // dominant side
        if mag_l > p.corner_edge_thresh && mag_r > p.corner_edge_thresh {
            self.report.corner = true;
            error = error.signum() * (mag_l + mag_r);
        }

        p.damping * error
    }
}

#[cfg(test)]
mod test {
    use crate::line_est::*;
    use crate::sensor_array::SensorSample;

    #[test]
    fn test_weak_edges_ambiguous() {
        let mut e = LineEst::new(Params {
            spread_thresh: 0.0,
            ..Default::default()
        }).unwrap();

        // Flat reading has no edges at all
        let s = SensorSample::new(1000.0, 1000.0, 1000.0);
        assert_eq!(e.calc_edge(&s), 0.0);
        assert!(e.report.ambiguous);
    }

    #[test]
    fn test_single_edge() {
        let mut e = LineEst::new(Params::default()).unwrap();
        let s = SensorSample::new(1000.0, 1600.0, 1600.0);
        e.report.spread = s.spread();

        // mean 1400, residuals -400, 200, 200, spread 400: left edge 1.5
        let error = e.calc_edge(&s);
        assert!((error - 0.7 * 1.5).abs() < 1e-6);
        assert!(!e.report.ambiguous);
        assert!(!e.report.corner);
    }

    #[test]
    fn test_corner() {
        let mut e = LineEst::new(Params::default()).unwrap();

        // Centre bright between two dark channels of different darkness
        let s = SensorSample::new(100.0, 2000.0, 600.0);
        e.report.spread = s.spread();

        let res = s.residuals();
        let edge_l = (res[1] - res[0]) / s.spread();
        let edge_r = (res[1] - res[2]) / s.spread();
        assert!(edge_l > 1.0 && edge_r > 1.0);

        let error = e.calc_edge(&s);
        assert!(e.report.corner);
        assert!((error - 0.7 * (edge_l + edge_r)).abs() < 1e-6);

        // Mirrored the push is to the other side
        let mut e = LineEst::new(Params::default()).unwrap();
        e.report.spread = s.spread();
        assert!((e.calc_edge(&s.mirrored()) + error).abs() < 1e-9);
    }
}
