//! Implementations for the LineEst state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{info, trace};
use serde::Serialize;

// Internal
use super::{CalibRef, EstStrategy, LineEstError, LossTest, Params};
use crate::sensor_array::SensorSample;
use util::{maths::clamp_sym, module::State, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Line error estimator state
#[derive(Debug, Clone)]
pub struct LineEst {
    pub(crate) params: Params,

    /// Strategy currently in use.
    pub(crate) strategy: EstStrategy,

    /// Calibrated centred profile for the target strategy.
    pub(crate) target: Option<SensorSample>,

    /// Set once the missing target has been reported, so the warning isn't repeated every cycle.
    pub(crate) target_missing_warned: bool,

    pub(crate) report: StatusReport,
}

/// Input data to line estimation.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    pub sample: SensorSample,
    pub reference: CalibRef,
}

/// The output of one estimation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineEstimate {
    /// Signed line error in [-1, 1], positive toward the left sensor.
    pub error: f64,

    /// Whether the line is lost. When lost `error` is zero.
    pub lost: bool,
}

/// Status report for LineEst processing.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    /// Strategy which produced the estimate.
    pub strategy: EstStrategy,

    /// Contrast spread of the sample.
    pub spread: f64,

    /// Edges present but not decisive, the estimate is zero.
    pub ambiguous: bool,

    /// Both edges were strong and were summed.
    pub corner: bool,

    /// The target strategy was selected without a calibrated target, the edge strategy was used.
    pub target_missing: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for StatusReport {
    fn default() -> Self {
        Self {
            strategy: EstStrategy::Edge,
            spread: 0.0,
            ambiguous: false,
            corner: false,
            target_missing: false,
        }
    }
}

impl LineEst {

    /// Create a new estimator from the given parameters.
    pub fn new(params: Params) -> Result<Self, LineEstError> {
        validate(&params)?;

        Ok(Self {
            strategy: params.strategy,
            target: params.target.map(SensorSample::from),
            target_missing_warned: false,
            report: StatusReport::default(),
            params,
        })
    }

    /// Estimate the line error and loss state for a sample.
    ///
    /// The error is always in [-1, 1], and is zero whenever the line is lost.
    pub fn estimate(&mut self, sample: &SensorSample, reference: &CalibRef) -> (f64, bool) {
        self.report = StatusReport {
            strategy: self.strategy,
            spread: sample.spread(),
            ..Default::default()
        };

        if self.is_lost(sample, reference) {
            trace!("LineEst: line lost (spread {:.3})", self.report.spread);
            return (0.0, true)
        }

        let error = match self.strategy {
            EstStrategy::Edge => self.calc_edge(sample),
            EstStrategy::Centroid => self.calc_centroid(sample, reference),
            EstStrategy::Target => self.calc_target(sample),
        };

        // NaN can only come from non-finite samples, which the sensor array rejects, but the
        // clamp does not catch it so map it to "go straight".
        let error = if error.is_nan() { 0.0 } else { clamp_sym(error, 1.0) };

        trace!("LineEst: {:?} error {:+.3}", self.strategy, error);

        (error, false)
    }

    /// Determine if the line is lost.
    fn is_lost(&self, sample: &SensorSample, reference: &CalibRef) -> bool {
        // The spread is taken about the mean so it does not depend on the absolute brightness.
        let spread_lost = self.report.spread < self.params.spread_thresh;

        match self.params.loss_test {
            LossTest::Spread => spread_lost,
            LossTest::Reference => {
                let status = reference.classify(sample, self.params.polarity);
                spread_lost || status.iter().all(|&s| s == status[0])
            }
        }
    }

    /// Select the estimation strategy.
    pub fn set_strategy(&mut self, strategy: EstStrategy) {
        if strategy != self.strategy {
            info!("LineEst strategy changed from {:?} to {:?}", self.strategy, strategy);
            self.strategy = strategy;
            self.target_missing_warned = false;
        }
    }

    /// The estimation strategy in use.
    pub fn strategy(&self) -> EstStrategy {
        self.strategy
    }

    /// Record the given sample as the centred target profile.
    pub fn calibrate_target(&mut self, sample: &SensorSample) {
        info!("LineEst target calibrated to {:?}", sample.values().as_slice());
        self.target = Some(*sample);
        self.target_missing_warned = false;
    }

    /// The centred target profile, if calibrated.
    pub fn target(&self) -> Option<&SensorSample> {
        self.target.as_ref()
    }

    /// Status report of the last estimate.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl State for LineEst {
    type InitData = &'static str;
    type InitError = LineEstError;

    type InputData = InputData;
    type OutputData = LineEstimate;
    type StatusReport = StatusReport;
    type ProcError = LineEstError;

    /// Initialise the LineEst module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data)?;
        *self = Self::new(params)?;
        Ok(())
    }

    /// Perform cyclic processing of LineEst.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let (error, lost) = self.estimate(&input_data.sample, &input_data.reference);
        Ok((LineEstimate { error, lost }, self.report))
    }
}

fn validate(params: &Params) -> Result<(), LineEstError> {
    if !params.line_ref.is_valid() || !params.cliff_ref.is_valid() {
        return Err(LineEstError::InvalidParams("calibration references must be finite"))
    }
    if params.spread_thresh < 0.0
        || params.edge_mag_thresh < 0.0
        || params.edge_asym_thresh < 0.0
        || params.corner_edge_thresh < 0.0
    {
        return Err(LineEstError::InvalidParams("thresholds must not be negative"))
    }
    if !(params.spread_eps > 0.0) || !(params.target_eps > 0.0) {
        return Err(LineEstError::InvalidParams("spread_eps and target_eps must be positive"))
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::line_est::{LossTest, Polarity};

    const REF: CalibRef = CalibRef([1400.0, 1400.0, 1400.0]);

    fn est(strategy: EstStrategy) -> LineEst {
        LineEst::new(Params {
            strategy,
            line_ref: REF,
            target: Some([1900.0, 300.0, 1900.0]),
            ..Default::default()
        }).unwrap()
    }

    /// A spread of samples covering centred, offset, corner, lost and extreme readings.
    fn samples() -> Vec<SensorSample> {
        let mut v = vec![];
        let levels = [0.0, 100.0, 450.0, 900.0, 1400.0, 1401.0, 2000.0, 3000.0, 4095.0];
        for &l in levels.iter() {
            for &c in levels.iter() {
                for &r in levels.iter() {
                    v.push(SensorSample::new(l, c, r));
                }
            }
        }
        v
    }

    #[test]
    fn test_error_always_bounded() {
        for strategy in [EstStrategy::Edge, EstStrategy::Centroid, EstStrategy::Target].iter() {
            let mut e = est(*strategy);
            for s in samples() {
                let (error, lost) = e.estimate(&s, &REF);
                assert!(error >= -1.0 && error <= 1.0, "{:?} {:?} -> {}", strategy, s, error);
                if lost {
                    assert_eq!(error, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_mirror_symmetry() {
        for strategy in [EstStrategy::Edge, EstStrategy::Centroid, EstStrategy::Target].iter() {
            let mut e = est(*strategy);
            for s in samples() {
                let (error, lost) = e.estimate(&s, &REF);
                let (m_error, m_lost) = e.estimate(&s.mirrored(), &REF);
                assert_eq!(lost, m_lost);
                assert!(
                    (error + m_error).abs() < 1e-9,
                    "{:?} {:?}: {} vs mirrored {}", strategy, s, error, m_error
                );
            }
        }
    }

    #[test]
    fn test_centred_dark_line() {
        // Centre over the line, both sides light: centred, so no correction
        let mut e = est(EstStrategy::Edge);
        let (error, lost) = e.estimate(&SensorSample::new(2000.0, 100.0, 2000.0), &REF);

        assert!(!lost);
        assert!(error.abs() < 1e-9);
        assert!(e.report().ambiguous);
    }

    #[test]
    fn test_line_left_is_positive() {
        for strategy in [EstStrategy::Edge, EstStrategy::Centroid, EstStrategy::Target].iter() {
            let mut e = est(*strategy);

            let (error, lost) = e.estimate(&SensorSample::new(100.0, 2000.0, 2000.0), &REF);
            assert!(!lost);
            assert!(error > 0.5, "{:?}: {}", strategy, error);

            let (error, _) = e.estimate(&SensorSample::new(2000.0, 2000.0, 100.0), &REF);
            assert!(error < -0.5, "{:?}: {}", strategy, error);
        }
    }

    #[test]
    fn test_loss_lighting_invariant() {
        let mut e = est(EstStrategy::Edge);

        for &level in [50.0, 1000.0, 1400.0, 2500.0, 4000.0].iter() {
            let flat = SensorSample::new(level, level + 20.0, level - 10.0);
            assert_eq!(e.estimate(&flat, &REF), (0.0, true), "level {}", level);

            let contrast = SensorSample::new(level, level + 400.0, level);
            assert!(!e.estimate(&contrast, &REF).1, "level {}", level);
        }
    }

    #[test]
    fn test_reference_loss_test() {
        let mut e = LineEst::new(Params {
            loss_test: LossTest::Reference,
            ..Default::default()
        }).unwrap();
        let r = CalibRef([1400.0; 3]);

        // Plenty of contrast, but every channel is background
        let (_, lost) = e.estimate(&SensorSample::new(2000.0, 1600.0, 3000.0), &r);
        assert!(lost);

        // Centre channel on the line
        let (_, lost) = e.estimate(&SensorSample::new(2000.0, 100.0, 2000.0), &r);
        assert!(!lost);
    }

    #[test]
    fn test_light_polarity_flips() {
        let mut dark = est(EstStrategy::Edge);
        let mut light = LineEst::new(Params {
            polarity: Polarity::Light,
            ..Default::default()
        }).unwrap();

        // Bright stripe under the left sensor is a light line on the left
        let s = SensorSample::new(3000.0, 800.0, 800.0);
        let (e_light, _) = light.estimate(&s, &REF);
        let (e_dark, _) = dark.estimate(&s, &REF);

        assert!(e_light > 0.5);
        assert!(e_dark < -0.5);
    }

    #[test]
    fn test_set_strategy_and_calibrate() {
        let mut e = LineEst::new(Params::default()).unwrap();
        assert_eq!(e.strategy(), EstStrategy::Edge);

        // Without a target the target strategy falls back to the edge strategy
        e.set_strategy(EstStrategy::Target);
        let s = SensorSample::new(100.0, 2000.0, 2000.0);
        let (fallback, _) = e.estimate(&s, &REF);
        assert!(e.report().target_missing);
        assert!(fallback > 0.0);

        e.calibrate_target(&SensorSample::new(2000.0, 100.0, 2000.0));
        let (error, _) = e.estimate(&s, &REF);
        assert!(!e.report().target_missing);
        assert!(error > 0.0);

        // Centred on the target gives no error
        let (error, _) = e.estimate(&SensorSample::new(2000.0, 100.0, 2000.0), &REF);
        assert_eq!(error, 0.0);
    }

    #[test]
    fn test_invalid_params() {
        assert!(LineEst::new(Params {
            line_ref: CalibRef([f64::NAN, 0.0, 0.0]),
            ..Default::default()
        }).is_err());
        assert!(LineEst::new(Params {
            spread_eps: 0.0,
            ..Default::default()
        }).is_err());
    }
}
