//! Implementations for the SensorArray state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::time::Instant;
use log::{error, trace, warn};
use nalgebra::Vector3;

// Internal
use super::{Params, SensorArrayError, SensorFault, SensorSample};
use crate::eqpt::LineSensorEqpt;
use util::{maths::low_pass, module::State, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Line sensor array state.
pub struct SensorArray<S: LineSensorEqpt> {
    eqpt: S,

    pub(crate) params: Params,

    /// Filtered channel values, starting at zero.
    filtered: Vector3<f64>,

    num_consec_faults: u64,

    report: StatusReport,
}

/// Status report for SensorArray processing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusReport {
    /// The fault raised on this read, if any. When set the sample repeats the previous filtered
    /// value.
    pub fault: Option<SensorFault>,

    /// Number of consecutive faulty reads, including this one.
    pub num_consec_faults: u64,

    /// Wall-clock duration of the equipment read.
    ///
    /// Units: seconds
    pub read_duration_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: LineSensorEqpt> SensorArray<S> {

    /// Create a new sensor array reading from the given equipment.
    pub fn new(eqpt: S, params: Params) -> Result<Self, SensorArrayError> {
        validate(&params)?;

        Ok(Self {
            eqpt,
            params,
            filtered: Vector3::zeros(),
            num_consec_faults: 0,
            report: StatusReport::default(),
        })
    }

    /// Read the sensor and update the filtered value.
    ///
    /// A failed or out-of-range read is not an error on its own: the previous filtered value is
    /// returned and the fault is recorded in the status report. Only when faults persist for more
    /// than `max_consec_faults` reads is `FaultLimitExceeded` returned. A read slower than
    /// `max_read_duration_s` is always an error, since it breaks the cycle timing.
    pub fn read(&mut self) -> Result<SensorSample, SensorArrayError> {
        self.report = StatusReport::default();

        let start = Instant::now();
        let result = self.eqpt.read_channels();
        let read_duration_s = start.elapsed().as_secs_f64();
        self.report.read_duration_s = read_duration_s;

        if read_duration_s > self.params.max_read_duration_s {
            error!(
                "Line sensor read took {:.6} s (limit {:.6} s)",
                read_duration_s,
                self.params.max_read_duration_s
            );
            return Err(SensorArrayError::ReadOverrun(
                read_duration_s,
                self.params.max_read_duration_s
            ))
        }

        let checked = result
            .map_err(SensorFault::Eqpt)
            .and_then(|raw| self.check_range(raw));

        match checked {
            Ok(raw) => {
                for i in 0..3 {
                    self.filtered[i] = low_pass(
                        self.filtered[i],
                        raw[i],
                        self.params.filter_alpha
                    );
                }
                self.num_consec_faults = 0;
            },
            Err(fault) => {
                self.num_consec_faults += 1;
                self.report.num_consec_faults = self.num_consec_faults;

                if self.num_consec_faults > self.params.max_consec_faults {
                    error!(
                        "Line sensor faulty for {} consecutive reads: {}",
                        self.num_consec_faults,
                        fault
                    );
                    return Err(SensorArrayError::FaultLimitExceeded(
                        self.num_consec_faults,
                        fault
                    ))
                }

                warn!(
                    "Line sensor fault ({} consecutive), holding last value: {}",
                    self.num_consec_faults,
                    fault
                );
                self.report.fault = Some(fault);
            }
        }

        let sample = SensorSample(self.filtered);
        trace!("SensorArray sample: {:?}", sample.values().as_slice());

        Ok(sample)
    }

    /// Status report of the last read.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// The current filtered value without reading the equipment.
    pub fn last_sample(&self) -> SensorSample {
        SensorSample(self.filtered)
    }

    fn check_range(&self, raw: [f64; 3]) -> Result<[f64; 3], SensorFault> {
        for (channel, &value) in raw.iter().enumerate() {
            if !(value >= self.params.min_raw_value && value <= self.params.max_raw_value) {
                return Err(SensorFault::OutOfRange { channel, value })
            }
        }
        Ok(raw)
    }
}

impl<S: LineSensorEqpt> State for SensorArray<S> {
    type InitData = &'static str;
    type InitError = SensorArrayError;

    type InputData = ();
    type OutputData = SensorSample;
    type StatusReport = StatusReport;
    type ProcError = SensorArrayError;

    /// Initialise the SensorArray module.
    ///
    /// Expected init data is the path to the parameter file. The filter state is kept.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data)?;
        validate(&params)?;
        self.params = params;
        Ok(())
    }

    /// Perform cyclic processing of the SensorArray.
    fn proc(&mut self, _input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let sample = self.read()?;
        Ok((sample, self.report.clone()))
    }
}

fn validate(params: &Params) -> Result<(), SensorArrayError> {
    if !(params.filter_alpha > 0.0 && params.filter_alpha <= 1.0) {
        return Err(SensorArrayError::InvalidParams("filter_alpha must be in (0, 1]"))
    }
    if !(params.min_raw_value < params.max_raw_value) {
        return Err(SensorArrayError::InvalidParams(
            "min_raw_value must be lower than max_raw_value"
        ))
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::eqpt::EqptError;
    use std::collections::VecDeque;

    /// Equipment playing back a fixed list of reads.
    struct Playback(VecDeque<Result<[f64; 3], EqptError>>);

    impl LineSensorEqpt for Playback {
        fn read_channels(&mut self) -> Result<[f64; 3], EqptError> {
            self.0.pop_front().unwrap_or(Err(EqptError::NotConnected))
        }
    }

    struct Slow;

    impl LineSensorEqpt for Slow {
        fn read_channels(&mut self) -> Result<[f64; 3], EqptError> {
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok([1000.0; 3])
        }
    }

    fn array(reads: Vec<Result<[f64; 3], EqptError>>) -> SensorArray<Playback> {
        SensorArray::new(Playback(reads.into()), Params::default()).unwrap()
    }

    #[test]
    fn test_low_pass() {
        let mut sa = array(vec![Ok([1000.0, 2000.0, 400.0]); 3]);

        assert_eq!(sa.read().unwrap(), SensorSample::new(500.0, 1000.0, 200.0));
        assert_eq!(sa.read().unwrap(), SensorSample::new(750.0, 1500.0, 300.0));
        assert_eq!(sa.read().unwrap(), SensorSample::new(875.0, 1750.0, 350.0));
        assert_eq!(sa.report().fault, None);
    }

    #[test]
    fn test_alpha_one_passes_through() {
        let mut sa = SensorArray::new(
            Playback(vec![Ok([10.0, 20.0, 30.0])].into()),
            Params { filter_alpha: 1.0, ..Default::default() }
        ).unwrap();

        assert_eq!(sa.read().unwrap(), SensorSample::new(10.0, 20.0, 30.0));
    }

    #[test]
    fn test_fault_holds_last_value() {
        let mut sa = array(vec![
            Ok([1000.0; 3]),
            Err(EqptError::SensorRead(0)),
            Ok([1000.0, -5.0, 1000.0]),
            Ok([1000.0; 3]),
        ]);

        let first = sa.read().unwrap();

        // Failed read repeats the filtered value
        assert_eq!(sa.read().unwrap(), first);
        assert_eq!(sa.last_sample(), first);
        assert_eq!(sa.report().fault, Some(SensorFault::Eqpt(EqptError::SensorRead(0))));
        assert_eq!(sa.report().num_consec_faults, 1);

        // Out of range read too
        assert_eq!(sa.read().unwrap(), first);
        assert_eq!(
            sa.report().fault,
            Some(SensorFault::OutOfRange { channel: 1, value: -5.0 })
        );
        assert_eq!(sa.report().num_consec_faults, 2);

        // Good read resets the counter
        assert_ne!(sa.read().unwrap(), first);
        assert_eq!(sa.report().num_consec_faults, 0);
    }

    #[test]
    fn test_fault_escalation() {
        let mut reads = vec![Ok([1000.0; 3])];
        reads.extend(vec![Ok([f64::NAN, 0.0, 0.0]); 6]);
        let mut sa = array(reads);

        sa.read().unwrap();
        for _ in 0..5 {
            assert!(sa.read().is_ok());
        }
        assert!(matches!(
            sa.read(),
            Err(SensorArrayError::FaultLimitExceeded(6, SensorFault::OutOfRange { channel: 0, .. }))
        ));
    }

    #[test]
    fn test_read_overrun() {
        let mut sa = SensorArray::new(Slow, Params::default()).unwrap();
        assert!(matches!(sa.read(), Err(SensorArrayError::ReadOverrun(_, _))));
    }

    #[test]
    fn test_invalid_params() {
        let r = SensorArray::new(
            Playback(VecDeque::new()),
            Params { filter_alpha: 0.0, ..Default::default() }
        );
        assert!(matches!(r, Err(SensorArrayError::InvalidParams(_))));
    }
}
