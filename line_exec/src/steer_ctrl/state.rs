//! Implementations for the SteerCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;

// Internal
use super::{GainSchedule, Params, PdController, SteerCtrlError};
use util::{maths::clamp_sym, module::State, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Steering control state
#[derive(Debug, Clone)]
pub struct SteerCtrl {
    pub(crate) params: Params,

    ctrl: PdController,

    /// Filtered error, `None` until the first step after construction or reset.
    filtered_error: Option<f64>,

    report: StatusReport,
}

/// Input data to steering control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// Line error in [-1, 1]
    pub error: f64,

    /// Time of the tick.
    ///
    /// Units: seconds
    pub now_s: f64,
}

/// Status report for SteerCtrl processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    /// The error after filtering
    pub filtered_error: f64,

    /// Gains in use for this step
    pub k_p: f64,
    pub k_d: f64,

    pub p_term: f64,
    pub d_term: f64,

    /// Units: seconds
    pub dt_s: f64,

    /// The demand was limited to `max_str_angle_deg`.
    pub saturated: bool,

    /// Final steering angle demand.
    ///
    /// Units: degrees
    pub str_angle_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SteerCtrl {

    /// Create a new steering controller from the given parameters.
    pub fn new(params: Params) -> Result<Self, SteerCtrlError> {
        validate(&params)?;

        Ok(Self {
            params,
            ctrl: PdController::new(),
            filtered_error: None,
            report: StatusReport::default()
        })
    }

    /// Calculate the steering angle demand for the given line error.
    ///
    /// Units: degrees, within `±max_str_angle_deg`.
    pub fn step(&mut self, error: f64, now_s: f64) -> f64 {
        let p = &self.params;

        // Filter the error
        let ef = match self.filtered_error {
            Some(prev) => p.filter_beta * prev + (1.0 - p.filter_beta) * error,
            None => error
        };
        self.filtered_error = Some(ef);

        let (k_p, k_d) = p.gain_schedule.gains(p.k_p, p.k_d, ef);
        let out = self.ctrl.get(ef, now_s, k_p, k_d, p.min_dt_s);

        let demand = p.str_sign * (out.p_term + out.d_term);
        let str_angle_deg = clamp_sym(demand, p.max_str_angle_deg);

        self.report = StatusReport {
            filtered_error: ef,
            k_p,
            k_d,
            p_term: out.p_term,
            d_term: out.d_term,
            dt_s: out.dt_s,
            saturated: str_angle_deg != demand,
            str_angle_deg
        };

        trace!(
            "SteerCtrl: e {:+.3} -> P {:+.2} D {:+.2} -> {:+.2} deg",
            ef, out.p_term, out.d_term, str_angle_deg
        );

        str_angle_deg
    }

    /// Clear the controller memory, so that the next step has no derivative term.
    pub fn reset(&mut self) {
        debug!("SteerCtrl reset");
        self.ctrl.reset();
        self.filtered_error = None;
    }

    /// Status report of the last step.
    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl State for SteerCtrl {
    type InitData = &'static str;
    type InitError = SteerCtrlError;

    type InputData = InputData;
    type OutputData = f64;
    type StatusReport = StatusReport;
    type ProcError = SteerCtrlError;

    /// Initialise the SteerCtrl module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data)?;
        *self = Self::new(params)?;
        Ok(())
    }

    /// Perform cyclic processing of SteerCtrl.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        let str_angle_deg = self.step(input_data.error, input_data.now_s);
        Ok((str_angle_deg, self.report))
    }
}

fn validate(params: &Params) -> Result<(), SteerCtrlError> {
    if !(params.filter_beta >= 0.0 && params.filter_beta < 1.0) {
        return Err(SteerCtrlError::InvalidParams("filter_beta must be in [0, 1)"))
    }
    if !(params.min_dt_s > 0.0) {
        return Err(SteerCtrlError::InvalidParams("min_dt_s must be positive"))
    }
    if !(params.max_str_angle_deg > 0.0) {
        return Err(SteerCtrlError::InvalidParams("max_str_angle_deg must be positive"))
    }
    if params.str_sign != 1.0 && params.str_sign != -1.0 {
        return Err(SteerCtrlError::InvalidParams("str_sign must be 1 or -1"))
    }
    if let GainSchedule::Adaptive { kp_scale, kd_scale } = params.gain_schedule {
        if !(kp_scale >= 0.0 && kd_scale >= 0.0 && kp_scale.is_finite() && kd_scale.is_finite()) {
            return Err(SteerCtrlError::InvalidParams(
                "adaptive gain scales must be finite and not negative"
            ))
        }
    }
    Ok(())
}
