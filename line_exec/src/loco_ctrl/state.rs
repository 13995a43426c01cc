//! Implementations for the LocoCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;

// Internal
use super::{DriveCmd, LocoCtrlError, Params, WheelPowers};
use util::{maths::clamp_sym, module::State, params};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Locomotion control module state
#[derive(Debug, Clone)]
pub struct LocoCtrl {

    pub(crate) params: Params,

    pub(crate) report: StatusReport,

    /// Signed drive power currently commanded, zero when stopped.
    pub(crate) power: f64,

    pub(crate) output: OutputData,
}

/// Output command from LocoCtrl that the chassis must execute.
#[derive(Clone, Copy, Serialize, Debug, Default, PartialEq)]
pub struct OutputData {
    /// Steering angle demand, within `max_str_angle_deg`.
    ///
    /// Units: degrees
    pub str_angle_deg: f64,

    /// Angle to write to the steering servo, `str_angle_deg` plus the trim.
    ///
    /// Units: degrees
    pub servo_angle_deg: f64,

    /// Wheel power demands.
    pub wheels: WheelPowers,
}

/// Status report for LocoCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// The steering demand was beyond `max_str_angle_deg`.
    pub str_angle_limited: bool,

    /// A wheel demand was beyond `max_power`.
    pub power_limited: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocoCtrl {

    /// Create a new instance from the given parameters, stopped and pointing straight ahead.
    pub fn new(params: Params) -> Result<Self, LocoCtrlError> {
        validate(&params)?;

        Ok(Self {
            report: StatusReport::default(),
            power: 0.0,
            output: OutputData {
                servo_angle_deg: params.str_trim_deg,
                ..Default::default()
            },
            params
        })
    }

    /// Set the steering angle, keeping the current drive power.
    ///
    /// Returns the angle actually set.
    pub fn steer(&mut self, str_angle_deg: f64) -> f64 {
        let limited = clamp_sym(str_angle_deg, self.params.max_str_angle_deg);
        self.report.str_angle_limited = limited != str_angle_deg;
        self.output.str_angle_deg = limited;
        self.output.servo_angle_deg = limited + self.params.str_trim_deg;
        self.output.wheels = self.calc_ackerman(self.power, limited);
        limited
    }

    /// Set the steering angle and drive at the given signed power.
    pub fn drive(&mut self, power: f64, str_angle_deg: f64) -> WheelPowers {
        self.power = power;
        self.steer(str_angle_deg);
        self.output.wheels
    }

    /// Drive forwards at the current steering angle.
    pub fn forward(&mut self, power: f64) -> WheelPowers {
        self.drive(power.abs(), self.output.str_angle_deg)
    }

    /// Drive backwards at the current steering angle.
    ///
    /// The wheel powers are exactly those of `forward` with the signs flipped.
    pub fn backward(&mut self, power: f64) -> WheelPowers {
        self.drive(-power.abs(), self.output.str_angle_deg)
    }

    /// Cut the drive power. The steering angle is left as it was.
    ///
    /// Calling this more than once has no further effect.
    pub fn stop(&mut self) -> WheelPowers {
        if self.power != 0.0 {
            debug!("LocoCtrl stop");
        }
        self.power = 0.0;
        self.output.wheels = WheelPowers::zero();
        self.output.wheels
    }

    /// The current output.
    pub fn output(&self) -> &OutputData {
        &self.output
    }

    /// The current steering angle.
    ///
    /// Units: degrees
    pub fn str_angle_deg(&self) -> f64 {
        self.output.str_angle_deg
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl State for LocoCtrl {
    type InitData = &'static str;
    type InitError = LocoCtrlError;

    type InputData = DriveCmd;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = LocoCtrlError;

    /// Initialise the LocoCtrl module.
    ///
    /// Expected init data is the path to the parameter file.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data)?;
        *self = Self::new(params)?;
        Ok(())
    }

    /// Perform cyclic processing of Locomotion Control.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        if !input_data.is_valid() {
            return Err(LocoCtrlError::InvalidCmd(*input_data))
        }

        match *input_data {
            DriveCmd::None => (),
            DriveCmd::Stop => { self.stop(); },
            DriveCmd::Steer { str_angle_deg } => { self.steer(str_angle_deg); },
            DriveCmd::Forward { power } => { self.forward(power); },
            DriveCmd::Backward { power } => { self.backward(power); },
            DriveCmd::Drive { power, str_angle_deg } => { self.drive(power, str_angle_deg); }
        }

        trace!("LocoCtrl output: {:?}", self.output);

        Ok((self.output, self.report))
    }
}

fn validate(params: &Params) -> Result<(), LocoCtrlError> {
    if !(params.max_str_angle_deg > 0.0 && params.max_str_angle_deg < 90.0) {
        return Err(LocoCtrlError::InvalidParams("max_str_angle_deg must be in (0, 90)"))
    }
    if !(params.max_power > 0.0) {
        return Err(LocoCtrlError::InvalidParams("max_power must be positive"))
    }
    if params.left_sign.abs() != 1.0 || params.right_sign.abs() != 1.0 {
        return Err(LocoCtrlError::InvalidParams("wheel signs must be 1 or -1"))
    }
    if !(params.str_trim_deg.abs() < params.max_str_angle_deg) {
        return Err(LocoCtrlError::InvalidParams("str_trim_deg must be within max_str_angle_deg"))
    }
    Ok(())
}
