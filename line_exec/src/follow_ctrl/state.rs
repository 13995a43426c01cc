//! Implementations for the FollowCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::thread;
use std::time::{Duration, Instant};
use log::{debug, error, info, trace, warn};
use serde::Serialize;

// Internal
use super::{FollowError, FollowHandle, FollowMode, Params, RecoveryMode};
use crate::{
    eqpt::{ChassisEqpt, EqptError, LineSensorEqpt, WheelSide},
    line_est::{self, CalibRef, LineEst},
    loco_ctrl::{self, DriveCmd, LocoCtrl, OutputData},
    sensor_array::{SensorArray, SensorSample},
    steer_ctrl::{self, SteerCtrl}
};
use util::{maths::sign_or_pos, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The line following control loop.
pub struct FollowCtrl<S: LineSensorEqpt, C: ChassisEqpt> {
    params: Params,

    sensor_array: SensorArray<S>,
    line_est: LineEst,
    steer_ctrl: SteerCtrl,
    loco_ctrl: LocoCtrl,
    chassis: C,

    line_ref: CalibRef,
    cliff_ref: CalibRef,

    mode: FollowMode,

    /// Last error seen while the line was found, used to pick the recovery side.
    last_known_error: f64,

    handle: FollowHandle,
    report: StatusReport,

    num_ticks: u64,

    /// The chassis has been stopped and nothing has been commanded since. Used by `Drop` only.
    shut_down: bool,
}

/// Status report for one tick.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub mode: FollowMode,

    /// Filtered sensor sample of this tick.
    pub sample: SensorSample,

    /// Line error, zero when lost.
    pub error: f64,
    pub lost: bool,

    /// A cliff was seen on this tick.
    pub cliff: bool,

    /// The wheels were stopped by the cliff guard.
    pub cliff_stop: bool,

    /// The drive demands came from an override.
    pub overridden: bool,

    /// The sensor read faulted and the previous sample was reused.
    pub sensor_fault: bool,

    /// Consecutive faulty sensor reads, including this one.
    pub num_consec_sensor_faults: u64,

    pub line_est: line_est::StatusReport,

    /// Steering control report, default while recovering.
    pub steer_ctrl: steer_ctrl::StatusReport,

    pub loco_ctrl: loco_ctrl::StatusReport,

    /// Demands written to the chassis.
    pub output: OutputData,
}

/// Why `FollowCtrl::run` returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    /// A stop was requested through the handle.
    StopRequested,

    /// The cycle limit was reached.
    CycleLimit,
}

/// Summary of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub end: RunEnd,
    pub num_ticks: u64,
    pub num_overruns: u64,
    pub num_skipped_slots: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: LineSensorEqpt, C: ChassisEqpt> FollowCtrl<S, C> {

    /// Assemble the control loop from its modules.
    ///
    /// The line and cliff references start at the ones in the estimator parameters.
    pub fn new(
        params: Params,
        sensor_array: SensorArray<S>,
        line_est: LineEst,
        steer_ctrl: SteerCtrl,
        loco_ctrl: LocoCtrl,
        chassis: C
    ) -> Result<Self, FollowError> {
        validate(&params)?;

        let line_ref = line_est.params().line_ref;
        let cliff_ref = line_est.params().cliff_ref;

        Ok(Self {
            params,
            sensor_array,
            line_est,
            steer_ctrl,
            loco_ctrl,
            chassis,
            line_ref,
            cliff_ref,
            mode: FollowMode::Tracking,
            last_known_error: 0.0,
            handle: FollowHandle::default(),
            report: StatusReport {
                mode: FollowMode::Tracking,
                sample: SensorSample::new(0.0, 0.0, 0.0),
                error: 0.0,
                lost: false,
                cliff: false,
                cliff_stop: false,
                overridden: false,
                sensor_fault: false,
                num_consec_sensor_faults: 0,
                line_est: line_est::StatusReport::default(),
                steer_ctrl: steer_ctrl::StatusReport::default(),
                loco_ctrl: loco_ctrl::StatusReport::default(),
                output: OutputData::default()
            },
            num_ticks: 0,
            shut_down: true
        })
    }

    /// A handle for controlling the loop from elsewhere.
    pub fn handle(&self) -> FollowHandle {
        self.handle.clone()
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// The line calibration reference in use.
    pub fn line_ref(&self) -> CalibRef {
        self.line_ref
    }

    /// Replace the line calibration reference, effective from the next tick.
    ///
    /// A reference with a non-finite channel is rejected and the current one kept.
    pub fn set_line_ref(&mut self, line_ref: CalibRef) -> Result<(), FollowError> {
        check_ref(&line_ref)?;
        info!("Line reference set to {:?}", line_ref.0);
        self.line_ref = line_ref;
        Ok(())
    }

    pub fn cliff_ref(&self) -> CalibRef {
        self.cliff_ref
    }

    /// Replace the cliff calibration reference, rejecting non-finite channels.
    pub fn set_cliff_ref(&mut self, cliff_ref: CalibRef) -> Result<(), FollowError> {
        check_ref(&cliff_ref)?;
        info!("Cliff reference set to {:?}", cliff_ref.0);
        self.cliff_ref = cliff_ref;
        Ok(())
    }

    pub fn line_est(&self) -> &LineEst {
        &self.line_est
    }

    pub fn loco_ctrl(&self) -> &LocoCtrl {
        &self.loco_ctrl
    }

    pub fn num_ticks(&self) -> u64 {
        self.num_ticks
    }

    /// Run the loop at the configured cadence until a stop is requested, `max_cycles` ticks have
    /// run, or a fault occurs.
    ///
    /// `pre_tick` is called before each tick with the loop time, so the caller can feed commands
    /// in through the handle. The chassis is always stopped and the steering centred on return,
    /// including when the stop was requested before the first tick.
    pub fn run<F>(&mut self, max_cycles: Option<u64>, mut pre_tick: F)
        -> Result<RunSummary, FollowError>
    where
        F: FnMut(f64, &FollowHandle)
    {
        let period_s = self.params.cycle_period_s;
        let start = Instant::now();

        let mut summary = RunSummary {
            end: RunEnd::CycleLimit,
            num_ticks: 0,
            num_overruns: 0,
            num_skipped_slots: 0
        };
        let mut slot = 0u64;

        info!("Beginning line following at {:.1} Hz", 1.0 / period_s);

        loop {
            let now_s = start.elapsed().as_secs_f64();

            pre_tick(now_s, &self.handle);

            if self.handle.is_stop_requested() {
                summary.end = RunEnd::StopRequested;
                break
            }
            if let Some(max) = max_cycles {
                if summary.num_ticks >= max {
                    summary.end = RunEnd::CycleLimit;
                    break
                }
            }

            // A failed tick has already stopped the chassis
            self.tick(now_s)?;
            summary.num_ticks += 1;

            // ---- CYCLE MANAGEMENT ----

            let elapsed_s = start.elapsed().as_secs_f64();
            let (next_slot, skipped) = next_slot(slot, elapsed_s, period_s);

            if skipped > 0 {
                warn!(
                    "Cycle overran by {:.06} s, skipping {} cycle(s)",
                    elapsed_s - (slot + 1) as f64 * period_s,
                    skipped
                );
                summary.num_overruns += 1;
                summary.num_skipped_slots += skipped;
            }
            slot = next_slot;

            let sleep_s = slot as f64 * period_s - start.elapsed().as_secs_f64();
            if sleep_s > 0.0 {
                thread::sleep(Duration::from_secs_f64(sleep_s));
            }
        }

        self.shutdown();

        info!(
            "Line following ended ({:?}) after {} ticks, {} overrun(s)",
            summary.end, summary.num_ticks, summary.num_overruns
        );

        Ok(summary)
    }

    /// Run a single tick of the loop.
    ///
    /// `now_s` is the loop time in seconds, used for the steering controller's derivative.
    ///
    /// A fatal sensor or actuator fault stops the chassis before the error is returned.
    pub fn tick(&mut self, now_s: f64) -> Result<&StatusReport, FollowError> {
        self.shut_down = false;
        self.num_ticks += 1;

        // ---- EXTERNAL REQUESTS ----

        let requests = self.handle.take_requests();
        if let Some(r) = requests.line_ref {
            if let Err(e) = self.set_line_ref(r) {
                warn!("Line reference request ignored: {}", e);
            }
        }
        if let Some(r) = requests.cliff_ref {
            if let Err(e) = self.set_cliff_ref(r) {
                warn!("Cliff reference request ignored: {}", e);
            }
        }
        if let Some(s) = requests.strategy {
            self.line_est.set_strategy(s);
        }
        let drive_override = self.handle.drive_override();

        // ---- SENSING ----

        let (sample, sensor_report) = match self.sensor_array.proc(&()) {
            Ok(o) => o,
            Err(e) => return Err(self.fail(e))
        };

        if requests.calibrate_target {
            self.line_est.calibrate_target(&sample);
        }

        // ---- ESTIMATION ----

        let est_input = line_est::InputData {
            sample,
            reference: self.line_ref
        };
        let (estimate, est_report) = match self.line_est.proc(&est_input) {
            Ok(o) => o,
            Err(e) => return Err(self.fail(e))
        };
        let error = estimate.error;
        let lost = estimate.lost;
        let cliff = line_est::cliff_status(&sample, &self.cliff_ref);

        self.update_mode(lost);

        // ---- CONTROL ----

        let mut steer_report = steer_ctrl::StatusReport::default();
        let mut cmd = match self.mode {
            FollowMode::Tracking => {
                self.last_known_error = error;

                let steer_input = steer_ctrl::InputData { error, now_s };
                let str_angle_deg = match self.steer_ctrl.proc(&steer_input) {
                    Ok((a, r)) => {
                        steer_report = r;
                        a
                    },
                    Err(e) => return Err(self.fail(e))
                };

                DriveCmd::Drive {
                    power: self.params.tracking_power,
                    str_angle_deg
                }
            },
            FollowMode::Recovering => self.recovery_cmd()
        };

        if let Some(o) = drive_override {
            cmd = DriveCmd::from(o);
        }

        let cliff_stop = cliff && self.params.cliff_guard;
        if cliff_stop {
            warn!("Cliff detected, stopping the wheels");
            cmd = DriveCmd::Stop;
        }

        let (output, loco_report) = match self.loco_ctrl.proc(&cmd) {
            Ok(o) => o,
            Err(e) => {
                // Only a bad override gets here, so drop it for this tick
                warn!("Error during LocoCtrl processing: {}", e);
                self.loco_ctrl.stop();
                (*self.loco_ctrl.output(), *self.loco_ctrl.report())
            }
        };

        // ---- ACTUATION ----

        if let Err(e) = self.write_chassis(&output, cliff_stop) {
            error!("Actuator fault, emergency stop: {}", e);
            self.shutdown();
            return Err(FollowError::Actuator(e))
        }

        // ---- STATUS ----

        self.handle.publish(error, lost, self.mode == FollowMode::Recovering, self.line_ref);

        self.report = StatusReport {
            mode: self.mode,
            sample,
            error,
            lost,
            cliff,
            cliff_stop,
            overridden: drive_override.is_some(),
            sensor_fault: sensor_report.fault.is_some(),
            num_consec_sensor_faults: sensor_report.num_consec_faults,
            line_est: est_report,
            steer_ctrl: steer_report,
            loco_ctrl: loco_report,
            output
        };

        trace!(
            "FollowCtrl tick {}: {:?} e {:+.3} -> {:?}",
            self.num_ticks, self.mode, error, output
        );

        Ok(&self.report)
    }

    /// Stop the wheels and centre the steering.
    ///
    /// Every call sends the stop again, whatever state the loop is in. Failures are logged, since
    /// there is nothing else left to try.
    pub fn shutdown(&mut self) {
        self.loco_ctrl.stop();
        self.loco_ctrl.steer(0.0);

        // The stop is sent twice in case the first is lost by the driver
        for _ in 0..2 {
            if let Err(e) = self.chassis.stop() {
                error!("Could not stop the chassis: {}", e);
            }
        }
        let neutral_deg = self.loco_ctrl.output().servo_angle_deg;
        if let Err(e) = self.chassis.set_str_angle_deg(neutral_deg) {
            warn!("Could not centre the steering: {}", e);
        }

        self.shut_down = true;
        info!("Chassis stopped");
    }

    /// Stop the chassis after a fatal module error.
    fn fail<E: Into<FollowError>>(&mut self, e: E) -> FollowError {
        let e = e.into();
        error!("Line following stopped by a fault: {}", e);
        self.shutdown();
        e
    }

    /// Switch between tracking and recovering.
    ///
    /// The steering controller is reset on both transitions so it never differentiates across a
    /// gap in the line.
    fn update_mode(&mut self, lost: bool) {
        match (self.mode, lost) {
            (FollowMode::Tracking, true) => {
                info!("Line lost, recovering ({:?})", self.params.recovery_mode);
                self.mode = FollowMode::Recovering;
                self.steer_ctrl.reset();
            },
            (FollowMode::Recovering, false) => {
                info!("Line found, tracking");
                self.mode = FollowMode::Tracking;
                self.steer_ctrl.reset();
            },
            _ => ()
        }
    }

    /// The drive command for the recovery manoeuvre.
    fn recovery_cmd(&self) -> DriveCmd {
        let power = self.params.tracking_power * self.params.recovery_power_frac;

        match self.params.recovery_mode {
            RecoveryMode::Neutral => DriveCmd::Drive {
                power,
                str_angle_deg: 0.0
            },
            RecoveryMode::SignBiased => {
                let lock_deg = self.loco_ctrl.params().max_str_angle_deg;
                let side = self.steer_ctrl.params().str_sign * sign_or_pos(self.last_known_error);
                DriveCmd::Drive {
                    power: -power,
                    str_angle_deg: side * lock_deg
                }
            }
        }
    }

    fn write_chassis(&mut self, output: &OutputData, cliff_stop: bool) -> Result<(), EqptError> {
        if cliff_stop {
            self.chassis.stop()?;
        }
        self.chassis.set_str_angle_deg(output.servo_angle_deg)?;
        self.chassis.set_wheel_power(WheelSide::Left, output.wheels.left)?;
        self.chassis.set_wheel_power(WheelSide::Right, output.wheels.right)?;
        Ok(())
    }
}

impl<S: LineSensorEqpt, C: ChassisEqpt> Drop for FollowCtrl<S, C> {
    fn drop(&mut self) {
        if !self.shut_down {
            debug!("FollowCtrl dropped while driving");
            self.shutdown();
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Find the slot the next tick should start in.
///
/// Normally this is the slot after `slot`. If the tick ran past that slot's start the missed
/// slots are skipped and the next tick waits for the next period boundary instead.
///
/// Returns the next slot and the number of slots skipped.
pub fn next_slot(slot: u64, elapsed_s: f64, period_s: f64) -> (u64, u64) {
    let nominal = slot + 1;

    if elapsed_s <= nominal as f64 * period_s {
        return (nominal, 0)
    }

    let next = (elapsed_s / period_s).floor() as u64 + 1;
    (next, next - nominal)
}

fn check_ref(reference: &CalibRef) -> Result<(), FollowError> {
    if reference.is_valid() {
        Ok(())
    }
    else {
        Err(FollowError::InvalidCalibRef(*reference))
    }
}

fn validate(params: &Params) -> Result<(), FollowError> {
    if !(params.cycle_period_s > 0.0) {
        return Err(FollowError::InvalidParams("cycle_period_s must be positive"))
    }
    if !(params.tracking_power.abs() <= 100.0) {
        return Err(FollowError::InvalidParams("tracking_power must be within 100"))
    }
    if !(params.recovery_power_frac >= 0.0 && params.recovery_power_frac <= 1.0) {
        return Err(FollowError::InvalidParams("recovery_power_frac must be in [0, 1]"))
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use comms_if::tc::follow::DriveOverride;
    use crate::{
        eqpt::sim::{SimParams, SimWorld},
        line_est, loco_ctrl, sensor_array, steer_ctrl
    };

    /// Sensor playing back a fixed list of reads, repeating the last one.
    struct Playback {
        reads: VecDeque<Result<[f64; 3], EqptError>>,
        last: [f64; 3]
    }

    impl LineSensorEqpt for Playback {
        fn read_channels(&mut self) -> Result<[f64; 3], EqptError> {
            match self.reads.pop_front() {
                Some(Ok(r)) => {
                    self.last = r;
                    Ok(r)
                },
                Some(Err(e)) => Err(e),
                None => Ok(self.last)
            }
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        Steer(f64),
        Wheel(WheelSide, f64),
        Stop
    }

    /// Chassis recording every call.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<Call>>>,
        reject: Arc<Mutex<bool>>
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn num_stops(&self) -> usize {
            self.calls().iter().filter(|c| **c == Call::Stop).count()
        }

        fn record(&mut self, call: Call) -> Result<(), EqptError> {
            self.calls.lock().unwrap().push(call);
            if *self.reject.lock().unwrap() && call != Call::Stop {
                Err(EqptError::ActuatorRejected("test"))
            }
            else {
                Ok(())
            }
        }
    }

    impl ChassisEqpt for Recorder {
        fn set_str_angle_deg(&mut self, angle_deg: f64) -> Result<(), EqptError> {
            self.record(Call::Steer(angle_deg))
        }

        fn set_wheel_power(&mut self, side: WheelSide, power: f64) -> Result<(), EqptError> {
            self.record(Call::Wheel(side, power))
        }

        fn stop(&mut self) -> Result<(), EqptError> {
            self.record(Call::Stop)
        }
    }

    fn follow_with<S: LineSensorEqpt, C: ChassisEqpt>(
        sensor: S,
        chassis: C,
        params: Params
    ) -> FollowCtrl<S, C> {
        FollowCtrl::new(
            params,
            SensorArray::new(
                sensor,
                sensor_array::Params { filter_alpha: 1.0, ..Default::default() }
            ).unwrap(),
            LineEst::new(line_est::Params {
                line_ref: CalibRef([1400.0; 3]),
                ..Default::default()
            }).unwrap(),
            SteerCtrl::new(steer_ctrl::Params::default()).unwrap(),
            LocoCtrl::new(loco_ctrl::Params::default()).unwrap(),
            chassis
        ).unwrap()
    }

    fn playback(reads: Vec<[f64; 3]>) -> Playback {
        Playback {
            reads: reads.into_iter().map(Ok).collect(),
            last: [0.0; 3]
        }
    }

    #[test]
    fn test_lost_line_recovers() {
        let mut reads = vec![[1400.0; 3]; 5];
        reads.push([2000.0, 100.0, 2000.0]);
        let chassis = Recorder::default();
        let mut fc = follow_with(playback(reads), chassis.clone(), Params::default());

        for i in 0..5 {
            let r = *fc.tick(i as f64 * 0.01).unwrap();
            assert!(r.lost);
            assert_eq!(r.error, 0.0);
            assert_eq!(r.mode, FollowMode::Recovering);

            // Neutral recovery: straight ahead at half power
            assert_eq!(r.output.str_angle_deg, 0.0);
            assert_eq!(r.output.wheels.left, 5.0);
            assert!(fc.handle().is_line_lost());
        }

        let r = *fc.tick(0.05).unwrap();
        assert!(!r.lost);
        assert_eq!(r.mode, FollowMode::Tracking);
        assert_eq!(r.output.wheels.left, 10.0);
        assert!(!fc.handle().is_line_lost());

        // Wheels were written every tick
        let wheel_writes = chassis
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Wheel(WheelSide::Left, _)))
            .count();
        assert_eq!(wheel_writes, 6);
    }

    #[test]
    fn test_sign_biased_recovery() {
        let reads = vec![[100.0, 2000.0, 2000.0], [1400.0; 3]];
        let mut fc = follow_with(
            playback(reads),
            Recorder::default(),
            Params { recovery_mode: RecoveryMode::SignBiased, ..Default::default() }
        );

        // Line last seen on the left
        assert!(fc.tick(0.0).unwrap().error > 0.0);

        let r = *fc.tick(0.01).unwrap();
        assert_eq!(r.mode, FollowMode::Recovering);
        assert_eq!(r.output.str_angle_deg, 30.0);

        // Reversing: forward power is +left with the default wiring
        assert!(r.output.wheels.left < 0.0);
        assert_eq!(r.output.wheels.right, 5.0);
    }

    #[test]
    fn test_controller_reset_on_reengage() {
        let reads = vec![
            [100.0, 2000.0, 2000.0],
            [1400.0; 3],
            [2000.0, 2000.0, 100.0],
        ];
        let mut fc = follow_with(playback(reads), Recorder::default(), Params::default());

        fc.tick(0.0).unwrap();
        fc.tick(0.01).unwrap();

        // The error swings from +1 to -1 across the gap but there's no derivative kick
        let r = *fc.tick(0.02).unwrap();
        assert_eq!(r.error, -1.0);
        assert_eq!(r.output.str_angle_deg, -15.0);
    }

    #[test]
    fn test_actuator_fault_stops() {
        let chassis = Recorder::default();
        let mut fc = follow_with(
            playback(vec![[2000.0, 100.0, 2000.0]]),
            chassis.clone(),
            Params::default()
        );

        fc.tick(0.0).unwrap();
        assert_eq!(chassis.num_stops(), 0);

        *chassis.reject.lock().unwrap() = true;
        assert!(matches!(fc.tick(0.01), Err(FollowError::Actuator(_))));
        assert_eq!(chassis.num_stops(), 2);

        // Nothing more happens on drop
        drop(fc);
        assert_eq!(chassis.num_stops(), 2);
    }

    #[test]
    fn test_sensor_escalation_stops() {
        let chassis = Recorder::default();
        let mut reads: VecDeque<_> = vec![Ok([2000.0, 100.0, 2000.0])].into();
        reads.extend(vec![Err(EqptError::SensorTimeout); 10]);
        let mut fc = follow_with(
            Playback { reads, last: [0.0; 3] },
            chassis.clone(),
            Params::default()
        );

        fc.tick(0.0).unwrap();

        // Faulty reads hold the last sample until the limit
        for i in 1..=5 {
            let r = *fc.tick(i as f64 * 0.01).unwrap();
            assert!(r.sensor_fault);
            assert_eq!(r.num_consec_sensor_faults, i);
            assert!(!r.lost);
        }
        assert!(matches!(fc.tick(0.06), Err(FollowError::Sensor(_))));
        assert_eq!(chassis.num_stops(), 2);
    }

    #[test]
    fn test_drop_stops_chassis() {
        let chassis = Recorder::default();
        {
            let mut fc = follow_with(
                playback(vec![[100.0, 2000.0, 2000.0]]),
                chassis.clone(),
                Params::default()
            );
            fc.tick(0.0).unwrap();
        }

        let calls = chassis.calls();
        assert_eq!(chassis.num_stops(), 2);
        assert_eq!(calls.last(), Some(&Call::Steer(0.0)));
    }

    #[test]
    fn test_override_and_requests() {
        let mut fc = follow_with(
            playback(vec![[2000.0, 100.0, 2000.0]]),
            Recorder::default(),
            Params::default()
        );
        let h = fc.handle();

        h.set_override(Some(DriveOverride { power: -20.0, str_angle_deg: 45.0 }));
        h.set_line_ref(CalibRef([900.0; 3])).unwrap();
        h.set_strategy(line_est::EstStrategy::Centroid);

        let r = *fc.tick(0.0).unwrap();
        assert!(r.overridden);
        assert_eq!(r.output.str_angle_deg, 30.0);
        assert!(r.loco_ctrl.str_angle_limited);
        assert!(r.output.wheels.right > 0.0);
        assert_eq!(fc.line_ref(), CalibRef([900.0; 3]));
        assert_eq!(h.line_ref(), Some(CalibRef([900.0; 3])));
        assert_eq!(fc.line_est().strategy(), line_est::EstStrategy::Centroid);

        h.clear_override();
        let r = *fc.tick(0.01).unwrap();
        assert!(!r.overridden);
        assert_eq!(r.output.wheels.left, 10.0);
    }

    #[test]
    fn test_non_finite_ref_kept_out() {
        let mut fc = follow_with(
            playback(vec![[2000.0, 100.0, 2000.0]]),
            Recorder::default(),
            Params::default()
        );

        assert!(matches!(
            fc.set_line_ref(CalibRef([std::f64::NAN, 900.0, 900.0])),
            Err(FollowError::InvalidCalibRef(_))
        ));
        assert_eq!(fc.line_ref(), CalibRef([1400.0; 3]));

        let cliff_ref = fc.cliff_ref();
        assert!(fc.set_cliff_ref(CalibRef([std::f64::INFINITY; 3])).is_err());
        assert_eq!(fc.cliff_ref(), cliff_ref);

        // Still following with the old reference
        let r = *fc.tick(0.0).unwrap();
        assert!(!r.lost);
        assert_eq!(r.error, 0.0);

        fc.set_line_ref(CalibRef([900.0; 3])).unwrap();
        assert_eq!(fc.line_ref(), CalibRef([900.0; 3]));
    }

    #[test]
    fn test_module_reports_carried() {
        let reads = vec![[100.0, 2000.0, 2000.0], [1400.0; 3]];
        let mut fc = follow_with(playback(reads), Recorder::default(), Params::default());

        let r = *fc.tick(0.0).unwrap();
        assert_eq!(r.mode, FollowMode::Tracking);
        assert_eq!(r.line_est.strategy, line_est::EstStrategy::Edge);
        assert_eq!(r.steer_ctrl.k_p, 15.0);
        assert_eq!(r.steer_ctrl.str_angle_deg, r.output.str_angle_deg);
        assert!(!r.loco_ctrl.str_angle_limited);
        assert_eq!(r.num_consec_sensor_faults, 0);

        // No steering control while recovering
        let r = *fc.tick(0.01).unwrap();
        assert_eq!(r.mode, FollowMode::Recovering);
        assert_eq!(r.steer_ctrl.k_p, 0.0);
        assert_eq!(r.steer_ctrl.str_angle_deg, 0.0);
    }

    #[test]
    fn test_servo_trim_written() {
        let chassis = Recorder::default();
        let mut fc = FollowCtrl::new(
            Params::default(),
            SensorArray::new(
                playback(vec![[100.0, 2000.0, 2000.0]]),
                sensor_array::Params { filter_alpha: 1.0, ..Default::default() }
            ).unwrap(),
            LineEst::new(line_est::Params {
                line_ref: CalibRef([1400.0; 3]),
                ..Default::default()
            }).unwrap(),
            SteerCtrl::new(steer_ctrl::Params::default()).unwrap(),
            LocoCtrl::new(loco_ctrl::Params { str_trim_deg: 2.0, ..Default::default() }).unwrap(),
            chassis.clone()
        ).unwrap();

        let r = *fc.tick(0.0).unwrap();
        assert_eq!(r.output.str_angle_deg, 15.0);
        assert!(chassis.calls().contains(&Call::Steer(17.0)));

        // Neutral is the trimmed centre
        fc.shutdown();
        assert_eq!(chassis.calls().last(), Some(&Call::Steer(2.0)));
    }

    #[test]
    fn test_cliff_guard() {
        let chassis = Recorder::default();
        let mut fc = follow_with(
            playback(vec![[2000.0, 10.0, 2000.0]]),
            chassis.clone(),
            Params { cliff_guard: true, ..Default::default() }
        );

        let r = *fc.tick(0.0).unwrap();
        assert!(r.cliff);
        assert!(r.cliff_stop);
        assert_eq!(r.output.wheels, loco_ctrl::WheelPowers::zero());
        assert_eq!(chassis.num_stops(), 1);
    }

    #[test]
    fn test_run_stops_on_request() {
        let chassis = Recorder::default();
        let mut fc = follow_with(
            playback(vec![[2000.0, 100.0, 2000.0]]),
            chassis.clone(),
            Params::default()
        );

        let mut calls = 0;
        let summary = fc.run(None, |_, h| {
            calls += 1;
            if calls == 4 {
                h.request_stop();
            }
        }).unwrap();

        assert_eq!(summary.end, RunEnd::StopRequested);
        assert_eq!(summary.num_ticks, 3);
        assert_eq!(chassis.num_stops(), 2);
    }

    #[test]
    fn test_stop_before_first_tick() {
        let chassis = Recorder::default();
        let mut fc = follow_with(
            playback(vec![[2000.0, 100.0, 2000.0]]),
            chassis.clone(),
            Params::default()
        );

        fc.handle().request_stop();
        let summary = fc.run(None, |_, _| ()).unwrap();

        assert_eq!(summary.end, RunEnd::StopRequested);
        assert_eq!(summary.num_ticks, 0);
        assert_eq!(chassis.num_stops(), 2);
        assert_eq!(chassis.calls().last(), Some(&Call::Steer(0.0)));

        // Every run sends the stop again
        fc.run(None, |_, _| ()).unwrap();
        assert_eq!(chassis.num_stops(), 4);

        drop(fc);
        assert_eq!(chassis.num_stops(), 4);
    }

    #[test]
    fn test_run_cycle_limit() {
        let mut fc = follow_with(
            playback(vec![[2000.0, 100.0, 2000.0]]),
            Recorder::default(),
            Params::default()
        );

        let summary = fc.run(Some(5), |_, _| ()).unwrap();
        assert_eq!(summary.end, RunEnd::CycleLimit);
        assert_eq!(summary.num_ticks, 5);
        assert_eq!(fc.num_ticks(), 5);
    }

    #[test]
    fn test_next_slot() {
        // On time
        assert_eq!(next_slot(0, 0.004, 0.01), (1, 0));
        assert_eq!(next_slot(7, 0.075, 0.01), (8, 0));

        // Overran into slot 1, wait for the start of slot 2
        assert_eq!(next_slot(0, 0.013, 0.01), (2, 1));

        // Overran by several periods
        assert_eq!(next_slot(3, 0.071, 0.01), (8, 4));
    }

    #[test]
    fn test_follows_simulated_line() {
        let world = SimWorld::new(SimParams {
            initial_offset_m: 0.01,
            ..Default::default()
        });
        let (sensor, chassis) = SimWorld::eqpt(&world);
        let mut fc = follow_with(sensor, chassis, Params::default());

        // The line stays between the outer sensors and the weave doesn't grow
        let mut max_late_offset_m = 0f64;
        for i in 0..1500 {
            let r = *fc.tick(i as f64 * 0.01).unwrap();
            assert!(!r.lost, "line lost at tick {}", i);

            if i >= 1000 {
                max_late_offset_m = max_late_offset_m.max(world.lock().unwrap().offset_m().abs());
            }
        }

        assert!(max_late_offset_m < 0.012, "late offset {}", max_late_offset_m);
    }
}
