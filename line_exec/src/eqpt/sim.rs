//! # Simulated equipment
//!
//! A small kinematic model of the robot driving over a line of constant curvature. The line
//! sensor renders each channel as a Gaussian reflectance profile across the line, and the chassis
//! integrates the commanded steering angle and wheel powers with a bicycle model.
//!
//! The world is only advanced when the sensor is read, by a fixed step, so a simulation run is
//! fully deterministic.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex, MutexGuard};
use log::trace;
use serde::Deserialize;

use super::{ChassisEqpt, EqptError, LineSensorEqpt, WheelSide, NUM_LINE_CHANNELS};
use util::maths::clamp_sym;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulated world.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Lateral spacing between adjacent line sensor channels.
    ///
    /// Units: meters
    pub sensor_spacing_m: f64,

    /// Standard deviation of the line's reflectance profile.
    ///
    /// Units: meters
    pub line_sigma_m: f64,

    /// Raw reading over the centre of the line.
    pub line_value: f64,

    /// Raw reading over the bare floor.
    pub floor_value: f64,

    /// Distance between the steered and the driven axle.
    ///
    /// Units: meters
    pub wheelbase_m: f64,

    /// Forward speed at full power.
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Curvature of the line, positive curving toward the left sensor.
    ///
    /// Units: 1/meters
    pub line_curvature_m: f64,

    /// Initial lateral offset of the line, positive toward the left sensor.
    ///
    /// Units: meters
    pub initial_offset_m: f64,

    /// Time the world advances on each sensor read.
    ///
    /// Units: seconds
    pub step_s: f64,

    /// Steering limit of the servo.
    ///
    /// Units: degrees
    pub max_str_angle_deg: f64,

    /// Yaw polarity of the steering linkage. `+1` turns the robot toward its left for positive
    /// steering angles, as `ChassisEqpt::set_str_angle_deg` expects. `-1` models a linkage
    /// mounted the other way.
    pub str_yaw_sign: f64,

    /// If non-zero every Nth sensor read fails.
    pub read_fault_period: u64,
}

/// The simulated world state, shared between the simulated sensor and chassis.
#[derive(Debug)]
pub struct SimWorld {
    params: SimParams,

    /// Lateral offset of the line relative to the robot, positive toward the left sensor.
    offset_m: f64,

    /// Heading of the robot relative to the line tangent, positive toward the left sensor.
    heading_rad: f64,

    str_angle_deg: f64,
    wheel_power: [f64; 2],

    num_reads: u64,
    num_stops: u64,
    reject_actuators: bool,
    sensor_connected: bool,
}

/// Handle to a shared simulated world.
pub type SimWorldHandle = Arc<Mutex<SimWorld>>;

/// Simulated line sensor.
pub struct SimLineSensor {
    world: SimWorldHandle
}

/// Simulated steering servo and drive motors.
pub struct SimChassis {
    world: SimWorldHandle
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for SimParams {
    fn default() -> Self {
        Self {
            sensor_spacing_m: 0.02,
            line_sigma_m: 0.008,
            line_value: 100.0,
            floor_value: 2000.0,
            wheelbase_m: 0.095,
            max_speed_ms: 0.6,
            line_curvature_m: 0.0,
            initial_offset_m: 0.0,
            step_s: 0.01,
            max_str_angle_deg: 30.0,
            str_yaw_sign: 1.0,
            read_fault_period: 0,
        }
    }
}

impl SimWorld {
    /// Create a new world, returning the shared handle.
    pub fn new(params: SimParams) -> SimWorldHandle {
        Arc::new(Mutex::new(Self {
            offset_m: params.initial_offset_m,
            heading_rad: 0.0,
            str_angle_deg: 0.0,
            wheel_power: [0.0; 2],
            num_reads: 0,
            num_stops: 0,
            reject_actuators: false,
            sensor_connected: true,
            params,
        }))
    }

    /// Build the sensor and chassis equipment attached to the given world.
    pub fn eqpt(world: &SimWorldHandle) -> (SimLineSensor, SimChassis) {
        (
            SimLineSensor { world: world.clone() },
            SimChassis { world: world.clone() }
        )
    }

    /// Lateral offset of the line, positive toward the left sensor.
    pub fn offset_m(&self) -> f64 {
        self.offset_m
    }

    /// Teleport the line to the given lateral offset.
    pub fn set_offset_m(&mut self, offset_m: f64) {
        self.offset_m = offset_m;
        self.heading_rad = 0.0;
    }

    /// Last commanded steering angle.
    pub fn str_angle_deg(&self) -> f64 {
        self.str_angle_deg
    }

    /// Last commanded wheel powers, `[left, right]`.
    pub fn wheel_power(&self) -> [f64; 2] {
        self.wheel_power
    }

    /// Number of times `stop` has been called on the chassis.
    pub fn num_stops(&self) -> u64 {
        self.num_stops
    }

    /// Make the chassis reject (or accept again) every actuator command.
    pub fn set_reject_actuators(&mut self, reject: bool) {
        self.reject_actuators = reject;
    }

    /// Connect or disconnect the line sensor.
    pub fn set_sensor_connected(&mut self, connected: bool) {
        self.sensor_connected = connected;
    }

    /// Forward speed of the robot from the wheel powers.
    ///
    /// The motors are mirrored, so forward is `+power` on the left and `-power` on the right.
    fn speed_ms(&self) -> f64 {
        0.5 * (self.wheel_power[0] - self.wheel_power[1]) / 100.0 * self.params.max_speed_ms
    }

    /// Advance the world by one step.
    fn step(&mut self) {
        let dt = self.params.step_s;
        let speed_ms = self.speed_ms();

        let yaw_rate = self.params.str_yaw_sign
            * speed_ms
            * self.str_angle_deg.to_radians().tan()
            / self.params.wheelbase_m;

        self.heading_rad += (yaw_rate - speed_ms * self.params.line_curvature_m) * dt;
        self.offset_m -= speed_ms * self.heading_rad.sin() * dt;
    }

    /// Render the three raw channel readings for the current offset.
    fn render(&self) -> [f64; NUM_LINE_CHANNELS] {
        let p = &self.params;
        let positions_m = [p.sensor_spacing_m, 0.0, -p.sensor_spacing_m];
        let mut raw = [0f64; NUM_LINE_CHANNELS];

        for (r, x) in raw.iter_mut().zip(positions_m.iter()) {
            let d = (x - self.offset_m) / p.line_sigma_m;
            *r = p.floor_value + (p.line_value - p.floor_value) * (-0.5 * d * d).exp();
        }

        raw
    }
}

impl SimLineSensor {
    fn world(&self) -> Result<MutexGuard<'_, SimWorld>, EqptError> {
        self.world.lock().map_err(|_| EqptError::NotConnected)
    }
}

impl LineSensorEqpt for SimLineSensor {
    fn read_channels(&mut self) -> Result<[f64; NUM_LINE_CHANNELS], EqptError> {
        let mut world = self.world()?;

        if !world.sensor_connected {
            return Err(EqptError::SensorTimeout)
        }

        world.step();
        world.num_reads += 1;

        let period = world.params.read_fault_period;
        if period > 0 && world.num_reads % period == 0 {
            return Err(EqptError::SensorRead(1))
        }

        let raw = world.render();
        trace!("Sim offset {:.4} m, raw {:?}", world.offset_m, raw);

        Ok(raw)
    }
}

impl SimChassis {
    fn world(&self) -> Result<MutexGuard<'_, SimWorld>, EqptError> {
        self.world.lock().map_err(|_| EqptError::NotConnected)
    }
}

impl ChassisEqpt for SimChassis {
    fn set_str_angle_deg(&mut self, angle_deg: f64) -> Result<(), EqptError> {
        let mut world = self.world()?;
        if world.reject_actuators {
            return Err(EqptError::ActuatorRejected("steer"))
        }
        world.str_angle_deg = clamp_sym(angle_deg, world.params.max_str_angle_deg);
        Ok(())
    }

    fn set_wheel_power(&mut self, side: WheelSide, power: f64) -> Result<(), EqptError> {
        let mut world = self.world()?;
        if world.reject_actuators {
            return Err(EqptError::ActuatorRejected("wheel power"))
        }
        let idx = match side {
            WheelSide::Left => 0,
            WheelSide::Right => 1
        };
        world.wheel_power[idx] = clamp_sym(power, 100.0);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), EqptError> {
        let mut world = self.world()?;
        world.num_stops += 1;
        // Stop is honoured even when other commands are being rejected.
        world.wheel_power = [0.0; 2];
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render_centred() {
        let world = SimWorld::new(SimParams::default());
        let (mut sensor, _) = SimWorld::eqpt(&world);

        let raw = sensor.read_channels().unwrap();

        // Centre over the dark line, sides equal
        assert!(raw[1] < raw[0]);
        assert!((raw[0] - raw[2]).abs() < 1e-9);
        assert!((raw[1] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_render_offset() {
        let world = SimWorld::new(SimParams {
            initial_offset_m: 0.02,
            ..Default::default()
        });
        let (mut sensor, _) = SimWorld::eqpt(&world);

        // Line under the left sensor
        let raw = sensor.read_channels().unwrap();
        assert!(raw[0] < raw[1]);
        assert!(raw[1] < raw[2]);
    }

    #[test]
    fn test_chassis_clamps_and_stops() {
        let world = SimWorld::new(SimParams::default());
        let (_, mut chassis) = SimWorld::eqpt(&world);

        chassis.set_str_angle_deg(45.0).unwrap();
        chassis.set_wheel_power(WheelSide::Left, 150.0).unwrap();
        chassis.set_wheel_power(WheelSide::Right, -150.0).unwrap();

        {
            let w = world.lock().unwrap();
            assert_eq!(w.str_angle_deg(), 30.0);
            assert_eq!(w.wheel_power(), [100.0, -100.0]);
        }

        chassis.stop().unwrap();
        chassis.stop().unwrap();

        let w = world.lock().unwrap();
        assert_eq!(w.wheel_power(), [0.0, 0.0]);
        assert_eq!(w.num_stops(), 2);
        assert_eq!(w.str_angle_deg(), 30.0);
    }

    #[test]
    fn test_faults() {
        let world = SimWorld::new(SimParams {
            read_fault_period: 2,
            ..Default::default()
        });
        let (mut sensor, mut chassis) = SimWorld::eqpt(&world);

        assert!(sensor.read_channels().is_ok());
        assert_eq!(sensor.read_channels(), Err(EqptError::SensorRead(1)));
        assert!(sensor.read_channels().is_ok());

        world.lock().unwrap().set_reject_actuators(true);
        assert!(chassis.set_str_angle_deg(0.0).is_err());
        assert!(chassis.set_wheel_power(WheelSide::Left, 10.0).is_err());
        assert!(chassis.stop().is_ok());
    }

    #[test]
    fn test_teleport_and_disconnect() {
        let world = SimWorld::new(SimParams::default());
        let (mut sensor, _) = SimWorld::eqpt(&world);

        world.lock().unwrap().set_offset_m(-0.02);
        let raw = sensor.read_channels().unwrap();
        assert!(raw[2] < raw[1]);
        assert!(raw[1] < raw[0]);

        world.lock().unwrap().set_sensor_connected(false);
        assert_eq!(sensor.read_channels(), Err(EqptError::SensorTimeout));

        world.lock().unwrap().set_sensor_connected(true);
        assert!(sensor.read_channels().is_ok());
    }

    #[test]
    fn test_drive_moves_offset() {
        let world = SimWorld::new(SimParams {
            initial_offset_m: 0.01,
            ..Default::default()
        });
        let (mut sensor, mut chassis) = SimWorld::eqpt(&world);

        // Steer toward the line and drive forwards
        chassis.set_str_angle_deg(20.0).unwrap();
        chassis.set_wheel_power(WheelSide::Left, 50.0).unwrap();
        chassis.set_wheel_power(WheelSide::Right, -50.0).unwrap();

        for _ in 0..20 {
            sensor.read_channels().unwrap();
        }

        assert!(world.lock().unwrap().offset_m() < 0.01);

        // The same demands turn away from the line with a reversed linkage
        let world = SimWorld::new(SimParams {
            initial_offset_m: 0.01,
            str_yaw_sign: -1.0,
            ..Default::default()
        });
        let (mut sensor, mut chassis) = SimWorld::eqpt(&world);

        chassis.set_str_angle_deg(20.0).unwrap();
        chassis.set_wheel_power(WheelSide::Left, 50.0).unwrap();
        chassis.set_wheel_power(WheelSide::Right, -50.0).unwrap();

        for _ in 0..20 {
            sensor.read_channels().unwrap();
        }

        assert!(world.lock().unwrap().offset_m() > 0.01);
    }
}
