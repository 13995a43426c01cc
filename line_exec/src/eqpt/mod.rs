//! # Equipment Interface Module
//!
//! This module provides a unified interface to the hardware the line follower depends on, so that
//! the control core can abstract over the real sensor and motor boards and the simulation.
//!
//! All actuator primitives shall clamp internally and be idempotent.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulated line sensor and chassis equipment.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of channels on the line sensor module.
pub const NUM_LINE_CHANNELS: usize = 3;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for reading the analog line sensor.
pub trait LineSensorEqpt {

    /// Read the raw value of each channel, ordered left, centre, right.
    ///
    /// Units and range are device defined (for example 0 to 4095 for a 12 bit ADC).
    fn read_channels(&mut self) -> Result<[f64; NUM_LINE_CHANNELS], EqptError>;
}

/// Trait to provide a unified API for the steering servo and the two rear drive motors.
pub trait ChassisEqpt {

    /// Set the steering servo angle.
    ///
    /// ## Arguments
    /// - `angle_deg` - The angle in degrees. Positive angles turn the robot toward its left,
    ///   the side a positive line error points to. A servo linkage which turns the other way is
    ///   corrected with `steer_ctrl`'s `str_sign` parameter.
    fn set_str_angle_deg(&mut self, angle_deg: f64) -> Result<(), EqptError>;

    /// Set the power of a single drive motor.
    ///
    /// ## Arguments
    /// - `side` - The wheel to set
    /// - `power` - The signed power, between -100 and 100. Values outside this range are clamped.
    fn set_wheel_power(&mut self, side: WheelSide, power: f64) -> Result<(), EqptError>;

    /// Cut power to both drive motors.
    fn stop(&mut self) -> Result<(), EqptError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// One of the two driven (rear) wheels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelSide {
    Left,
    Right
}

/// Errors raised by the equipment layer.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EqptError {
    #[error("Could not read sensor channel {0}")]
    SensorRead(usize),

    #[error("The sensor did not respond")]
    SensorTimeout,

    #[error("The {0} command was rejected by the hardware")]
    ActuatorRejected(&'static str),

    #[error("The equipment is not connected")]
    NotConnected
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<T: LineSensorEqpt + ?Sized> LineSensorEqpt for Box<T> {
    fn read_channels(&mut self) -> Result<[f64; NUM_LINE_CHANNELS], EqptError> {
        (**self).read_channels()
    }
}

impl<T: ChassisEqpt + ?Sized> ChassisEqpt for Box<T> {
    fn set_str_angle_deg(&mut self, angle_deg: f64) -> Result<(), EqptError> {
        (**self).set_str_angle_deg(angle_deg)
    }

    fn set_wheel_power(&mut self, side: WheelSide, power: f64) -> Result<(), EqptError> {
        (**self).set_wheel_power(side, power)
    }

    fn stop(&mut self) -> Result<(), EqptError> {
        (**self).stop()
    }
}
