//! # Line follower library.
//!
//! The closed-loop locomotion core of a small front-steered, rear-driven line following robot.
//! This library allows the executable, tests and benchmarks to access the modules of the core.
//!
//! Data flows one way through each tick:
//!
//! ```text
//! eqpt (sensor) -> sensor_array -> line_est -> steer_ctrl -> loco_ctrl -> eqpt (chassis)
//! ```
//!
//! with `follow_ctrl` owning the modules and running the loop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Equipment interfaces - the line sensor and chassis traits and their simulation
pub mod eqpt;

/// Sensor array - reads and filters the line sensor channels
pub mod sensor_array;

/// Line estimation - converts a sensor sample into a line error and lost flag
pub mod line_est;

/// Steering control - PD control of the steering angle from the line error
pub mod steer_ctrl;

/// Locomotion control - converts power and steering demands into wheel powers
pub mod loco_ctrl;

/// Follow control - the line following state machine and control loop
pub mod follow_ctrl;

/// Line executable parameters
pub mod params;
