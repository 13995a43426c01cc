//! Ackermann wheel power calculations

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal imports
use super::*;
use log::trace;
use util::maths::clamp_sym;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocoCtrl {
    /// Calculate the wheel powers for the given drive power and steering angle.
    ///
    /// The front wheels steer and the rear wheels drive, so in a turn the inner rear wheel follows
    /// a tighter arc than the outer one. The inner wheel is slowed by the cosine of the steering
    /// angle. A positive angle turns left, so the left wheel is the inner one and is slowed; a
    /// negative angle slows the right wheel. The angle is limited to `max_str_angle_deg` before
    /// scaling.
    pub(crate) fn calc_ackerman(&mut self, power: f64, str_angle_deg: f64) -> WheelPowers {
        let p = &self.params;

        let abs_angle_deg = str_angle_deg.abs().min(p.max_str_angle_deg);
        let scale = abs_angle_deg.to_radians().cos();

        let (left, right) = if str_angle_deg > 0.0 {
            (power * scale, power)
        }
        else if str_angle_deg < 0.0 {
            (power, power * scale)
        }
        else {
            (power, power)
        };

        let demand = WheelPowers {
            left: p.left_sign * left,
            right: p.right_sign * right
        };
        let powers = WheelPowers {
            left: clamp_sym(demand.left, p.max_power),
            right: clamp_sym(demand.right, p.max_power)
        };

        self.report.power_limited = powers != demand;

        trace!(
            "Ackerman: power {:.1} angle {:+.1} deg -> {:?}",
            power, str_angle_deg, powers
        );

        powers
    }
}
