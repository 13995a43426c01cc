//! # Steering controllers module
//!
//! The PD controller used by SteerCtrl.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PD controller
///
/// Time is passed in explicitly rather than read from the clock, so the controller runs on the
/// loop's tick time and can be stepped deterministically.
#[derive(Debug, Serialize, Clone, Default)]
pub struct PdController {
    /// Time the previous error was passed in
    prev_time_s: Option<f64>,

    /// Previous error
    prev_error: Option<f64>,
}

/// The terms of one controller evaluation.
#[derive(Debug, Serialize, Clone, Copy, Default, PartialEq)]
pub struct PdOutput {
    pub p_term: f64,
    pub d_term: f64,

    /// Time step used for the derivative, zero on the first step.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PdController {

    /// Create a new controller with no memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the value of the controller for the given error.
    ///
    /// The time step is floored at `min_dt_s` so a repeated or backwards timestamp can't blow up
    /// the derivative.
    pub fn get(
        &mut self,
        error: f64,
        now_s: f64,
        k_p: f64,
        k_d: f64,
        min_dt_s: f64
    ) -> PdOutput {
        // If there's no previous step there's no derivative. Taking the error itself as the
        // change would kick the steering on the first step.
        let (d_term, dt_s) = match (self.prev_error, self.prev_time_s) {
            (Some(e0), Some(t0)) => {
                let dt_s = (now_s - t0).max(min_dt_s);
                (k_d * (error - e0) / dt_s, dt_s)
            },
            _ => (0f64, 0f64)
        };

        // Remember the previous error and time
        self.prev_error = Some(error);
        self.prev_time_s = Some(now_s);

        PdOutput {
            p_term: k_p * error,
            d_term,
            dt_s
        }
    }

    /// Forget the previous error and time.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.prev_time_s = None;
    }

    /// Whether the controller has a previous step to differentiate against.
    pub fn is_primed(&self) -> bool {
        self.prev_error.is_some()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pd() {
        let mut pd = PdController::new();

        // First step is proportional only
        let out = pd.get(0.5, 0.0, 15.0, 5.0, 1e-3);
        assert_eq!(out, PdOutput { p_term: 7.5, d_term: 0.0, dt_s: 0.0 });
        assert!(pd.is_primed());

        // 0.1 change over 0.01 s
        let out = pd.get(0.6, 0.01, 15.0, 5.0, 1e-3);
        assert!((out.d_term - 50.0).abs() < 1e-6);
        assert!((out.dt_s - 0.01).abs() < 1e-12);

        // Same timestamp uses the minimum step
        let out = pd.get(0.7, 0.01, 15.0, 5.0, 1e-3);
        assert!((out.d_term - 500.0).abs() < 1e-6);
        assert_eq!(out.dt_s, 1e-3);

        pd.reset();
        assert!(!pd.is_primed());
        assert_eq!(pd.get(-0.2, 5.0, 15.0, 5.0, 1e-3).d_term, 0.0);
    }
}
