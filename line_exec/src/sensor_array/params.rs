//! Parameters structure for the SensorArray

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the line sensor array.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {

    // ---- FILTERING ----

    /// Weight of a new raw reading in the exponential low-pass filter.
    ///
    /// Must be in (0, 1]. Higher values track faster but admit more noise.
    pub filter_alpha: f64,

    // ---- VALIDATION ----

    /// Lowest valid raw reading.
    pub min_raw_value: f64,

    /// Highest valid raw reading (4095 for the 12 bit ADC).
    pub max_raw_value: f64,

    /// Number of consecutive faulty reads tolerated before the array reports a fatal fault.
    pub max_consec_faults: u64,

    /// Longest a single read of the equipment may take.
    ///
    /// Units: seconds
    pub max_read_duration_s: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            filter_alpha: 0.5,
            min_raw_value: 0.0,
            max_raw_value: 4095.0,
            max_consec_faults: 5,
            max_read_duration_s: 0.01,
        }
    }
}
