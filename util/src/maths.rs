//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Clamp a value into `[min, max]`.
///
/// NaN values are passed through unchanged, callers must validate inputs
/// which could be NaN.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Clamp a value into the symmetric range `[-limit, limit]`.
pub fn clamp_sym<T>(value: T, limit: T) -> T
where
    T: Float
{
    let limit = limit.abs();
    clamp(&value, &-limit, &limit)
}

/// One step of a first order exponential low-pass filter.
///
/// `alpha` is the weight of the new sample, so `alpha = 1` passes the sample
/// straight through.
pub fn low_pass<T>(prev: T, sample: T, alpha: T) -> T
where
    T: Float
{
    alpha * sample + (T::one() - alpha) * prev
}

/// Return `+1` or `-1` following the sign of `value`, with zero mapped to `+1`.
pub fn sign_or_pos<T>(value: T) -> T
where
    T: Float
{
    if value < T::zero() {
        -T::one()
    }
    else {
        T::one()
    }
}
