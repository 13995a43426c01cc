//! Handle shared between the control loop and its external collaborators

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex, MutexGuard, PoisonError
};
use log::info;

// Internal
use comms_if::tc::follow::DriveOverride;
use super::FollowError;
use crate::line_est::{CalibRef, EstStrategy};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A cloneable handle to a running `FollowCtrl`.
///
/// Commands set through the handle are applied at the start of the next tick. Status is
/// published at the end of every tick.
#[derive(Debug, Clone, Default)]
pub struct FollowHandle {
    shared: Arc<Shared>
}

/// Requests waiting to be picked up by the loop.
#[derive(Debug, Clone, Default)]
pub(crate) struct Requests {
    pub line_ref: Option<CalibRef>,
    pub cliff_ref: Option<CalibRef>,
    pub strategy: Option<EstStrategy>,
    pub calibrate_target: bool,
}

#[derive(Debug, Default)]
struct Shared {
    stop_requested: AtomicBool,

    /// Bits of the latest `f64` line error.
    error_bits: AtomicU64,
    line_lost: AtomicBool,
    recovering: AtomicBool,

    drive_override: Mutex<Option<DriveOverride>>,
    line_ref: Mutex<Option<CalibRef>>,
    requests: Mutex<Requests>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FollowHandle {

    /// Ask the loop to stop at the start of its next tick.
    pub fn request_stop(&self) {
        info!("Stop requested");
        self.shared.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop_requested.load(Ordering::SeqCst)
    }

    /// The line error of the last tick, zero when the line was lost.
    pub fn current_error(&self) -> f64 {
        f64::from_bits(self.shared.error_bits.load(Ordering::SeqCst))
    }

    /// Whether the line was lost on the last tick.
    pub fn is_line_lost(&self) -> bool {
        self.shared.line_lost.load(Ordering::SeqCst)
    }

    /// Whether the loop is driving the recovery manoeuvre.
    pub fn is_recovering(&self) -> bool {
        self.shared.recovering.load(Ordering::SeqCst)
    }

    /// Replace (or with `None` release) the automatic drive demands.
    pub fn set_override(&self, drive_override: Option<DriveOverride>) {
        *lock(&self.shared.drive_override) = drive_override;
    }

    pub fn clear_override(&self) {
        self.set_override(None);
    }

    /// The active override, if any.
    pub fn drive_override(&self) -> Option<DriveOverride> {
        *lock(&self.shared.drive_override)
    }

    /// Replace the line calibration reference.
    ///
    /// A reference with a non-finite channel is refused here, before it reaches the loop.
    pub fn set_line_ref(&self, line_ref: CalibRef) -> Result<(), FollowError> {
        if !line_ref.is_valid() {
            return Err(FollowError::InvalidCalibRef(line_ref))
        }
        lock(&self.shared.requests).line_ref = Some(line_ref);
        Ok(())
    }

    /// The line calibration reference in use, once the loop has published it.
    pub fn line_ref(&self) -> Option<CalibRef> {
        *lock(&self.shared.line_ref)
    }

    /// Replace the cliff calibration reference, refusing non-finite channels.
    pub fn set_cliff_ref(&self, cliff_ref: CalibRef) -> Result<(), FollowError> {
        if !cliff_ref.is_valid() {
            return Err(FollowError::InvalidCalibRef(cliff_ref))
        }
        lock(&self.shared.requests).cliff_ref = Some(cliff_ref);
        Ok(())
    }

    /// Switch the line error estimation strategy.
    pub fn set_strategy(&self, strategy: EstStrategy) {
        lock(&self.shared.requests).strategy = Some(strategy);
    }

    /// Record the next sample as the centred target profile.
    pub fn calibrate_target(&self) {
        lock(&self.shared.requests).calibrate_target = true;
    }

    /// Take all pending requests, leaving none behind.
    pub(crate) fn take_requests(&self) -> Requests {
        std::mem::take(&mut *lock(&self.shared.requests))
    }

    pub(crate) fn publish(&self, error: f64, lost: bool, recovering: bool, line_ref: CalibRef) {
        self.shared.error_bits.store(error.to_bits(), Ordering::SeqCst);
        self.shared.line_lost.store(lost, Ordering::SeqCst);
        self.shared.recovering.store(recovering, Ordering::SeqCst);
        *lock(&self.shared.line_ref) = Some(line_ref);
    }
}

/// Lock a mutex, carrying on with the data if another holder panicked.
///
/// Every value behind these mutexes is replaced whole, so a poisoned one is never half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
