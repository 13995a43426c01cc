//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};

// Internal
use comms_if::tc::Tc;
use line_lib::{follow_ctrl::FollowHandle, line_est::{CalibRef, EstStrategy}};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Commands are passed on through the handle, so they take effect at the start of the next tick.
pub(crate) fn exec(handle: &FollowHandle, tc: &Tc) {

    // Handle different Tcs
    match tc {
        Tc::None => (),
        Tc::Stop => {
            info!("Recieved Stop command");
            handle.request_stop();
        },
        Tc::SetLineRef(r) => {
            debug!("Recieved SetLineRef command: {:?}", r);
            if let Err(e) = handle.set_line_ref(CalibRef(*r)) {
                warn!("SetLineRef rejected: {}", e);
            }
        },
        Tc::SetCliffRef(r) => {
            debug!("Recieved SetCliffRef command: {:?}", r);
            if let Err(e) = handle.set_cliff_ref(CalibRef(*r)) {
                warn!("SetCliffRef rejected: {}", e);
            }
        },
        Tc::SetStrategy(s) => {
            debug!("Recieved SetStrategy command: {:?}", s);
            handle.set_strategy(EstStrategy::from(*s));
        },
        Tc::CalibrateTarget => {
            debug!("Recieved CalibrateTarget command");
            handle.calibrate_target();
        },
        Tc::Override(o) => {
            info!("Recieved Override command: {:?}", o);
            handle.set_override(Some(*o));
        },
        Tc::ClearOverride => {
            info!("Recieved ClearOverride command");
            handle.clear_override();
        }
    }

}
