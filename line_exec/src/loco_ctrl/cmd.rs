//! Commands passed into LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::tc::follow::DriveOverride;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command to LocoCtrl.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DriveCmd {
    /// No command - keep the last output.
    None,

    /// Cut power to the wheels, keeping the steering angle.
    Stop,

    /// Set the steering angle only, the wheel powers are recalculated for the new angle.
    Steer {
        str_angle_deg: f64
    },

    /// Drive forwards at the given power with the current steering angle.
    Forward {
        power: f64
    },

    /// Drive backwards at the given power with the current steering angle.
    Backward {
        power: f64
    },

    /// Set the steering angle and drive at the given signed power.
    Drive {
        power: f64,
        str_angle_deg: f64
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl DriveCmd {

    /// Determine if the command is valid (i.e. contains only finite values).
    pub fn is_valid(&self) -> bool {
        match *self {
            DriveCmd::None | DriveCmd::Stop => true,
            DriveCmd::Steer { str_angle_deg } => str_angle_deg.is_finite(),
            DriveCmd::Forward { power } | DriveCmd::Backward { power } => power.is_finite(),
            DriveCmd::Drive { power, str_angle_deg } =>
                power.is_finite() && str_angle_deg.is_finite()
        }
    }
}

impl From<DriveOverride> for DriveCmd {
    fn from(o: DriveOverride) -> Self {
        DriveCmd::Drive {
            power: o.power,
            str_angle_deg: o.str_angle_deg
        }
    }
}
