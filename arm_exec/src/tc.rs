//! # Telecommand module
//!
//! Telecommands are the instructions given to the arm executable, for now read from a timed
//! script. Each one is a JSON object, for instance:
//!
//! ```json
//! {"Arm": {"side": "Left", "cmd": {"Goto": {"frame": "robot", "target_mm": [0.0, 250.0, 50.0], "duration_s": 2.0}}}}
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{arm_ctrl::ArmCmd, loc::Pose};

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Which of the two arms a command is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArmSide {
    Left,
    Right,
}

/// A telecommand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tc {
    /// Shut both arms down and refuse further arm commands until made unsafe.
    MakeSafe,

    MakeUnsafe,

    /// A command for one arm.
    Arm { side: ArmSide, cmd: ArmCmd },

    /// Set the base pose, for runs without a pose estimator.
    SetPose(Pose),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl fmt::Display for ArmSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArmSide::Left => f.write_str("left"),
            ArmSide::Right => f.write_str("right"),
        }
    }
}
