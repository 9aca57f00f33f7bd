//! Arm control module
//!
//! Drives one two-link planar arm on a vertical stage. Trajectories of hand
//! positions are played back against the control clock, each sample is solved
//! for the shoulder and elbow angles, and the result is sent as consigns to
//! the three axis controllers.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod axis;
mod cmd;
pub mod frames;
pub mod kinematics;
pub mod obstacle;
mod params;
mod state;
pub mod trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use frames::{Frame, FramedPoint};
pub use kinematics::{IkError, ShoulderMode};
pub use obstacle::ObstacleError;
pub use params::*;
pub use state::*;
pub use trajectory::{Keyframe, MovementHandle, Trajectory};

use util::params::LoadError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during ArmCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum ArmCtrlError {
    #[error("Unknown coordinate frame {0:?}, expected one of arm, robot or table")]
    UnknownFrame(String),

    #[error("Keyframe {0} is not strictly after the one before it")]
    UnorderedKeyframes(usize),

    #[error("Keyframe {0} contains a non-finite coordinate")]
    NonFiniteKeyframe(usize),

    #[error("Invalid motion duration {0} s, must be strictly positive")]
    InvalidDuration(f64),

    #[error("Keyframe time {0} s is out of range")]
    KeyframeTimeOutOfRange(f64),

    #[error("Invalid arm parameters: {0}")]
    InvalidParams(String),

    #[error("Could not load the arm parameters: {0}")]
    ParamLoad(#[from] LoadError),

    #[error(transparent)]
    Obstacle(#[from] ObstacleError),
}
