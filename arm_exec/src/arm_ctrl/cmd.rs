//! Commands passed into ArmCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};

use super::{
    frames::Frame,
    kinematics::ShoulderMode,
    trajectory::Keyframe,
    ArmCtrlError,
};
use util::time::seconds_to_micros;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A keyframe as received in a command, timed relative to the command's
/// reception.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyframeCmd {
    pub frame: Frame,

    /// Units: millimeters
    pub x_mm: f64,

    /// Units: millimeters
    pub y_mm: f64,

    /// Units: millimeters
    pub z_mm: f64,

    /// Time after reception at which the hand shall be here.
    ///
    /// Units: seconds
    pub time_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A command that can be executed by arm control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArmCmd {
    /// Replace the current trajectory.
    ExecuteMovement { keyframes: Vec<KeyframeCmd> },

    /// Move in a straight line, starting now.
    LinearMotion {
        frame: Frame,
        start_mm: Point3<f64>,
        end_mm: Point3<f64>,
        duration_s: f64,
    },

    /// Hold a single position, starting now.
    Goto {
        frame: Frame,
        target_mm: Point3<f64>,
        duration_s: f64,
    },

    /// Stop the arm, leaving its axes disabled.
    Shutdown,

    SetShoulderMode(ShoulderMode),

    CreateObstacle {
        frame: Frame,
        vertices_mm: Vec<Point2<f64>>,
        height_mm: f64,
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl KeyframeCmd {
    /// Make this an absolute keyframe given the reception date.
    pub fn to_keyframe(&self, received_us: i64) -> Result<Keyframe, ArmCtrlError> {
        let date_us = seconds_to_micros(self.time_s)
            .and_then(|t| received_us.checked_add(t))
            .ok_or(ArmCtrlError::KeyframeTimeOutOfRange(self.time_s))?;

        Ok(Keyframe::new(
            self.frame,
            self.x_mm,
            self.y_mm,
            self.z_mm,
            date_us,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cmd_json() {
        let cmd: ArmCmd = serde_json::from_str(
            r#"{"ExecuteMovement": {"keyframes": [
                {"frame": "robot", "x_mm": 100.0, "y_mm": 0.0, "z_mm": 50.0, "time_s": 0.5}
            ]}}"#,
        )
        .unwrap();

        match cmd {
            ArmCmd::ExecuteMovement { keyframes } => {
                assert_eq!(keyframes.len(), 1);
                let k = keyframes[0].to_keyframe(1_000_000).unwrap();
                assert_eq!(k.date_us, 1_500_000);
                assert_eq!(k.position_mm.frame(), Frame::Robot);

                let far = KeyframeCmd {
                    time_s: 1e300,
                    ..keyframes[0]
                };
                assert!(matches!(
                    far.to_keyframe(1_000_000),
                    Err(ArmCtrlError::KeyframeTimeOutOfRange(_))
                ));
            }
            c => panic!("Wrong command {:?}", c),
        }

        let cmd: ArmCmd = serde_json::from_str(
            r#"{"Goto": {"frame": "table", "target_mm": [1.0, 2.0, 3.0], "duration_s": 1.0}}"#,
        )
        .unwrap();
        assert!(matches!(cmd, ArmCmd::Goto { frame: Frame::Table, .. }));

        let cmd: ArmCmd = serde_json::from_str(r#""Shutdown""#).unwrap();
        assert_eq!(cmd, ArmCmd::Shutdown);

        assert!(serde_json::from_str::<ArmCmd>(
            r#"{"Goto": {"frame": "moon", "target_mm": [1.0, 2.0, 3.0], "duration_s": 1.0}}"#
        )
        .is_err());
    }
}
