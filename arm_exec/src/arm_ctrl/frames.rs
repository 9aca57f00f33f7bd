//! Coordinate frame conversions
//!
//! Three frames are used when commanding an arm:
//!
//! - Arm: origin at the shoulder axis, fixed to the arm's mounting.
//! - Robot: origin at the centre of the mobile base, +x forward.
//! - Table: the world frame of the playing field.
//!
//! Every conversion translates first and rotates second. Table coordinates
//! depend on the base pose, which must be sampled at the time of conversion
//! since the base may be moving during an arm trajectory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt, str::FromStr};

use super::ArmCtrlError;
use crate::loc::Pose;
use util::{geom::Polar, maths::wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Where an arm is mounted on the base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmMount {
    /// Position of the shoulder axis in the robot frame.
    ///
    /// Units: millimeters
    pub offset_mm: Vector2<f64>,

    /// Rotation of the arm frame relative to the robot frame.
    ///
    /// Units: radians
    pub rotation_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The frame a coordinate pair is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Frame {
    Arm,
    Robot,
    Table,
}

/// A point tagged with the frame it is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FramedPoint {
    Arm(Point2<f64>),
    Robot(Point2<f64>),
    Table(Point2<f64>),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Frame {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frame::Arm => "arm",
            Frame::Robot => "robot",
            Frame::Table => "table",
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frame {
    type Err = ArmCtrlError;

    /// Parse a frame tag. Anything other than a known tag, including the
    /// empty string, is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arm" => Ok(Frame::Arm),
            "robot" | "base" => Ok(Frame::Robot),
            "table" | "world" => Ok(Frame::Table),
            _ => Err(ArmCtrlError::UnknownFrame(s.to_string())),
        }
    }
}

impl TryFrom<String> for Frame {
    type Error = ArmCtrlError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Frame> for &'static str {
    fn from(frame: Frame) -> Self {
        frame.as_str()
    }
}

impl FramedPoint {
    pub fn new(frame: Frame, x: f64, y: f64) -> Self {
        let p = Point2::new(x, y);
        match frame {
            Frame::Arm => FramedPoint::Arm(p),
            Frame::Robot => FramedPoint::Robot(p),
            Frame::Table => FramedPoint::Table(p),
        }
    }

    pub fn frame(&self) -> Frame {
        match self {
            FramedPoint::Arm(_) => Frame::Arm,
            FramedPoint::Robot(_) => Frame::Robot,
            FramedPoint::Table(_) => Frame::Table,
        }
    }

    /// The raw coordinates, in whichever frame they are expressed in.
    pub fn point(&self) -> Point2<f64> {
        match self {
            FramedPoint::Arm(p) | FramedPoint::Robot(p) | FramedPoint::Table(p) => *p,
        }
    }

    /// Express this point in the arm frame.
    pub fn to_arm_frame(&self, mount: &ArmMount, base_pose: &Pose) -> Point2<f64> {
        let arm = match self {
            FramedPoint::Arm(p) => *p,
            FramedPoint::Robot(p) => robot_to_arm(p, mount),
            FramedPoint::Table(p) => {
                FramedPoint::Robot(table_to_robot(p, base_pose)).to_arm_frame(mount, base_pose)
            }
        };

        trace!("{:?} -> arm ({:.3}, {:.3})", self, arm.x, arm.y);

        arm
    }

    /// True if every coordinate is finite.
    pub fn is_finite(&self) -> bool {
        let p = self.point();
        p.x.is_finite() && p.y.is_finite()
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a point from the robot frame into the arm frame.
pub fn robot_to_arm(target: &Point2<f64>, mount: &ArmMount) -> Point2<f64> {
    rotate_about_origin(target.coords - mount.offset_mm, -mount.rotation_rad)
}

/// Convert a point from the table frame into the robot frame.
///
/// The heading is subtracted: a base at heading `a` sees a table direction of
/// angle `a` as straight ahead.
pub fn table_to_robot(target: &Point2<f64>, base_pose: &Pose) -> Point2<f64> {
    rotate_about_origin(target.coords - base_pose.position_mm, -base_pose.heading_rad)
}

/// Convert a point in the given frame into the arm frame.
pub fn to_arm_frame(
    x: f64,
    y: f64,
    frame: Frame,
    mount: &ArmMount,
    base_pose: &Pose,
) -> Point2<f64> {
    FramedPoint::new(frame, x, y).to_arm_frame(mount, base_pose)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Rotate a vector by going through its polar form.
fn rotate_about_origin(v: Vector2<f64>, angle_rad: f64) -> Point2<f64> {
    let mut pol = Polar::from_cart(&v);
    pol.theta = wrap_pi(pol.theta + angle_rad);
    Point2::from(pol.to_cart())
}
