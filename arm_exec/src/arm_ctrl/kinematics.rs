//! Arm inverse kinematics calculations
//!
//! The arm is a planar two-link chain. Finding the joint angles for a hand
//! position is the intersection of two circles: one of radius `l1` centred on
//! the shoulder (the arm frame origin), and one of radius `l2` centred on the
//! target. Each intersection is a candidate elbow position.
//!
//! Both angles are absolute in the arm frame: the shoulder angle is the
//! direction of the upper link and the elbow angle the direction of the
//! forearm, both measured from the arm's +x axis.
//!
//! # Precision
//!
//! Near the fully extended (`d ~ l1 + l2`) and fully folded
//! (`d ~ |l1 - l2|`) configurations the two elbow candidates merge and the
//! forearm vector becomes short relative to its rounding error, so the elbow
//! `atan2` loses precision quickly. No special-casing is applied; callers
//! wanting well-conditioned angles should keep targets away from these
//! boundaries.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::obstacle::ObstacleCheck;
use util::geom::{Circle, CircleIntersection};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The lengths of the two links of the arm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkLengths {
    /// Shoulder to elbow.
    ///
    /// Units: millimeters
    pub upper_mm: f64,

    /// Elbow to hand.
    ///
    /// Units: millimeters
    pub fore_mm: f64,
}

/// A solved arm configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkSolution {
    /// Chosen elbow position in the arm frame.
    pub elbow_mm: Point2<f64>,

    /// Units: radians
    pub shoulder_angle_rad: f64,

    /// Units: radians
    pub elbow_angle_rad: f64,

    /// Number of geometric elbow candidates the solution was chosen from.
    pub num_candidates: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Preference used to pick between two collision-free elbow positions.
///
/// Front and back are defined in the robot frame for an arm mounted with a
/// positive rotation offset, see [`mode_for_orientation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShoulderMode {
    Front,
    Back,
}

/// Reasons an IK solve can fail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum IkError {
    #[error("Target ({0:.1}, {1:.1}) mm is out of reach of the arm")]
    Unreachable(f64, f64),

    #[error("Every elbow position for target ({0:.1}, {1:.1}) mm collides with an obstacle")]
    Blocked(f64, f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LinkLengths {
    pub fn new(upper_mm: f64, fore_mm: f64) -> Self {
        Self { upper_mm, fore_mm }
    }

    /// True if both lengths are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.upper_mm.is_finite()
            && self.fore_mm.is_finite()
            && self.upper_mm > 0.0
            && self.fore_mm > 0.0
    }
}

impl Default for ShoulderMode {
    fn default() -> Self {
        ShoulderMode::Front
    }
}

impl ShoulderMode {
    pub fn mirrored(self) -> Self {
        match self {
            ShoulderMode::Front => ShoulderMode::Back,
            ShoulderMode::Back => ShoulderMode::Front,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the possible positions of the elbow for the given hand target.
pub fn compute_possible_elbow_positions(
    target: &Point2<f64>,
    lengths: &LinkLengths,
) -> CircleIntersection {
    let shoulder = Circle::new(Point2::origin(), lengths.upper_mm);
    let hand = Circle::new(*target, lengths.fore_mm);

    shoulder.intersect(&hand)
}

/// Invert the shoulder mode depending on which side of the robot the arm is
/// mounted on.
///
/// Front and back are robot-frame notions while the elbow choice is made in
/// the arm frame, so an arm with a negative rotation offset sees them
/// mirrored.
pub fn mode_for_orientation(mode: ShoulderMode, arm_rotation_offset_rad: f64) -> ShoulderMode {
    if arm_rotation_offset_rad < 0.0 {
        mode.mirrored()
    } else {
        mode
    }
}

/// Choose between two elbow positions according to the (already oriented)
/// shoulder mode.
///
/// Targets behind the shoulder (`x < 0`) always take the elbow furthest
/// forward, to keep the upper link clear of the base.
pub fn choose_shoulder_solution(
    target: &Point2<f64>,
    elbow1: Point2<f64>,
    elbow2: Point2<f64>,
    mode: ShoulderMode,
) -> Point2<f64> {
    if target.x < 0.0 {
        return if elbow1.x > elbow2.x { elbow1 } else { elbow2 };
    }

    match mode {
        ShoulderMode::Back => {
            if elbow1.y > elbow2.y {
                elbow1
            } else {
                elbow2
            }
        }
        ShoulderMode::Front => {
            if elbow2.y > elbow1.y {
                elbow1
            } else {
                elbow2
            }
        }
    }
}

/// Absolute angle of the upper link.
pub fn compute_shoulder_angle(elbow: &Point2<f64>) -> f64 {
    elbow.y.atan2(elbow.x)
}

/// Absolute angle of the forearm.
///
/// Very sensitive to rounding errors when the elbow and hand are close, see
/// the module documentation.
pub fn compute_elbow_angle(elbow: &Point2<f64>, hand: &Point2<f64>) -> f64 {
    (hand.y - elbow.y).atan2(hand.x - elbow.x)
}

/// Position of the hand for the given absolute link angles.
pub fn forward_kinematics(
    shoulder_angle_rad: f64,
    elbow_angle_rad: f64,
    lengths: &LinkLengths,
) -> Point2<f64> {
    Point2::new(
        shoulder_angle_rad.cos() * lengths.upper_mm + elbow_angle_rad.cos() * lengths.fore_mm,
        shoulder_angle_rad.sin() * lengths.upper_mm + elbow_angle_rad.sin() * lengths.fore_mm,
    )
}

/// Solve the inverse kinematics for a hand target at height `z_mm`.
///
/// When two elbow positions exist they are filtered through `obstacles`: a
/// single clear candidate is taken, two blocked candidates fail, and two
/// clear candidates are split by `mode` (which must already be oriented with
/// [`mode_for_orientation`]). A single tangent solution is returned without
/// consulting the obstacles.
pub fn solve<O>(
    target: &Point2<f64>,
    z_mm: f64,
    lengths: &LinkLengths,
    mode: ShoulderMode,
    obstacles: &O,
) -> Result<IkSolution, IkError>
where
    O: ObstacleCheck + ?Sized,
{
    let (elbow, num_candidates) = match compute_possible_elbow_positions(target, lengths) {
        CircleIntersection::None => return Err(IkError::Unreachable(target.x, target.y)),
        CircleIntersection::One(e) => (e, 1),
        CircleIntersection::Two(e1, e2) => {
            let e1_blocked = obstacles.is_blocked(&e1, target, z_mm);
            let e2_blocked = obstacles.is_blocked(&e2, target, z_mm);

            let chosen = match (e1_blocked, e2_blocked) {
                (true, true) => return Err(IkError::Blocked(target.x, target.y)),
                (false, true) => e1,
                (true, false) => e2,
                (false, false) => choose_shoulder_solution(target, e1, e2, mode),
            };

            (chosen, 2)
        }
    };

    let solution = IkSolution {
        elbow_mm: elbow,
        shoulder_angle_rad: compute_shoulder_angle(&elbow),
        elbow_angle_rad: compute_elbow_angle(&elbow, target),
        num_candidates,
    };

    debug!(
        "IK ({:.1}, {:.1}) -> elbow ({:.1}, {:.1}), shoulder {:.4} rad, elbow {:.4} rad",
        target.x,
        target.y,
        elbow.x,
        elbow.y,
        solution.shoulder_angle_rad,
        solution.elbow_angle_rad
    );

    Ok(solution)
}
