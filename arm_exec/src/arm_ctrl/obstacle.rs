//! Obstacles the arm must keep clear of
//!
//! An obstacle is a polygonal footprint extruded up to a height. Obstacles are
//! only ever added during the life of an arm, never removed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use super::frames::{ArmMount, Frame, FramedPoint};
use crate::loc::Pose;
use util::geom::{is_crossing_poly, is_in_poly};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum number of vertices of an obstacle footprint.
pub const MIN_OBSTACLE_VERTICES: usize = 3;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Frame the vertices are expressed in.
    pub frame: Frame,

    /// Footprint of the obstacle, at least three vertices.
    ///
    /// Units: millimeters
    pub vertices_mm: Vec<Point2<f64>>,

    /// Top of the obstacle. The arm is only blocked when moving at or below
    /// this height.
    ///
    /// Units: millimeters
    pub height_mm: f64,
}

/// Identifies an obstacle within the set it was created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObstacleId(pub usize);

/// All obstacles known to an arm.
#[derive(Debug, Clone, Default)]
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

/// The obstacles of a set whose footprints have been converted into the arm
/// frame for one base pose.
#[derive(Debug, Clone)]
pub struct ArmFrameObstacles {
    footprints: Vec<(Vec<Point2<f64>>, f64)>,
}

/// Used when there is nothing to collide with.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoObstacles;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ObstacleError {
    #[error(
        "Trying to create a degenerate obstacle with {0} vertices (at least 3 are required)"
    )]
    Degenerate(usize),

    #[error("Obstacle contains a non-finite coordinate or height")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Collision query used by the IK solver, with all inputs in the arm frame.
pub trait ObstacleCheck {
    /// Returns true if an arm with its elbow at `elbow` and its hand at `hand`,
    /// moving at height `z_mm`, would touch an obstacle.
    ///
    /// The upper link runs from the origin (the shoulder) to `elbow`, the
    /// forearm from `elbow` to `hand`.
    fn is_blocked(&self, elbow: &Point2<f64>, hand: &Point2<f64>, z_mm: f64) -> bool;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ObstacleSet {
    /// Add a new obstacle to the set.
    ///
    /// Degenerate footprints (less than three vertices) are rejected and
    /// nothing is stored.
    pub fn create(
        &mut self,
        frame: Frame,
        vertices_mm: Vec<Point2<f64>>,
        height_mm: f64,
    ) -> Result<ObstacleId, ObstacleError> {
        if vertices_mm.len() < MIN_OBSTACLE_VERTICES {
            let e = ObstacleError::Degenerate(vertices_mm.len());
            warn!("{}, aborting.", e);
            return Err(e);
        }

        if !height_mm.is_finite()
            || vertices_mm
                .iter()
                .any(|v| !v.x.is_finite() || !v.y.is_finite())
        {
            warn!("{}, aborting.", ObstacleError::NonFinite);
            return Err(ObstacleError::NonFinite);
        }

        debug!(
            "New obstacle {} in {} frame, {} vertices, {} mm high",
            self.obstacles.len(),
            frame,
            vertices_mm.len(),
            height_mm
        );

        self.obstacles.push(Obstacle {
            frame,
            vertices_mm,
            height_mm,
        });

        Ok(ObstacleId(self.obstacles.len() - 1))
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Express every obstacle in the arm frame for the given mount and base
    /// pose.
    ///
    /// Table-frame obstacles move relative to the arm as the base moves, so
    /// this must be redone whenever the pose changes.
    pub fn in_arm_frame(&self, mount: &ArmMount, base_pose: &Pose) -> ArmFrameObstacles {
        ArmFrameObstacles {
            footprints: self
                .obstacles
                .iter()
                .map(|o| {
                    let verts = o
                        .vertices_mm
                        .iter()
                        .map(|v| FramedPoint::new(o.frame, v.x, v.y).to_arm_frame(mount, base_pose))
                        .collect();
                    (verts, o.height_mm)
                })
                .collect(),
        }
    }
}

impl ObstacleCheck for ArmFrameObstacles {
    fn is_blocked(&self, elbow: &Point2<f64>, hand: &Point2<f64>, z_mm: f64) -> bool {
        let shoulder = Point2::origin();

        self.footprints
            .iter()
            .filter(|(_, height_mm)| *height_mm >= z_mm)
            .any(|(poly, _)| {
                is_in_poly(elbow, poly)
                    || is_in_poly(hand, poly)
                    || is_crossing_poly(elbow, hand, poly).is_some()
                    || is_crossing_poly(&shoulder, elbow, poly).is_some()
            })
    }
}

impl ObstacleCheck for NoObstacles {
    fn is_blocked(&self, _elbow: &Point2<f64>, _hand: &Point2<f64>, _z_mm: f64) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector2;
    use std::f64::consts::PI;

    fn unit_box(x: f64, y: f64, half: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x - half, y - half),
            Point2::new(x + half, y - half),
            Point2::new(x + half, y + half),
            Point2::new(x - half, y + half),
        ]
    }

    #[test]
    fn test_degenerate_rejected() {
        let mut set = ObstacleSet::default();
        assert_eq!(
            set.create(Frame::Arm, vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)], 10.0),
            Err(ObstacleError::Degenerate(2))
        );
        assert_eq!(set.create(Frame::Arm, vec![], 10.0), Err(ObstacleError::Degenerate(0)));
        assert!(set.is_empty());

        assert_eq!(
            set.create(Frame::Arm, unit_box(0.0, 0.0, f64::INFINITY), 10.0),
            Err(ObstacleError::NonFinite)
        );
        assert!(set.is_empty());
    }

    #[test]
    fn test_create_appends() {
        let mut set = ObstacleSet::default();
        let a = set.create(Frame::Arm, unit_box(0.0, 0.0, 1.0), 10.0).unwrap();
        let b = set.create(Frame::Robot, unit_box(5.0, 5.0, 1.0), 20.0).unwrap();
        assert_eq!(a, ObstacleId(0));
        assert_eq!(b, ObstacleId(1));
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(b).unwrap().height_mm, 20.0);
        assert!(set.get(ObstacleId(2)).is_none());
    }

    #[test]
    fn test_is_blocked() {
        let mut set = ObstacleSet::default();
        set.create(Frame::Arm, unit_box(100.0, 50.0, 10.0), 100.0).unwrap();
        let check = set.in_arm_frame(&ArmMount::default(), &Pose::default());

        let elbow = Point2::new(100.0, 0.0);

        // Hand inside
        assert!(check.is_blocked(&elbow, &Point2::new(100.0, 50.0), 0.0));
        // Forearm passes through
        assert!(check.is_blocked(&elbow, &Point2::new(100.0, 100.0), 0.0));
        // Height exactly at the top still blocks
        assert!(check.is_blocked(&elbow, &Point2::new(100.0, 100.0), 100.0));
        // Above the obstacle
        assert!(!check.is_blocked(&elbow, &Point2::new(100.0, 100.0), 100.1));
        // Clear
        assert!(!check.is_blocked(&elbow, &Point2::new(150.0, 0.0), 0.0));
        // Upper link passes through
        assert!(check.is_blocked(&Point2::new(200.0, 100.0), &Point2::new(250.0, 100.0), 0.0));
    }

    #[test]
    fn test_robot_frame_obstacle_is_converted() {
        let mut set = ObstacleSet::default();
        set.create(Frame::Robot, unit_box(0.0, 200.0, 10.0), 100.0).unwrap();

        // Arm mounted at (0, 100) looking along +y of the robot: the obstacle
        // is 100 mm straight ahead of the shoulder.
        let mount = ArmMount {
            offset_mm: Vector2::new(0.0, 100.0),
            rotation_rad: PI / 2.0,
        };
        let check = set.in_arm_frame(&mount, &Pose::default());

        assert!(check.is_blocked(&Point2::new(50.0, 0.0), &Point2::new(100.0, 0.0), 0.0));
        assert!(!check.is_blocked(&Point2::new(0.0, 50.0), &Point2::new(0.0, 100.0), 0.0));
    }

    #[test]
    fn test_table_frame_obstacle_follows_pose() {
        let mut set = ObstacleSet::default();
        set.create(Frame::Table, unit_box(1100.0, 1000.0, 10.0), 100.0).unwrap();

        let elbow = Point2::new(50.0, 0.0);
        let hand = Point2::new(100.0, 0.0);

        let here = set.in_arm_frame(&ArmMount::default(), &Pose::new(1000.0, 1000.0, 0.0));
        assert!(here.is_blocked(&elbow, &hand, 0.0));

        let turned = set.in_arm_frame(&ArmMount::default(), &Pose::new(1000.0, 1000.0, PI));
        assert!(!turned.is_blocked(&elbow, &hand, 0.0));
    }
}
