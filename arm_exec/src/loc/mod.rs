//! # Localisation module
//!
//! This module provides the arms with the pose of the mobile base on the
//! table. The estimator itself runs elsewhere (odometry, possibly in another
//! thread); the arms only ever take a snapshot of its latest output.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose (position and heading in the table frame) of the robot
/// base.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position of the base in the table frame.
    ///
    /// Units: millimeters
    pub position_mm: Vector2<f64>,

    /// Heading of the base, the angle of the robot's +x axis from the table's
    /// +x axis.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A shared, thread-safe handle onto the latest base pose.
///
/// Clones refer to the same pose. Writers (the estimator) publish a whole
/// `Pose` at once, so readers never see a torn position/heading pair.
#[derive(Debug, Clone, Default)]
pub struct PoseHandle {
    pose: Arc<RwLock<Pose>>,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A read-only source of the base pose.
pub trait PoseSource: Send + Sync {
    /// Take a snapshot of the current pose.
    fn get_pose(&self) -> Pose;

    fn get_x(&self) -> f64 {
        self.get_pose().position_mm.x
    }

    fn get_y(&self) -> f64 {
        self.get_pose().position_mm.y
    }

    fn get_heading(&self) -> f64 {
        self.get_pose().heading_rad
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_mm: f64, y_mm: f64, heading_rad: f64) -> Self {
        Self {
            position_mm: Vector2::new(x_mm, y_mm),
            heading_rad,
        }
    }
}

impl PoseHandle {
    pub fn new(pose: Pose) -> Self {
        Self {
            pose: Arc::new(RwLock::new(pose)),
        }
    }

    /// Publish a new pose.
    pub fn set(&self, pose: Pose) {
        // A poisoned lock still holds a complete pose, the writer can't have
        // left it half written.
        match self.pose.write() {
            Ok(mut p) => *p = pose,
            Err(poisoned) => *poisoned.into_inner() = pose,
        }
    }
}

impl PoseSource for PoseHandle {
    fn get_pose(&self) -> Pose {
        match self.pose.read() {
            Ok(p) => *p,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
