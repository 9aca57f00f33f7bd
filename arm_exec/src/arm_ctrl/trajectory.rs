//! Arm trajectories
//!
//! A trajectory is an ordered list of timestamped keyframes. Each keyframe
//! carries its own frame tag, so a single trajectory may mix arm, robot and
//! table coordinates: every keyframe is converted to the arm frame on its own
//! before any blending happens.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use super::{
    frames::{ArmMount, Frame, FramedPoint},
    ArmCtrlError,
};
use crate::loc::Pose;
use util::{maths::lin_map, time::seconds_to_micros};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single waypoint of a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Horizontal position of the hand.
    ///
    /// Units: millimeters
    pub position_mm: FramedPoint,

    /// Height of the hand.
    ///
    /// Units: millimeters
    pub z_mm: f64,

    /// When the hand shall be at this position.
    ///
    /// Units: microseconds, on the arm's clock
    pub date_us: i64,
}

/// An immutable, validated sequence of keyframes.
///
/// The keyframe dates are strictly increasing. An empty trajectory is the
/// idle state of an arm.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    keyframes: Vec<Keyframe>,
}

/// A cloneable handle through which new trajectories are published to an arm.
///
/// The arm's control tick takes a shared reference to the current trajectory
/// at the start of each cycle, so a publication from another thread takes
/// effect at the next tick and is never seen half-written.
#[derive(Debug, Clone, Default)]
pub struct MovementHandle {
    current: Arc<Mutex<Arc<Trajectory>>>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Keyframe {
    pub fn new(frame: Frame, x_mm: f64, y_mm: f64, z_mm: f64, date_us: i64) -> Self {
        Self {
            position_mm: FramedPoint::new(frame, x_mm, y_mm),
            z_mm,
            date_us,
        }
    }

    /// This keyframe's position in the arm frame, with z.
    pub fn to_arm_frame(&self, mount: &ArmMount, base_pose: &Pose) -> Point3<f64> {
        let xy = self.position_mm.to_arm_frame(mount, base_pose);
        Point3::new(xy.x, xy.y, self.z_mm)
    }
}

impl Trajectory {
    /// Build a trajectory, validating the keyframes.
    ///
    /// Keyframes are never sorted: they must already be in strictly
    /// increasing date order.
    pub fn new(keyframes: Vec<Keyframe>) -> Result<Self, ArmCtrlError> {
        for (i, k) in keyframes.iter().enumerate() {
            if !k.position_mm.is_finite() || !k.z_mm.is_finite() {
                return Err(ArmCtrlError::NonFiniteKeyframe(i));
            }
        }

        if let Some(i) = keyframes
            .windows(2)
            .position(|w| w[1].date_us <= w[0].date_us)
        {
            return Err(ArmCtrlError::UnorderedKeyframes(i + 1));
        }

        Ok(Self { keyframes })
    }

    /// The idle trajectory.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Date of the last keyframe, `None` if empty.
    pub fn end_date_us(&self) -> Option<i64> {
        self.keyframes.last().map(|k| k.date_us)
    }

    /// True once `now_us` has passed the last keyframe. An empty trajectory
    /// is always finished.
    pub fn is_finished(&self, now_us: i64) -> bool {
        match self.end_date_us() {
            Some(end) => now_us > end,
            None => true,
        }
    }

    /// Position of the hand in the arm frame at `date_us`.
    ///
    /// Before the first keyframe the first position is held, after the last
    /// the last. In between the two bracketing keyframes are each converted
    /// to the arm frame and then blended linearly. Returns `None` for an empty
    /// trajectory.
    pub fn sample(&self, date_us: i64, mount: &ArmMount, base_pose: &Pose) -> Option<Point3<f64>> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;

        if date_us <= first.date_us {
            return Some(first.to_arm_frame(mount, base_pose));
        }
        if date_us >= last.date_us {
            return Some(last.to_arm_frame(mount, base_pose));
        }

        // Index of the first keyframe strictly after `date_us`, at least 1
        // given the checks above
        let i = self.keyframes.partition_point(|k| k.date_us <= date_us);
        let (prev, next) = (&self.keyframes[i - 1], &self.keyframes[i]);

        let prev_pos = prev.to_arm_frame(mount, base_pose);
        let next_pos = next.to_arm_frame(mount, base_pose);

        let span = (prev.date_us as f64, next.date_us as f64);
        let t = date_us as f64;

        Some(Point3::new(
            lin_map(span, (prev_pos.x, next_pos.x), t),
            lin_map(span, (prev_pos.y, next_pos.y), t),
            lin_map(span, (prev_pos.z, next_pos.z), t),
        ))
    }
}

impl MovementHandle {
    /// Replace the current trajectory with `trajectory`.
    pub fn publish(&self, trajectory: Trajectory) {
        let new = Arc::new(trajectory);

        let old = match self.current.lock() {
            Ok(mut cur) => std::mem::replace(&mut *cur, new),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), new),
        };

        info!(
            "Trajectory replaced ({} keyframes released)",
            old.len()
        );
    }

    /// Validate `keyframes` and publish them as the new trajectory.
    ///
    /// On error the current trajectory is left untouched.
    pub fn execute_movement(&self, keyframes: Vec<Keyframe>) -> Result<(), ArmCtrlError> {
        let traj = Trajectory::new(keyframes)?;
        self.publish(traj);
        Ok(())
    }

    /// Replace the current trajectory with the empty one, idling the arm.
    pub fn shutdown(&self) {
        if !self.snapshot().is_empty() {
            self.publish(Trajectory::empty());
        }
    }

    /// Get the current trajectory.
    pub fn snapshot(&self) -> Arc<Trajectory> {
        match self.current.lock() {
            Ok(cur) => cur.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// INTERPOLATORS
// ---------------------------------------------------------------------------

/// A straight line from `start_mm` to `end_mm` (x, y, z), both in `frame`,
/// beginning at `start_date_us` and lasting `duration_s`.
pub fn linear_motion(
    start_mm: Point3<f64>,
    end_mm: Point3<f64>,
    frame: Frame,
    start_date_us: i64,
    duration_s: f64,
) -> Result<Trajectory, ArmCtrlError> {
    let end_date_us = seconds_to_micros(duration_s)
        .filter(|d| *d > 0)
        .and_then(|d| start_date_us.checked_add(d))
        .ok_or(ArmCtrlError::InvalidDuration(duration_s))?;

    Trajectory::new(vec![
        Keyframe::new(frame, start_mm.x, start_mm.y, start_mm.z, start_date_us),
        Keyframe::new(frame, end_mm.x, end_mm.y, end_mm.z, end_date_us),
    ])
}

/// Hold a single position from `start_date_us` for `duration_s`.
pub fn goto(
    target_mm: Point3<f64>,
    frame: Frame,
    start_date_us: i64,
    duration_s: f64,
) -> Result<Trajectory, ArmCtrlError> {
    linear_motion(target_mm, target_mm, frame, start_date_us, duration_s)
}
