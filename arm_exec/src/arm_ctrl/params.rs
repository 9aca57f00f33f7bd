//! Parameters structure for ArmCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{
    axis::PidGains,
    frames::ArmMount,
    kinematics::{LinkLengths, ShoulderMode},
    obstacle::{Obstacle, MIN_OBSTACLE_VERTICES},
    ArmCtrlError,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Arm control.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// Lengths of the upper link and the forearm.
    pub link_lengths: LinkLengths,

    /// Position and orientation of the arm on the base.
    pub mount: ArmMount,

    // ---- ACTUATORS ----
    /// Units: encoder counts/millimeter
    pub z_counts_per_mm: f64,

    /// Units: encoder counts/radian
    pub shoulder_counts_per_rad: f64,

    /// Units: encoder counts/radian
    pub elbow_counts_per_rad: f64,

    pub z_gains: PidGains,
    pub shoulder_gains: PidGains,
    pub elbow_gains: PidGains,

    // ---- BEHAVIOUR ----
    /// Elbow preference when two collision-free solutions exist, in the robot
    /// frame.
    #[serde(default)]
    pub shoulder_mode: ShoulderMode,

    /// Obstacles known when the arm starts.
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Check the parameters are physically meaningful.
    pub fn validate(&self) -> Result<(), ArmCtrlError> {
        if !self.link_lengths.is_valid() {
            return Err(ArmCtrlError::InvalidParams(format!(
                "link lengths must be positive, got {:?}",
                self.link_lengths
            )));
        }

        let scales = [
            ("z_counts_per_mm", self.z_counts_per_mm),
            ("shoulder_counts_per_rad", self.shoulder_counts_per_rad),
            ("elbow_counts_per_rad", self.elbow_counts_per_rad),
        ];
        for (name, value) in scales.iter() {
            if !value.is_finite() || *value == 0.0 {
                return Err(ArmCtrlError::InvalidParams(format!(
                    "{} must be finite and non-zero, got {}",
                    name, value
                )));
            }
        }

        if !self.mount.rotation_rad.is_finite()
            || !self.mount.offset_mm.iter().all(|v| v.is_finite())
        {
            return Err(ArmCtrlError::InvalidParams(
                "arm mount must be finite".into(),
            ));
        }

        if let Some(i) = self
            .obstacles
            .iter()
            .position(|o| o.vertices_mm.len() < MIN_OBSTACLE_VERTICES)
        {
            return Err(ArmCtrlError::InvalidParams(format!(
                "obstacle {} has less than {} vertices",
                i, MIN_OBSTACLE_VERTICES
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::frames::Frame;

    const LEFT_ARM: &str = r#"
        z_counts_per_mm = 2620.0
        shoulder_counts_per_rad = 77785.0
        elbow_counts_per_rad = 56571.0
        shoulder_mode = "Back"

        [link_lengths]
        upper_mm = 135.0
        fore_mm = 136.0

        [mount]
        offset_mm = [0.0, 79.0]
        rotation_rad = 1.5707963267948966

        [z_gains]
        k_p = -1000.0
        k_i = -40.0
        k_d = -100.0
        out_shift = 12

        [shoulder_gains]
        k_p = 100.0
        k_i = 2.0
        k_d = 80.0
        out_shift = 6

        [elbow_gains]
        k_p = 100.0
        k_i = 2.0
        k_d = 80.0
        out_shift = 6

        [[obstacles]]
        frame = "robot"
        vertices_mm = [[-100.0, -100.0], [100.0, -100.0], [100.0, 100.0], [-100.0, 100.0]]
        height_mm = 350.0
    "#;

    #[test]
    fn test_load_params() {
        let p: Params = util::params::from_str(LEFT_ARM).unwrap();
        assert_eq!(p.link_lengths, LinkLengths::new(135.0, 136.0));
        assert_eq!(p.mount.offset_mm.y, 79.0);
        assert_eq!(p.shoulder_mode, ShoulderMode::Back);
        assert_eq!(p.z_gains.out_shift, 12);
        assert_eq!(p.obstacles.len(), 1);
        assert_eq!(p.obstacles[0].frame, Frame::Robot);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut p: Params = util::params::from_str(LEFT_ARM).unwrap();
        p.link_lengths.fore_mm = 0.0;
        assert!(matches!(p.validate(), Err(ArmCtrlError::InvalidParams(_))));

        let mut p: Params = util::params::from_str(LEFT_ARM).unwrap();
        p.elbow_counts_per_rad = 0.0;
        assert!(matches!(p.validate(), Err(ArmCtrlError::InvalidParams(_))));

        let mut p: Params = util::params::from_str(LEFT_ARM).unwrap();
        p.obstacles[0].vertices_mm.truncate(2);
        assert!(matches!(p.validate(), Err(ArmCtrlError::InvalidParams(_))));
    }
}
