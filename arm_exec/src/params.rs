//! # Arm Executable Parameters
//!
//! This module provide parameters for the arm executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::loc::Pose;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmExecParams {
    /// Target period of one control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Parameter file for the left arm, relative to the params directory
    pub left_arm_params: String,

    /// Parameter file for the right arm, relative to the params directory
    pub right_arm_params: String,

    /// Pose of the base at startup, until something else sets it
    #[serde(default)]
    pub initial_pose: Pose,

    /// If set, each axis is connected to a simulated motor moving this many encoder counts per
    /// unit of PWM per cycle. Leave unset when running on hardware.
    #[serde(default)]
    pub sim_counts_per_pwm: Option<f64>,
}

impl ArmExecParams {
    /// Number of cycles per second.
    pub fn cycle_frequency_hz(&self) -> f64 {
        1.0 / self.cycle_period_s
    }
}
