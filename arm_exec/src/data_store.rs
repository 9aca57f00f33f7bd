//! # Data Store

use log::{info, warn};
use std::sync::Arc;

use crate::{
    arm_ctrl::{self, ArmCtrl},
    loc::PoseHandle,
    tc::ArmSide,
};
use util::{module::State, time::Clock};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the arms have been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum SafeModeCause {
    MakeSafeTc,
    EndOfExecution,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u128,

    /// True if this cycle falls on a 1Hz boundary
    pub is_1_hz_cycle: bool,

    /// Session elapsed time
    pub elapsed_s: f64,

    // Safe mode variables
    /// Determines if the arms are in safe mode.
    pub safe: bool,

    /// Gives the reason for the arms being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // Localisation
    /// Base pose, shared with both arms.
    pub pose: PoseHandle,

    // Arms
    pub left_arm: ArmCtrl,
    pub left_arm_input: arm_ctrl::InputData,
    pub left_arm_output: arm_ctrl::AxisDems,
    pub left_arm_status_rpt: arm_ctrl::StatusReport,

    pub right_arm: ArmCtrl,
    pub right_arm_input: arm_ctrl::InputData,
    pub right_arm_output: arm_ctrl::AxisDems,
    pub right_arm_status_rpt: arm_ctrl::StatusReport,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Create a new store, with both arms reading `pose` and timed by `clock`.
    pub fn new(pose: PoseHandle, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let pose_source = Arc::new(pose.clone());

        Self {
            num_cycles: 0,
            is_1_hz_cycle: false,
            elapsed_s: 0.0,
            safe: false,
            safe_cause: None,
            left_arm: ArmCtrl::new(pose_source.clone(), clock.clone()),
            left_arm_input: arm_ctrl::InputData::default(),
            left_arm_output: arm_ctrl::AxisDems::default(),
            left_arm_status_rpt: arm_ctrl::StatusReport::default(),
            right_arm: ArmCtrl::new(pose_source, clock),
            right_arm_input: arm_ctrl::InputData::default(),
            right_arm_output: arm_ctrl::AxisDems::default(),
            right_arm_status_rpt: arm_ctrl::StatusReport::default(),
            pose,
            num_consec_cycle_overruns: 0,
        }
    }

    /// Puts the arms into safe mode with the given cause.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);

            self.left_arm.make_safe();
            self.right_arm.make_safe();
        }
    }

    /// Attempts to disable the safe mode by clearing the given cause.
    ///
    /// Returns `Ok(())` if this cause was cleared and safe mode was disabled, or `Err(())`
    /// otherwise. To remove safe mode the provided cause must match the initial reason for safe
    /// mode being enabled.
    ///
    /// If safe mode was not enabled `Ok(())` is returned
    pub fn make_unsafe(&mut self, cause: SafeModeCause) -> Result<(), ()> {
        if !self.safe {
            return Ok(());
        }

        match self.safe_cause {
            Some(root_cause) if root_cause != cause => Err(()),
            _ => {
                self.safe = false;
                self.safe_cause = None;
                info!("Make unsafe requested, root cause match, safe mode disabled");
                Ok(())
            }
        }
    }

    /// The arm on the given side.
    pub fn arm_mut(&mut self, side: ArmSide) -> &mut ArmCtrl {
        match side {
            ArmSide::Left => &mut self.left_arm,
            ArmSide::Right => &mut self.right_arm,
        }
    }

    /// The input of the arm on the given side, for this cycle.
    pub fn arm_input_mut(&mut self, side: ArmSide) -> &mut arm_ctrl::InputData {
        match side {
            ArmSide::Left => &mut self.left_arm_input,
            ArmSide::Right => &mut self.right_arm_input,
        }
    }

    /// True once both arms have played their trajectories to the end.
    pub fn arms_finished(&self) -> bool {
        self.left_arm.trajectory_finished() && self.right_arm.trajectory_finished()
    }

    /// Perform actions required at the start of a cycle.
    ///
    /// Clears those items that need clearing at the start of a cycle, and sets the 1Hz cycle flag.
    pub fn cycle_start(&mut self, cycle_frequency_hz: f64) {
        let cycles_per_s = (cycle_frequency_hz.round() as u128).max(1);
        self.is_1_hz_cycle = self.num_cycles % cycles_per_s == 0;

        self.left_arm_input = arm_ctrl::InputData::default();
        self.left_arm_output = arm_ctrl::AxisDems::default();
        self.left_arm_status_rpt = arm_ctrl::StatusReport::default();

        self.right_arm_input = arm_ctrl::InputData::default();
        self.right_arm_output = arm_ctrl::AxisDems::default();
        self.right_arm_status_rpt = arm_ctrl::StatusReport::default();

        self.elapsed_s = util::session::get_elapsed_seconds();
    }
}
