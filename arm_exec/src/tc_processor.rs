//! # Telecommand processor module
//!
//! The telecommand processor handles various TCs coming from any source.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};

// Internal
use arm_lib::{
    data_store::{DataStore, SafeModeCause},
    loc::PoseSource,
    tc::Tc,
};

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Mutates the datastore to send commands to different modules. While in safe mode only the
/// safe mode TCs are accepted.
pub(crate) fn exec(ds: &mut DataStore, tc: &Tc) {
    // Handle different Tcs
    match tc {
        Tc::MakeSafe => {
            debug!("Recieved MakeSafe command");
            ds.make_safe(SafeModeCause::MakeSafeTc);
        }
        Tc::MakeUnsafe => {
            debug!("Recieved MakeUnsafe command");
            ds.make_unsafe(SafeModeCause::MakeSafeTc).ok();
        }
        Tc::Arm { side, .. } if ds.safe => {
            warn!("In safe mode, ignoring command for the {} arm", side)
        }
        Tc::Arm { side, cmd } => {
            debug!("Recieved command for the {} arm", side);
            ds.arm_input_mut(*side).cmd = Some(cmd.clone());
        }
        Tc::SetPose(pose) => {
            ds.pose.set(*pose);
            debug!(
                "Base pose set to ({:.1}, {:.1}) mm, {:.3} rad",
                ds.pose.get_x(),
                ds.pose.get_y(),
                ds.pose.get_heading()
            );
        }
    }
}
