//! Main arm executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Telecommand processing and handling
//!         - Arm control processing, for each arm:
//!             - Trajectory playback and inverse kinematics
//!             - Axis controller servicing
//!
//! # Modules
//!
//! All modules (e.g. `arm_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use arm_lib::{
    data_store::{DataStore, SafeModeCause},
    loc::PoseHandle,
    params::ArmExecParams,
    sim::SimArm,
    tc::Tc,
};

mod tc_processor;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    raise_error,
    script_interpreter::{Pending, ScriptInterpreter},
    session::Session,
    time::MonotonicClock,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of consecutive cycle overruns after which the control loop is considered lost.
const MAX_CONSEC_CYCLE_OVERRUNS: u64 = 500;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("arm_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Arm Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: ArmExecParams =
        util::params::load("arm_exec.toml").wrap_err("Could not load the exec params")?;

    if !exec_params.cycle_period_s.is_finite() || exec_params.cycle_period_s <= 0.0 {
        return Err(eyre!(
            "The cycle period must be strictly positive, found {} s",
            exec_params.cycle_period_s
        ));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE TC SOURCE ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    if args.len() != 2 {
        return Err(eyre!(
            "Expected the path to a TC script as the only argument, found {} arguments",
            args.len() - 1
        ));
    }

    info!("Loading script from \"{}\"", &args[1]);

    let mut script: ScriptInterpreter<Tc> =
        ScriptInterpreter::new(&args[1]).wrap_err("Failed to load script")?;

    info!(
        "Loaded script lasts {:.02} s and contains {} TCs\n",
        script.get_duration(),
        script.get_num_cmds()
    );

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::new(
        PoseHandle::new(exec_params.initial_pose),
        Arc::new(MonotonicClock::new()),
    );

    // ---- INITIALISE MODULES ----

    ds.left_arm
        .init(exec_params.left_arm_params.clone(), &session)
        .wrap_err("Failed to initialise the left ArmCtrl")?;
    info!("Left ArmCtrl init complete");

    ds.right_arm
        .init(exec_params.right_arm_params.clone(), &session)
        .wrap_err("Failed to initialise the right ArmCtrl")?;
    info!("Right ArmCtrl init complete");

    // Keep the simulated plants alive for the whole run
    let _sim_arms = match exec_params.sim_counts_per_pwm {
        Some(gain) => {
            info!("Connecting arms to simulated axes");
            Some((
                SimArm::connect(&mut ds.left_arm, gain),
                SimArm::connect(&mut ds.right_arm, gain),
            ))
        }
        None => None,
    };

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let mut end_of_script = false;

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(exec_params.cycle_frequency_hz());

        // ---- TELECOMMAND PROCESSING ----

        if !end_of_script {
            match script.get_pending(ds.elapsed_s) {
                Pending::None => (),
                Pending::Some(tc_vec) => {
                    for tc in tc_vec.iter() {
                        tc_processor::exec(&mut ds, tc);
                    }
                }
                Pending::EndOfScript => {
                    info!("End of TC script reached, waiting for the arms to finish");
                    end_of_script = true;
                }
            }
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        match ds.left_arm.proc(&ds.left_arm_input) {
            Ok((o, r)) => {
                ds.left_arm_output = o;
                ds.left_arm_status_rpt = r;
            }
            // Errors just mean the command was rejected, the arm carries on with what it was
            // doing
            Err(e) => {
                warn!("Error during left ArmCtrl processing: {}", e);
                ds.left_arm_output = ds.left_arm.axis_dems();
                ds.left_arm_status_rpt = ds.left_arm.status_report();
            }
        }

        match ds.right_arm.proc(&ds.right_arm_input) {
            Ok((o, r)) => {
                ds.right_arm_output = o;
                ds.right_arm_status_rpt = r;
            }
            Err(e) => {
                warn!("Error during right ArmCtrl processing: {}", e);
                ds.right_arm_output = ds.right_arm.axis_dems();
                ds.right_arm_status_rpt = ds.right_arm.status_report();
            }
        }

        // Axis controllers run straight after the player, on the same cycle
        ds.left_arm.manage();
        ds.right_arm.manage();

        // ---- TELEMETRY ----

        if ds.is_1_hz_cycle {
            debug!("Left arm: {:?}", ds.left_arm_status_rpt);
            debug!("Right arm: {:?}", ds.right_arm_status_rpt);
        }

        if end_of_script && ds.arms_finished() {
            info!("All trajectories finished, stopping");
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                ds.num_consec_cycle_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                ds.num_consec_cycle_overruns += 1;

                if ds.num_consec_cycle_overruns > MAX_CONSEC_CYCLE_OVERRUNS {
                    ds.make_safe(SafeModeCause::EndOfExecution);
                    raise_error!(
                        "More than {} consecutive cycle overruns!",
                        MAX_CONSEC_CYCLE_OVERRUNS
                    );
                }
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    ds.make_safe(SafeModeCause::EndOfExecution);
    ds.left_arm.manage();
    ds.right_arm.manage();

    info!("End of execution");

    session.exit();

    Ok(())
}
