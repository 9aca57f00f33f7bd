//! Implementations for the ArmCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use nalgebra::{Point2, Point3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Internal
use super::{
    axis::{ArmAxes, AxisIo},
    frames::{self, Frame},
    kinematics::{self, mode_for_orientation, IkError, ShoulderMode},
    obstacle::{ObstacleError, ObstacleId, ObstacleSet},
    trajectory::{self, Keyframe, MovementHandle, Trajectory},
    ArmCmd, ArmCtrlError, Params,
};
use crate::loc::PoseSource;
use util::{module::State, params, session::Session, time::Clock};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Arm control module state
pub struct ArmCtrl {
    pub(crate) params: Params,

    pub(crate) report: StatusReport,

    /// Set once valid parameters have been loaded.
    initialised: bool,

    movement: MovementHandle,

    obstacles: ObstacleSet,

    shoulder_mode: ShoulderMode,

    axes: ArmAxes,

    pose: Arc<dyn PoseSource>,

    clock: Arc<dyn Clock + Send + Sync>,

    /// Time of the previous tick, used for lag compensation.
    ///
    /// Units: microseconds
    last_tick_us: i64,

    /// True if the last tick failed to solve, so failures are only reported
    /// when they start.
    solve_failing: bool,
}

/// Input data to Arm Control.
#[derive(Default)]
pub struct InputData {
    /// The command to be executed, or `None` if there is no new command on
    /// this cycle.
    pub cmd: Option<ArmCmd>,
}

/// Demands sent to the axes on one cycle.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug, PartialEq)]
pub struct AxisDems {
    pub enabled: bool,

    /// Units: encoder counts
    pub z_counts: f64,

    /// Units: encoder counts
    pub shoulder_counts: f64,

    /// Units: encoder counts
    pub elbow_counts: f64,
}

/// Status report for ArmCtrl processing.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug)]
pub struct StatusReport {
    /// True if the axes are powered this cycle.
    pub enabled: bool,

    /// Number of geometric elbow positions found for this cycle's target.
    pub num_elbow_solutions: usize,

    /// Why the target could not be solved, if it couldn't.
    pub solve_failure: Option<IkError>,

    /// Hand target in the arm frame.
    ///
    /// Units: millimeters
    pub target_mm: Option<Point3<f64>>,

    /// Units: radians
    pub shoulder_angle_rad: f64,

    /// Units: radians
    pub elbow_angle_rad: f64,

    pub traj_finished: bool,

    /// True if the command received this cycle was rejected.
    pub cmd_rejected: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for ArmCtrl {
    type InitData = String;
    type InitError = ArmCtrlError;

    type InputData = InputData;
    type OutputData = AxisDems;
    type StatusReport = StatusReport;
    type ProcError = ArmCtrlError;

    /// Initialise the ArmCtrl module.
    ///
    /// Expected init data is the path to the parameter file
    fn init(
        &mut self,
        init_data: Self::InitData,
        _session: &Session,
    ) -> Result<(), Self::InitError> {
        let params: Params = params::load(&init_data)?;

        self.init_with_params(params)
    }

    /// Perform cyclic processing of Arm Control.
    ///
    /// Any new command is executed before the trajectory is played, so a new
    /// movement takes effect on the cycle it is received. A rejected command
    /// leaves the arm playing its previous trajectory and is reported as an
    /// error once the cycle has been processed. The cycle's demands and status
    /// report, with `cmd_rejected` set, are then available from
    /// `axis_dems()` and `status_report()`.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        // Clear the status report
        self.report = StatusReport::default();

        let cmd_result = match &input_data.cmd {
            Some(cmd) => {
                debug!("New ArmCtrl ArmCmd::{:?}", cmd);
                self.exec_cmd(cmd)
            }
            None => Ok(()),
        };
        self.report.cmd_rejected = cmd_result.is_err();

        let output = self.tick();

        cmd_result.map(|_| (output, self.report))
    }

    /// Shut the arm down and power off its axes.
    fn make_safe(&mut self) {
        self.shutdown();
        self.axes.disable_all();
    }

    /// Service the axis controllers.
    fn manage(&mut self) {
        self.manage_axes();
    }
}

impl ArmCtrl {
    /// Create a new, uninitialised arm.
    ///
    /// The arm is idle with its axes disabled until initialised and given a
    /// trajectory.
    pub fn new(pose: Arc<dyn PoseSource>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let last_tick_us = clock.now_us();

        Self {
            params: Params::default(),
            report: StatusReport::default(),
            initialised: false,
            movement: MovementHandle::default(),
            obstacles: ObstacleSet::default(),
            shoulder_mode: ShoulderMode::default(),
            axes: ArmAxes::pid(Default::default(), Default::default(), Default::default()),
            pose,
            clock,
            last_tick_us,
            solve_failing: false,
        }
    }

    /// Initialise from already loaded parameters.
    ///
    /// The axis controllers are rebuilt with the new gains, so any IO
    /// connection must be made after this.
    pub fn init_with_params(&mut self, params: Params) -> Result<(), ArmCtrlError> {
        params.validate()?;

        self.axes = ArmAxes::pid(params.z_gains, params.shoulder_gains, params.elbow_gains);
        self.shoulder_mode = params.shoulder_mode;

        self.obstacles = ObstacleSet::default();
        for o in params.obstacles.iter() {
            self.obstacles
                .create(o.frame, o.vertices_mm.clone(), o.height_mm)?;
        }

        info!(
            "ArmCtrl initialised: links {} mm / {} mm, mount ({}, {}) mm at {} rad, {} obstacles",
            params.link_lengths.upper_mm,
            params.link_lengths.fore_mm,
            params.mount.offset_mm.x,
            params.mount.offset_mm.y,
            params.mount.rotation_rad,
            self.obstacles.len()
        );

        self.params = params;
        self.last_tick_us = self.clock.now_us();
        self.initialised = true;

        Ok(())
    }

    /// Connect the three axis controllers to their motors and encoders.
    pub fn connect_io(&mut self, z: AxisIo, shoulder: AxisIo, elbow: AxisIo) {
        self.axes.z.connect_io(z);
        self.axes.shoulder.connect_io(shoulder);
        self.axes.elbow.connect_io(elbow);
    }

    /// Replace the current trajectory with a new one.
    ///
    /// Keyframe dates are absolute, on this arm's clock. If the keyframes are
    /// rejected the current trajectory is kept.
    pub fn execute_movement(&self, keyframes: Vec<Keyframe>) -> Result<(), ArmCtrlError> {
        self.movement.execute_movement(keyframes).map_err(|e| {
            warn!("Movement rejected: {}", e);
            e
        })
    }

    /// A handle through which trajectories can be published to this arm from
    /// another thread.
    pub fn movement_handle(&self) -> MovementHandle {
        self.movement.clone()
    }

    /// True once the clock has passed the date of the last keyframe, or if
    /// there is no trajectory.
    ///
    /// A finished trajectory keeps holding its last position until shut down
    /// or replaced.
    pub fn trajectory_finished(&self) -> bool {
        self.movement.snapshot().is_finished(self.clock.now_us())
    }

    /// Drop the current trajectory, idling the arm from the next tick.
    pub fn shutdown(&self) {
        if !self.movement.snapshot().is_empty() {
            info!("Arm shutdown");
        }
        self.movement.shutdown();
    }

    /// Add an obstacle to those the arm must avoid.
    pub fn create_obstacle(
        &mut self,
        frame: Frame,
        vertices_mm: Vec<Point2<f64>>,
        height_mm: f64,
    ) -> Result<ObstacleId, ObstacleError> {
        self.obstacles.create(frame, vertices_mm, height_mm)
    }

    /// Express a point given in `frame` in this arm's frame, using the current
    /// base pose.
    pub fn change_coordinate_system(&self, x_mm: f64, y_mm: f64, frame: Frame) -> Point2<f64> {
        frames::to_arm_frame(x_mm, y_mm, frame, &self.params.mount, &self.pose.get_pose())
    }

    pub fn set_shoulder_mode(&mut self, mode: ShoulderMode) {
        self.shoulder_mode = mode;
    }

    /// Run one step of each axis controller.
    pub fn manage_axes(&mut self) {
        self.axes.service_all();
    }

    pub fn axes(&self) -> &ArmAxes {
        &self.axes
    }

    pub fn obstacles(&self) -> &ObstacleSet {
        &self.obstacles
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Status report of the last processed cycle.
    pub fn status_report(&self) -> StatusReport {
        self.report
    }

    /// Current axis demands.
    pub fn axis_dems(&self) -> AxisDems {
        AxisDems {
            enabled: self.axes.all_enabled(),
            z_counts: self.axes.z.consign(),
            shoulder_counts: self.axes.shoulder.consign(),
            elbow_counts: self.axes.elbow.consign(),
        }
    }

    /// Execute a command.
    fn exec_cmd(&mut self, cmd: &ArmCmd) -> Result<(), ArmCtrlError> {
        let now_us = self.clock.now_us();

        match cmd {
            ArmCmd::ExecuteMovement { keyframes } => {
                let keyframes = keyframes
                    .iter()
                    .map(|k| k.to_keyframe(now_us))
                    .collect::<Result<Vec<_>, _>>();

                match keyframes {
                    Ok(k) => self.execute_movement(k),
                    Err(e) => {
                        warn!("Movement rejected: {}", e);
                        Err(e)
                    }
                }
            }
            ArmCmd::LinearMotion {
                frame,
                start_mm,
                end_mm,
                duration_s,
            } => self.publish(trajectory::linear_motion(
                *start_mm,
                *end_mm,
                *frame,
                now_us,
                *duration_s,
            )),
            ArmCmd::Goto {
                frame,
                target_mm,
                duration_s,
            } => self.publish(trajectory::goto(*target_mm, *frame, now_us, *duration_s)),
            ArmCmd::Shutdown => {
                self.shutdown();
                Ok(())
            }
            ArmCmd::SetShoulderMode(mode) => {
                self.set_shoulder_mode(*mode);
                Ok(())
            }
            ArmCmd::CreateObstacle {
                frame,
                vertices_mm,
                height_mm,
            } => self
                .create_obstacle(*frame, vertices_mm.clone(), *height_mm)
                .map(|_| ())
                .map_err(ArmCtrlError::from),
        }
    }

    fn publish(&self, traj: Result<Trajectory, ArmCtrlError>) -> Result<(), ArmCtrlError> {
        match traj {
            Ok(t) => {
                self.movement.publish(t);
                Ok(())
            }
            Err(e) => {
                warn!("Movement rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Play the current trajectory for this cycle and update the axis
    /// consigns.
    fn tick(&mut self) -> AxisDems {
        let now_us = self.clock.now_us();

        // Extrapolate by one tick to make up for the control latency
        let compensated_us = 2 * now_us - self.last_tick_us;
        self.last_tick_us = now_us;

        let traj = self.movement.snapshot();
        self.report.traj_finished = traj.is_finished(now_us);

        if traj.is_empty() || !self.initialised {
            self.axes.disable_all();
            return self.dems();
        }

        // Sample the pose once so the target and the obstacles agree
        let pose = self.pose.get_pose();
        let mount = self.params.mount;

        let target = match traj.sample(compensated_us, &mount, &pose) {
            Some(t) => t,
            None => {
                self.axes.disable_all();
                return self.dems();
            }
        };
        self.report.target_mm = Some(target);

        let obstacles = self.obstacles.in_arm_frame(&mount, &pose);
        let mode = mode_for_orientation(self.shoulder_mode, mount.rotation_rad);

        match kinematics::solve(
            &Point2::new(target.x, target.y),
            target.z,
            &self.params.link_lengths,
            mode,
            &obstacles,
        ) {
            Ok(sol) => {
                if self.solve_failing {
                    info!("Arm target reachable again, resuming");
                }
                self.solve_failing = false;

                self.axes.enable_all();
                self.axes.z.set_consign(target.z * self.params.z_counts_per_mm);
                self.axes
                    .shoulder
                    .set_consign(sol.shoulder_angle_rad * self.params.shoulder_counts_per_rad);
                self.axes
                    .elbow
                    .set_consign(sol.elbow_angle_rad * self.params.elbow_counts_per_rad);

                self.report.num_elbow_solutions = sol.num_candidates;
                self.report.shoulder_angle_rad = sol.shoulder_angle_rad;
                self.report.elbow_angle_rad = sol.elbow_angle_rad;
            }
            Err(e) => {
                if !self.solve_failing {
                    warn!("{}, disabling arm axes", e);
                }
                self.solve_failing = true;

                self.axes.disable_all();

                self.report.num_elbow_solutions = match e {
                    IkError::Unreachable(..) => 0,
                    IkError::Blocked(..) => 2,
                };
                self.report.solve_failure = Some(e);
            }
        }

        self.dems()
    }

    fn dems(&mut self) -> AxisDems {
        let dems = self.axis_dems();
        self.report.enabled = dems.enabled;
        dems
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_ctrl::{axis::PidGains, kinematics::LinkLengths, KeyframeCmd};
    use crate::loc::{Pose, PoseHandle};
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector2;
    use util::time::SimClock;

    const COUNTS_PER_MM: f64 = 100.0;
    const COUNTS_PER_RAD: f64 = 10_000.0;

    fn test_params() -> Params {
        Params {
            link_lengths: LinkLengths::new(135.0, 136.0),
            z_counts_per_mm: COUNTS_PER_MM,
            shoulder_counts_per_rad: COUNTS_PER_RAD,
            elbow_counts_per_rad: COUNTS_PER_RAD,
            z_gains: PidGains::default(),
            shoulder_gains: PidGains::default(),
            elbow_gains: PidGains::default(),
            ..Default::default()
        }
    }

    fn new_arm(pose: PoseHandle) -> (ArmCtrl, Arc<SimClock>) {
        let clock = Arc::new(SimClock::starting_at(0));
        let mut arm = ArmCtrl::new(Arc::new(pose), clock.clone());
        arm.init_with_params(test_params()).unwrap();
        (arm, clock)
    }

    fn tick(arm: &mut ArmCtrl) -> (AxisDems, StatusReport) {
        let out = arm.proc(&InputData::default()).unwrap();
        arm.manage();
        out
    }

    /// Hand position in the arm frame from the axis consigns.
    fn hand_from(dems: &AxisDems) -> Point3<f64> {
        let hand = kinematics::forward_kinematics(
            dems.shoulder_counts / COUNTS_PER_RAD,
            dems.elbow_counts / COUNTS_PER_RAD,
            &LinkLengths::new(135.0, 136.0),
        );
        Point3::new(hand.x, hand.y, dems.z_counts / COUNTS_PER_MM)
    }

    fn line() -> Vec<Keyframe> {
        vec![
            Keyframe::new(Frame::Arm, 150.0, 0.0, 0.0, 0),
            Keyframe::new(Frame::Arm, 250.0, 0.0, 100.0, 1_000_000),
        ]
    }

    #[test]
    fn test_idle_disables_axes() {
        let (mut arm, clock) = new_arm(PoseHandle::default());

        for _ in 0..10 {
            clock.advance_us(10_000);
            let (dems, report) = tick(&mut arm);
            assert!(!dems.enabled);
            assert!(!report.enabled);
            assert!(arm.axes().all_disabled());
            assert!(report.traj_finished);
        }

        // An explicit empty trajectory is idle too
        arm.execute_movement(line()).unwrap();
        tick(&mut arm);
        assert!(arm.axes().all_enabled());
        arm.execute_movement(vec![]).unwrap();
        tick(&mut arm);
        assert!(arm.axes().all_disabled());
        assert!(arm.trajectory_finished());
    }

    #[test]
    fn test_uninitialised_arm_stays_idle() {
        let clock = Arc::new(SimClock::starting_at(0));
        let mut arm = ArmCtrl::new(Arc::new(PoseHandle::default()), clock);
        arm.execute_movement(line()).unwrap();
        let (dems, _) = tick(&mut arm);
        assert!(!dems.enabled);
    }

    #[test]
    fn test_lag_compensated_interpolation() {
        let (mut arm, clock) = new_arm(PoseHandle::default());
        arm.execute_movement(line()).unwrap();

        // Last tick at 0, now 250 ms: plays 500 ms
        clock.set_us(250_000);
        let (dems, report) = tick(&mut arm);
        assert!(dems.enabled);
        assert_eq!(report.num_elbow_solutions, 2);
        let hand = hand_from(&dems);
        assert_abs_diff_eq!(hand.x, 200.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hand.y, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hand.z, 50.0, epsilon = 1e-6);

        // Last tick at 250 ms, now 500 ms: plays 750 ms
        clock.set_us(500_000);
        let (dems, _) = tick(&mut arm);
        assert_abs_diff_eq!(hand_from(&dems).x, 225.0, epsilon = 1e-6);
        assert!(!arm.trajectory_finished());

        // Past the end the last keyframe is held, and stays active
        clock.set_us(2_000_000);
        let (dems, report) = tick(&mut arm);
        assert!(dems.enabled);
        assert!(report.traj_finished);
        assert_abs_diff_eq!(hand_from(&dems).x, 250.0, epsilon = 1e-6);
        assert!(arm.trajectory_finished());
    }

    #[test]
    fn test_unreachable_target_disables_axes() {
        let (mut arm, clock) = new_arm(PoseHandle::default());
        arm.execute_movement(vec![Keyframe::new(Frame::Arm, 1000.0, 0.0, 0.0, 0)])
            .unwrap();

        clock.advance_us(10_000);
        let (dems, report) = tick(&mut arm);
        assert!(!dems.enabled);
        assert_eq!(report.solve_failure, Some(IkError::Unreachable(1000.0, 0.0)));
        assert_eq!(report.num_elbow_solutions, 0);

        // The next tick starts from scratch
        arm.execute_movement(line()).unwrap();
        clock.advance_us(10_000);
        let (dems, report) = tick(&mut arm);
        assert!(dems.enabled);
        assert!(report.solve_failure.is_none());
    }

    #[test]
    fn test_blocked_target_disables_axes() {
        let (mut arm, clock) = new_arm(PoseHandle::default());

        // Wall across the whole reach in front of the shoulder
        arm.create_obstacle(
            Frame::Arm,
            vec![
                Point2::new(50.0, -300.0),
                Point2::new(60.0, -300.0),
                Point2::new(60.0, 300.0),
                Point2::new(50.0, 300.0),
            ],
            500.0,
        )
        .unwrap();
        arm.execute_movement(vec![Keyframe::new(Frame::Arm, 200.0, 0.0, 0.0, 0)])
            .unwrap();

        clock.advance_us(10_000);
        let (dems, report) = tick(&mut arm);
        assert!(!dems.enabled);
        assert_eq!(report.solve_failure, Some(IkError::Blocked(200.0, 0.0)));
    }

    #[test]
    fn test_table_frame_follows_pose() {
        let pose = PoseHandle::new(Pose::new(1000.0, 1000.0, 0.0));
        let (mut arm, clock) = new_arm(pose.clone());

        arm.execute_movement(vec![Keyframe::new(Frame::Table, 1200.0, 1000.0, 20.0, 0)])
            .unwrap();

        clock.advance_us(10_000);
        let (dems, _) = tick(&mut arm);
        assert_abs_diff_eq!(hand_from(&dems).x, 200.0, epsilon = 1e-6);

        // Base moves towards the target
        pose.set(Pose::new(1050.0, 1000.0, 0.0));
        clock.advance_us(10_000);
        let (dems, _) = tick(&mut arm);
        let hand = hand_from(&dems);
        assert_abs_diff_eq!(hand.x, 150.0, epsilon = 1e-6);
        assert_abs_diff_eq!(hand.y, 0.0, epsilon = 1e-6);

        let p = arm.change_coordinate_system(1050.0, 1100.0, Frame::Table);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p.y, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_shutdown() {
        let (mut arm, clock) = new_arm(PoseHandle::default());

        // No-op when idle
        arm.shutdown();
        assert!(arm.trajectory_finished());

        arm.execute_movement(line()).unwrap();
        clock.advance_us(10_000);
        tick(&mut arm);
        assert!(arm.axes().all_enabled());

        arm.shutdown();
        clock.advance_us(10_000);
        let (dems, _) = tick(&mut arm);
        assert!(!dems.enabled);

        arm.execute_movement(line()).unwrap();
        arm.make_safe();
        assert!(arm.axes().all_disabled());
        assert!(arm.trajectory_finished());
    }

    #[test]
    fn test_commands() {
        let (mut arm, clock) = new_arm(PoseHandle::default());
        clock.set_us(5_000_000);

        // Relative dates are made absolute on reception
        let cmd = ArmCmd::ExecuteMovement {
            keyframes: vec![
                KeyframeCmd {
                    frame: Frame::Arm,
                    x_mm: 150.0,
                    y_mm: 0.0,
                    z_mm: 0.0,
                    time_s: 0.0,
                },
                KeyframeCmd {
                    frame: Frame::Arm,
                    x_mm: 250.0,
                    y_mm: 0.0,
                    z_mm: 0.0,
                    time_s: 1.0,
                },
            ],
        };
        let (_, report) = arm.proc(&InputData { cmd: Some(cmd) }).unwrap();
        assert!(!report.cmd_rejected);
        assert_eq!(arm.movement_handle().snapshot().end_date_us(), Some(6_000_000));

        // Rejected movements keep the current one and are reported
        let bad = ArmCmd::Goto {
            frame: Frame::Arm,
            target_mm: Point3::new(200.0, 0.0, 0.0),
            duration_s: -1.0,
        };
        clock.advance_us(10_000);
        assert!(matches!(
            arm.proc(&InputData { cmd: Some(bad) }),
            Err(ArmCtrlError::InvalidDuration(_))
        ));
        assert_eq!(arm.movement_handle().snapshot().end_date_us(), Some(6_000_000));

        // The cycle was still played and its report flags the rejection
        let report = arm.status_report();
        assert!(report.cmd_rejected);
        assert!(report.enabled);
        assert!(arm.axis_dems().enabled);

        // Times past the end of the clock are refused too
        let far = ArmCmd::ExecuteMovement {
            keyframes: vec![KeyframeCmd {
                frame: Frame::Arm,
                x_mm: 200.0,
                y_mm: 0.0,
                z_mm: 0.0,
                time_s: 1e300,
            }],
        };
        assert!(matches!(
            arm.proc(&InputData { cmd: Some(far) }),
            Err(ArmCtrlError::KeyframeTimeOutOfRange(_))
        ));
        assert!(arm.status_report().cmd_rejected);
        assert_eq!(arm.movement_handle().snapshot().end_date_us(), Some(6_000_000));

        let long_goto = ArmCmd::Goto {
            frame: Frame::Arm,
            target_mm: Point3::new(200.0, 0.0, 0.0),
            duration_s: 1e300,
        };
        assert!(matches!(
            arm.proc(&InputData {
                cmd: Some(long_goto)
            }),
            Err(ArmCtrlError::InvalidDuration(_))
        ));
        assert_eq!(arm.movement_handle().snapshot().end_date_us(), Some(6_000_000));

        let degenerate = ArmCmd::CreateObstacle {
            frame: Frame::Robot,
            vertices_mm: vec![Point2::new(0.0, 0.0)],
            height_mm: 10.0,
        };
        assert!(matches!(
            arm.proc(&InputData { cmd: Some(degenerate) }),
            Err(ArmCtrlError::Obstacle(ObstacleError::Degenerate(1)))
        ));
        assert!(arm.obstacles().is_empty());

        arm.proc(&InputData {
            cmd: Some(ArmCmd::Shutdown),
        })
        .unwrap();
        assert!(arm.movement_handle().snapshot().is_empty());
    }

    #[test]
    fn test_mirrored_mount_flips_mode() {
        let clock = Arc::new(SimClock::starting_at(0));
        let mut arm = ArmCtrl::new(Arc::new(PoseHandle::default()), clock.clone());
        let mut params = test_params();
        params.mount.offset_mm = Vector2::new(0.0, -79.0);
        params.mount.rotation_rad = -std::f64::consts::FRAC_PI_2;
        params.shoulder_mode = ShoulderMode::Front;
        arm.init_with_params(params).unwrap();

        arm.execute_movement(vec![Keyframe::new(Frame::Arm, 150.0, 50.0, 0.0, 0)])
            .unwrap();
        clock.advance_us(10_000);
        let (_, report) = tick(&mut arm);

        // Front mirrored to back: the elbow with the larger y is chosen
        let elbow_y = 135.0 * report.shoulder_angle_rad.sin();
        let candidates = kinematics::compute_possible_elbow_positions(
            &Point2::new(150.0, 50.0),
            &LinkLengths::new(135.0, 136.0),
        );
        match candidates {
            util::geom::CircleIntersection::Two(a, b) => {
                assert_abs_diff_eq!(elbow_y, a.y.max(b.y), epsilon = 1e-6)
            }
            _ => panic!("Expected two elbow positions"),
        }
    }

    #[test]
    fn test_init_rejects_bad_params() {
        let clock = Arc::new(SimClock::starting_at(0));
        let mut arm = ArmCtrl::new(Arc::new(PoseHandle::default()), clock);
        let mut params = test_params();
        params.link_lengths.upper_mm = -1.0;
        assert!(matches!(
            arm.init_with_params(params),
            Err(ArmCtrlError::InvalidParams(_))
        ));
    }
}
