//! # Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{Point2, Vector2};
use std::sync::Arc;

use arm_lib::{
    arm_ctrl::{
        axis::PidGains,
        frames::ArmMount,
        kinematics::{self, LinkLengths, ShoulderMode},
        obstacle::{NoObstacles, ObstacleSet},
        ArmCtrl, Frame, InputData, Keyframe, Params,
    },
    loc::{Pose, PoseHandle},
};
use util::{module::State, time::SimClock};

fn left_arm_params() -> Params {
    let gains = PidGains {
        k_p: 100.0,
        k_i: 2.0,
        k_d: 80.0,
        out_shift: 6,
    };

    Params {
        link_lengths: LinkLengths::new(135.0, 136.0),
        mount: ArmMount {
            offset_mm: Vector2::new(0.0, 79.0),
            rotation_rad: std::f64::consts::FRAC_PI_2,
        },
        z_counts_per_mm: 2620.0,
        shoulder_counts_per_rad: 77785.0,
        elbow_counts_per_rad: 56571.0,
        z_gains: gains,
        shoulder_gains: gains,
        elbow_gains: gains,
        shoulder_mode: ShoulderMode::Front,
        obstacles: vec![],
    }
}

fn square(x: f64, y: f64, half: f64) -> Vec<Point2<f64>> {
    vec![
        Point2::new(x - half, y - half),
        Point2::new(x + half, y - half),
        Point2::new(x + half, y + half),
        Point2::new(x - half, y + half),
    ]
}

fn kinematics_benchmark(c: &mut Criterion) {
    let lengths = LinkLengths::new(135.0, 136.0);
    let target = Point2::new(150.0, 80.0);

    c.bench_function("ik solve (no obstacles)", |b| {
        b.iter(|| {
            kinematics::solve(
                black_box(&target),
                0.0,
                &lengths,
                ShoulderMode::Front,
                &NoObstacles,
            )
        })
    });

    let mut obstacles = ObstacleSet::default();
    obstacles.create(Frame::Arm, square(0.0, 200.0, 20.0), 100.0).unwrap();
    obstacles.create(Frame::Robot, square(0.0, 0.0, 100.0), 350.0).unwrap();
    obstacles.create(Frame::Table, square(1500.0, 1000.0, 50.0), 50.0).unwrap();
    let arm_frame =
        obstacles.in_arm_frame(&left_arm_params().mount, &Pose::new(1000.0, 1000.0, 0.3));

    c.bench_function("ik solve (3 obstacles)", |b| {
        b.iter(|| {
            kinematics::solve(
                black_box(&target),
                0.0,
                &lengths,
                ShoulderMode::Front,
                &arm_frame,
            )
        })
    });
}

fn tick_benchmark(c: &mut Criterion) {
    let clock = Arc::new(SimClock::starting_at(0));
    let pose = PoseHandle::new(Pose::new(1000.0, 1000.0, 0.0));
    let mut arm = ArmCtrl::new(Arc::new(pose), clock.clone());
    arm.init_with_params(left_arm_params()).unwrap();
    arm.create_obstacle(Frame::Table, square(1500.0, 1000.0, 50.0), 50.0)
        .unwrap();

    let keyframes = (0..100)
        .map(|i| {
            let t = i as f64 / 100.0;
            Keyframe::new(
                Frame::Table,
                1000.0 + 150.0 * (t * 6.0).cos(),
                1200.0 + 50.0 * t,
                100.0 * t,
                i * 100_000,
            )
        })
        .collect();
    arm.execute_movement(keyframes).unwrap();

    let input = InputData::default();

    c.bench_function("arm tick", |b| {
        b.iter(|| {
            clock.advance_us(1_000);
            let out = arm.proc(&input);
            arm.manage();
            out
        })
    });
}

criterion_group!(benches, kinematics_benchmark, tick_benchmark);
criterion_main!(benches);
