//! # Simulated axes
//!
//! A very simple plant for the arm's axis controllers, so the executable can be run and tested
//! without any hardware. Each encoder read integrates the last applied PWM, scaled by a fixed
//! gain.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex};

use crate::arm_ctrl::{
    axis::{AxisIo, PidGains},
    ArmCtrl,
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A simulated motor and encoder.
#[derive(Debug, Clone)]
pub struct SimAxis {
    state: Arc<Mutex<PlantState>>,
}

#[derive(Debug, Default)]
struct PlantState {
    /// Encoder counts moved per unit of PWM per read.
    counts_per_pwm: f64,

    pwm: i32,

    coder: f64,
}

/// The three simulated axes of one arm.
#[derive(Debug, Clone)]
pub struct SimArm {
    pub z: SimAxis,
    pub shoulder: SimAxis,
    pub elbow: SimAxis,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimAxis {
    pub fn new(counts_per_pwm: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(PlantState {
                counts_per_pwm,
                ..Default::default()
            })),
        }
    }

    /// Current encoder reading.
    pub fn coder(&self) -> i32 {
        self.with_state(|s| s.coder.round() as i32)
    }

    /// Last PWM applied by the controller.
    pub fn pwm(&self) -> i32 {
        self.with_state(|s| s.pwm)
    }

    /// Connections to give to an axis controller.
    pub fn io(&self) -> AxisIo {
        let pwm_state = self.clone();
        let coder_state = self.clone();

        AxisIo {
            set_pwm: Box::new(move |pwm| pwm_state.with_state(|s| s.pwm = pwm)),
            get_coder: Box::new(move || {
                coder_state.with_state(|s| {
                    s.coder += f64::from(s.pwm) * s.counts_per_pwm;
                    s.coder.round() as i32
                })
            }),
        }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut PlantState) -> R) -> R {
        match self.state.lock() {
            Ok(mut s) => f(&mut s),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

impl SimArm {
    /// Create the simulated axes and connect them to `arm`.
    ///
    /// Axes with a negative proportional gain drive a motor wired in reverse, so their simulated
    /// motor is reversed too.
    pub fn connect(arm: &mut ArmCtrl, counts_per_pwm: f64) -> Self {
        let wired = |gains: &PidGains| counts_per_pwm.copysign(gains.k_p);

        let params = arm.params();
        let sim = Self {
            z: SimAxis::new(wired(&params.z_gains)),
            shoulder: SimAxis::new(wired(&params.shoulder_gains)),
            elbow: SimAxis::new(wired(&params.elbow_gains)),
        };

        arm.connect_io(sim.z.io(), sim.shoulder.io(), sim.elbow.io());

        sim
    }
}
