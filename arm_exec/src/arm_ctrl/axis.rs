//! # Axis controllers
//!
//! Each degree of freedom of an arm (z stage, shoulder, elbow) is driven by a
//! closed-loop controller which receives a consign in controller units
//! (encoder counts) and is serviced once per control cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::{Deserialize, Serialize};
use std::fmt;

use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains of a PID controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub k_p: f64,

    /// Integral gain
    pub k_i: f64,

    /// Dervative gain
    pub k_d: f64,

    /// The controller output is divided by `2^out_shift`.
    #[serde(default)]
    pub out_shift: u32,
}

/// A discrete PID controller, stepped once per control cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PidController {
    gains: PidGains,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// Process connections of an axis: where its output goes and where its
/// measurement comes from.
pub struct AxisIo {
    /// Apply a PWM command to the motor.
    pub set_pwm: Box<dyn FnMut(i32) + Send>,

    /// Read the axis encoder.
    pub get_coder: Box<dyn FnMut() -> i32 + Send>,
}

/// An axis controlled by a [`PidController`].
pub struct PidAxis {
    name: AxisId,
    pid: PidController,
    enabled: bool,
    consign: f64,
    error: f64,
    io: Option<AxisIo>,
}

/// The three axes of an arm.
pub struct ArmAxes {
    pub z: Box<dyn AxisCtrl>,
    pub shoulder: Box<dyn AxisCtrl>,
    pub elbow: Box<dyn AxisCtrl>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// IDs of the axes of an arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AxisId {
    Z,
    Shoulder,
    Elbow,
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A closed-loop axis controller.
pub trait AxisCtrl: Send {
    fn enable(&mut self);

    /// Disable the axis. A disabled axis applies no power to its motor.
    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    /// Set the target of the control loop.
    ///
    /// Units: encoder counts
    fn set_consign(&mut self, consign: f64);

    fn consign(&self) -> f64;

    /// Run one step of the control loop.
    fn service(&mut self);

    /// The last measured error between the consign and the process output.
    fn get_error(&self) -> f64;

    /// Connect the controller to its motor and encoder.
    fn connect_io(&mut self, io: AxisIo);
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {
    /// Create a new controller with the given gains.
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            prev_error: None,
            integral: 0f64,
        }
    }

    /// Get the value of the controller for the given error.
    pub fn get(&mut self, error: f64) -> f64 {
        self.integral += error;

        // No derivative on the first step, otherwise the whole error would be
        // seen as a step change
        let deriv = match self.prev_error {
            Some(e) => error - e,
            None => 0f64,
        };

        self.prev_error = Some(error);

        let out = self.gains.k_p * error + self.gains.k_i * self.integral + self.gains.k_d * deriv;

        out / f64::from(1u32 << self.gains.out_shift.min(31))
    }

    /// Forget the accumulated integral and previous error.
    pub fn reset(&mut self) {
        self.prev_error = None;
        self.integral = 0f64;
    }
}

impl PidAxis {
    pub fn new(name: AxisId, gains: PidGains) -> Self {
        Self {
            name,
            pid: PidController::new(gains),
            enabled: false,
            consign: 0f64,
            error: 0f64,
            io: None,
        }
    }
}

impl AxisCtrl for PidAxis {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        if self.enabled {
            self.pid.reset();
        }
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_consign(&mut self, consign: f64) {
        self.consign = consign;
    }

    fn consign(&self) -> f64 {
        self.consign
    }

    fn service(&mut self) {
        let io = match self.io.as_mut() {
            Some(io) => io,
            None => return,
        };

        let measured = f64::from((io.get_coder)());
        self.error = self.consign - measured;

        let pwm = if self.enabled {
            let out = self.pid.get(self.error);
            clamp(&out, &f64::from(i32::MIN), &f64::from(i32::MAX)) as i32
        } else {
            0
        };

        trace!(
            "{} axis: consign {:.0}, measured {:.0}, pwm {}",
            self.name,
            self.consign,
            measured,
            pwm
        );

        (io.set_pwm)(pwm);
    }

    fn get_error(&self) -> f64 {
        self.error
    }

    fn connect_io(&mut self, io: AxisIo) {
        self.io = Some(io);
    }
}

impl ArmAxes {
    /// PID axes with the given gains and no IO connected.
    pub fn pid(z: PidGains, shoulder: PidGains, elbow: PidGains) -> Self {
        Self {
            z: Box::new(PidAxis::new(AxisId::Z, z)),
            shoulder: Box::new(PidAxis::new(AxisId::Shoulder, shoulder)),
            elbow: Box::new(PidAxis::new(AxisId::Elbow, elbow)),
        }
    }

    pub fn get_mut(&mut self, id: AxisId) -> &mut dyn AxisCtrl {
        match id {
            AxisId::Z => self.z.as_mut(),
            AxisId::Shoulder => self.shoulder.as_mut(),
            AxisId::Elbow => self.elbow.as_mut(),
        }
    }

    pub fn get(&self, id: AxisId) -> &dyn AxisCtrl {
        match id {
            AxisId::Z => self.z.as_ref(),
            AxisId::Shoulder => self.shoulder.as_ref(),
            AxisId::Elbow => self.elbow.as_ref(),
        }
    }

    pub fn enable_all(&mut self) {
        self.z.enable();
        self.shoulder.enable();
        self.elbow.enable();
    }

    pub fn disable_all(&mut self) {
        self.z.disable();
        self.shoulder.disable();
        self.elbow.disable();
    }

    pub fn all_enabled(&self) -> bool {
        self.z.is_enabled() && self.shoulder.is_enabled() && self.elbow.is_enabled()
    }

    pub fn all_disabled(&self) -> bool {
        !self.z.is_enabled() && !self.shoulder.is_enabled() && !self.elbow.is_enabled()
    }

    pub fn service_all(&mut self) {
        self.z.service();
        self.shoulder.service();
        self.elbow.service();
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisId::Z => f.write_str("z"),
            AxisId::Shoulder => f.write_str("shoulder"),
            AxisId::Elbow => f.write_str("elbow"),
        }
    }
}

impl fmt::Debug for AxisIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AxisIo")
    }
}
