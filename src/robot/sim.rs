//! A software arm for tests and host-side dry runs.

use crate::robot::{Actuator, ArmCtrl, CartesianTarget, JointAngles, KineError};

/// Deterministic [`ArmCtrl`] implementation.
///
/// In manual mode (the default) a commanded actuator stays "moving" until
/// the test calls [`SimArm::arrive`], and a started delay stays pending
/// until [`SimArm::finish_delay`]; this is what suspension tests need to
/// observe the VM across unsatisfied polls. [`SimArm::auto`] answers every
/// wait immediately so whole programs run to completion, which is what the
/// CLI dry-run mode wants.
#[derive(Debug, Clone)]
pub struct SimArm {
    auto: bool,
    targets: [f32; 6],
    angles: [f32; 6],
    speeds: [f32; 6],
    arrived: [bool; 6],
    delay_pending: bool,
    /// Scripted solver answer for the next Cartesian request.
    pub solver: Result<JointAngles, KineError>,
    pub resets: u32,
    pub gripper_opens: u32,
    pub gripper_closes: u32,
    pub displayed: Vec<(i32, i32, i32, i32)>,
    pub printed: Vec<i32>,
}

impl Default for SimArm {
    fn default() -> Self {
        SimArm::new()
    }
}

impl SimArm {
    pub fn new() -> SimArm {
        SimArm {
            auto: false,
            targets: [0.0; 6],
            angles: [0.0; 6],
            speeds: [100.0; 6],
            arrived: [true; 6],
            delay_pending: false,
            solver: Ok(JointAngles {
                m1: 0.0,
                m2: 0.0,
                m3: 0.0,
                m4: 0.0,
            }),
            resets: 0,
            gripper_opens: 0,
            gripper_closes: 0,
            displayed: Vec::new(),
            printed: Vec::new(),
        }
    }

    /// An arm that converges instantly and never keeps the VM waiting.
    pub fn auto() -> SimArm {
        SimArm {
            auto: true,
            ..SimArm::new()
        }
    }

    fn idx(actuator: Actuator) -> usize {
        actuator.id() as usize - 1
    }

    /// Mark one actuator as having reached its target.
    pub fn arrive(&mut self, actuator: Actuator) {
        let i = Self::idx(actuator);
        self.arrived[i] = true;
        self.angles[i] = self.targets[i];
    }

    pub fn arrive_all(&mut self) {
        for a in Actuator::ARM_JOINTS {
            self.arrive(a);
        }
        self.arrive(Actuator::BaseServo);
        self.arrive(Actuator::Gripper);
    }

    pub fn finish_delay(&mut self) {
        self.delay_pending = false;
    }

    pub fn target(&self, actuator: Actuator) -> f32 {
        self.targets[Self::idx(actuator)]
    }

    pub fn speed(&self, actuator: Actuator) -> f32 {
        self.speeds[Self::idx(actuator)]
    }

    pub fn set_angle(&mut self, actuator: Actuator, angle: f32) {
        self.angles[Self::idx(actuator)] = angle;
    }
}

impl ArmCtrl for SimArm {
    fn set_target(&mut self, actuator: Actuator, angle: f32) {
        let i = Self::idx(actuator);
        self.targets[i] = angle;
        if self.auto {
            self.angles[i] = angle;
        } else {
            self.arrived[i] = false;
        }
    }

    fn angle(&self, actuator: Actuator) -> f32 {
        self.angles[Self::idx(actuator)]
    }

    fn set_speed(&mut self, actuator: Actuator, percent: f32) {
        self.speeds[Self::idx(actuator)] = percent;
    }

    fn reached(&self, actuator: Actuator) -> bool {
        self.auto || self.arrived[Self::idx(actuator)]
    }

    fn all_joints_reached(&self) -> bool {
        self.auto || Actuator::ARM_JOINTS.iter().all(|&a| self.arrived[Self::idx(a)])
    }

    fn resolve_cartesian(&self, _target: CartesianTarget) -> Result<JointAngles, KineError> {
        self.solver
    }

    fn reset(&mut self) {
        self.resets += 1;
        for i in 0..4 {
            self.targets[i] = 0.0;
            if !self.auto {
                self.arrived[i] = false;
            }
        }
    }

    fn gripper_open(&mut self) {
        self.gripper_opens += 1;
    }

    fn gripper_close(&mut self) {
        self.gripper_closes += 1;
    }

    fn delay_start(&mut self, _ms: u32) {
        self.delay_pending = !self.auto;
    }

    fn delay_elapsed(&self) -> bool {
        !self.delay_pending
    }

    fn show_number(&mut self, row: i32, col: i32, value: i32, width: i32) {
        self.displayed.push((row, col, value, width));
    }

    fn debug_print(&mut self, value: i32) {
        self.printed.push(value);
    }
}
