//! The capability seam between the VM and the rest of the firmware.
//!
//! The interpreter never touches motor control, kinematics or the display
//! directly: every system-call instruction goes through [`ArmCtrl`], which
//! the surrounding application implements over the real hardware and tests
//! implement with [`SimArm`]. Passing the context into each dispatch step
//! keeps the VM free of ambient hardware state.

pub mod sim;

pub use sim::SimArm;

use serde::{Deserialize, Serialize};

/// One of the six logical actuators, identified on the wire by the small
/// integer ids the host compiler emits (1-based).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actuator {
    Joint1,
    Joint2,
    Joint3,
    Joint4,
    BaseServo,
    Gripper,
}

impl Actuator {
    /// Wire id to actuator. Out-of-range ids yield `None`; system calls
    /// treat that as a silent no-op rather than a fault.
    pub fn from_id(id: i32) -> Option<Actuator> {
        match id {
            1 => Some(Actuator::Joint1),
            2 => Some(Actuator::Joint2),
            3 => Some(Actuator::Joint3),
            4 => Some(Actuator::Joint4),
            5 => Some(Actuator::BaseServo),
            6 => Some(Actuator::Gripper),
            _ => None,
        }
    }

    pub fn id(self) -> i32 {
        match self {
            Actuator::Joint1 => 1,
            Actuator::Joint2 => 2,
            Actuator::Joint3 => 3,
            Actuator::Joint4 => 4,
            Actuator::BaseServo => 5,
            Actuator::Gripper => 6,
        }
    }

    /// The four arm joints, the set the aggregate wait checks.
    pub const ARM_JOINTS: [Actuator; 4] = [
        Actuator::Joint1,
        Actuator::Joint2,
        Actuator::Joint3,
        Actuator::Joint4,
    ];
}

/// Cartesian move request. `alpha_rad` is the wrist angle in radians; the
/// dispatch layer converts from the degrees found on the operand stack.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartesianTarget {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub alpha_rad: f32,
}

/// Per-joint angles resolved from a Cartesian target.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointAngles {
    pub m1: f32,
    pub m2: f32,
    pub m3: f32,
    pub m4: f32,
}

/// Why the solver refused a Cartesian target. Never a VM fault: the move is
/// skipped and the program continues.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KineError {
    Invalid,
    Unreachable,
    JointLimit,
    ArmCollision,
}

/// Everything the VM can ask of the arm.
///
/// Synchronous calls either complete immediately (`set_target`, `reset`) or
/// are poll-checkable (`reached`, `delay_elapsed`); nothing here blocks.
pub trait ArmCtrl {
    /// Command a target angle (degrees) for one actuator.
    fn set_target(&mut self, actuator: Actuator, angle: f32);

    /// Current angle (degrees) of one actuator.
    fn angle(&self, actuator: Actuator) -> f32;

    /// Speed limit as a percentage of the actuator's maximum.
    fn set_speed(&mut self, actuator: Actuator, percent: f32);

    /// Has this actuator reached its last commanded target?
    fn reached(&self, actuator: Actuator) -> bool;

    /// Have all four arm joints reached their targets? The base servo and
    /// gripper are not part of this aggregate.
    fn all_joints_reached(&self) -> bool;

    /// Inverse kinematics for a Cartesian target.
    fn resolve_cartesian(&self, target: CartesianTarget) -> Result<JointAngles, KineError>;

    /// Trigger the homing sequence. Completion is only observable through
    /// `all_joints_reached`.
    fn reset(&mut self);

    fn gripper_open(&mut self);
    fn gripper_close(&mut self);

    /// Start a millisecond countdown; `delay_elapsed` reports completion.
    fn delay_start(&mut self, ms: u32);
    fn delay_elapsed(&self) -> bool;

    /// Diagnostic numeric display, fire and forget.
    fn show_number(&mut self, row: i32, col: i32, value: i32, width: i32);

    /// Debug print of one integer. No-op unless the embedder cares.
    fn debug_print(&mut self, _value: i32) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actuator_id_round_trip() {
        for id in 1..=6 {
            assert_eq!(Actuator::from_id(id).unwrap().id(), id);
        }
    }

    #[test]
    fn test_out_of_range_ids() {
        assert_eq!(Actuator::from_id(0), None);
        assert_eq!(Actuator::from_id(7), None);
        assert_eq!(Actuator::from_id(-1), None);
    }
}
