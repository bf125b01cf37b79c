//! Bytecode virtual machine for a 4-joint robotic arm controller.
//!
//! A host compiler packages constants, globals and a program into a single
//! digest-checked image; [`runtime::Vm`] loads that image and interprets it
//! one instruction per poll against an [`robot::ArmCtrl`] implementation.
//! Motion and delay instructions suspend across polls instead of blocking,
//! so the embedding control loop stays responsive while the arm moves.

pub mod bytecode;
pub mod robot;
pub mod runtime;

pub use bytecode::{ImageBuilder, LoadError, Slot};
pub use robot::{Actuator, ArmCtrl, SimArm};
pub use runtime::{Vm, VmConfig, VmStatus};
