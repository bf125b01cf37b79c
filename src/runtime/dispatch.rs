//! The dispatch loop.
//!
//! One call to [`Vm::step`] is one poll. With no operation pending it
//! fetches and fully executes a single instruction; with a pending
//! split operation it only re-checks that operation's completion
//! condition. Long-running robot actions therefore occupy many polls
//! without ever blocking the firmware loop that drives everything else.

use log::debug;

use crate::bytecode::op::*;
use crate::bytecode::slot::Slot;
use crate::robot::{Actuator, ArmCtrl, CartesianTarget};
use crate::runtime::status::VmStatus;
use crate::runtime::vm::Vm;

impl Vm {
    /// Performs exactly one dispatch step against the arm capabilities.
    ///
    /// A no-op once the status has left `Running`; the caller is expected
    /// to stop polling at that point.
    pub fn step(&mut self, arm: &mut dyn ArmCtrl) {
        if self.status != VmStatus::Running {
            return;
        }

        if self.split_op == 0 {
            self.step_instruction(arm);
        } else {
            self.step_suspended(arm);
        }

        if self.status != VmStatus::Running {
            debug!(
                "vm stopped: {} at pc={:#06x}",
                self.status, self.program_counter
            );
        }
    }

    fn step_instruction(&mut self, arm: &mut dyn ArmCtrl) {
        let op = self.read_program_1b();

        match op {
            // -----------------------------------------------------------------
            // Control flow
            // -----------------------------------------------------------------
            OP_NOP => {}
            OP_HALT => {
                self.status = VmStatus::Halted;
            }
            OP_JMP => {
                let addr = self.read_program_2b();
                if addr >= self.memory.program_size() {
                    self.status = VmStatus::ProgramOverstep;
                    return;
                }
                self.program_counter = addr;
            }
            OP_JZ => {
                let addr = self.read_program_2b();
                if addr >= self.memory.program_size() {
                    self.status = VmStatus::ProgramOverstep;
                    return;
                }
                let condition = self.pop();
                if condition.as_i32() == 0 {
                    self.program_counter = addr;
                }
            }
            OP_JNZ => {
                let addr = self.read_program_2b();
                if addr >= self.memory.program_size() {
                    self.status = VmStatus::ProgramOverstep;
                    return;
                }
                let condition = self.pop();
                if condition.as_i32() != 0 {
                    self.program_counter = addr;
                }
            }
            OP_CALL => {
                let addr = self.read_program_2b();
                if addr >= self.memory.program_size() {
                    self.status = VmStatus::ProgramOverstep;
                    return;
                }
                let argc = self.read_program_1b();
                let return_addr = self.program_counter;
                self.push_frame(return_addr, argc);
                self.program_counter = addr;
            }
            OP_ENTER => {
                // Declares the local count of the frame just entered; must
                // be the first instruction of a function body.
                let nlocals = self.read_program_1b();
                let new_top = self.frame_base() + nlocals as usize;
                if new_top > self.memory.stack.len() {
                    self.status = VmStatus::StackOverflow;
                    return;
                }
                self.frame.local_size = nlocals;
                self.stack_offset = new_top as u16;
            }
            OP_RET => {
                let ret = self.pop_operand();
                self.pop_frame();
                self.push(ret);
            }
            OP_RET0 => {
                self.pop_frame();
            }

            // -----------------------------------------------------------------
            // Stack and data motion
            // -----------------------------------------------------------------
            OP_LOADK => {
                let idx = self.read_program_2b();
                let value = self.read_const(idx);
                self.push(value);
            }
            OP_LOADG => {
                let idx = self.read_program_2b();
                let value = self.read_global(idx);
                self.push(value);
            }
            OP_LOADL => {
                let idx = self.read_program_1b();
                let value = self.read_local(idx);
                self.push(value);
            }
            // The integer and float forms differ only in assembler syntax;
            // both push the raw operand bytes.
            OP_IMMI | OP_IMMF => {
                let raw = self.read_program_4b();
                self.push(Slot::from_le_bytes(raw.to_le_bytes()));
            }
            OP_POP => {
                self.pop();
            }
            OP_STORL => {
                let idx = self.read_program_1b();
                let value = self.pop_operand();
                self.write_local(idx, value);
            }
            OP_STORG => {
                let idx = self.read_program_2b();
                let value = self.pop_operand();
                self.write_global(idx, value);
            }

            // -----------------------------------------------------------------
            // Integer arithmetic (two's complement, wrapping)
            // -----------------------------------------------------------------
            OP_IADD => self.int_binop(|a, b| a.wrapping_add(b)),
            OP_ISUB => self.int_binop(|a, b| a.wrapping_sub(b)),
            OP_IMUL => self.int_binop(|a, b| a.wrapping_mul(b)),
            OP_IDIV => {
                let b = self.pop_operand();
                let a = self.pop_operand();
                if b.as_i32() == 0 {
                    self.status = VmStatus::DivideByZero;
                    return;
                }
                self.push(Slot::from_i32(a.as_i32().wrapping_div(b.as_i32())));
            }
            OP_IMOD => {
                let b = self.pop_operand();
                let a = self.pop_operand();
                if b.as_i32() == 0 {
                    self.status = VmStatus::DivideByZero;
                    return;
                }
                self.push(Slot::from_i32(a.as_i32().wrapping_rem(b.as_i32())));
            }
            OP_INEG => {
                let a = self.pop_operand();
                self.push(Slot::from_i32(a.as_i32().wrapping_neg()));
            }

            // -----------------------------------------------------------------
            // Float arithmetic
            // -----------------------------------------------------------------
            OP_FADD => self.float_binop(|a, b| a + b),
            OP_FSUB => self.float_binop(|a, b| a - b),
            OP_FMUL => self.float_binop(|a, b| a * b),
            OP_FDIV => self.float_binop(|a, b| a / b),
            OP_FNEG => {
                let a = self.pop_operand();
                self.push(Slot::from_f32(-a.as_f32()));
            }

            // -----------------------------------------------------------------
            // Logic (nonzero is true, result is integer 0/1)
            // -----------------------------------------------------------------
            OP_LNOT => {
                let a = self.pop_operand();
                self.push(Slot::from_bool(a.as_i32() == 0));
            }
            OP_LAND => {
                let b = self.pop_operand();
                let a = self.pop_operand();
                self.push(Slot::from_bool(a.as_i32() != 0 && b.as_i32() != 0));
            }
            OP_LOR => {
                let b = self.pop_operand();
                let a = self.pop_operand();
                self.push(Slot::from_bool(a.as_i32() != 0 || b.as_i32() != 0));
            }

            // -----------------------------------------------------------------
            // Bitwise
            // -----------------------------------------------------------------
            OP_BAND => self.int_binop(|a, b| a & b),
            OP_BOR => self.int_binop(|a, b| a | b),
            OP_BXOR => self.int_binop(|a, b| a ^ b),
            OP_BNOT => {
                let a = self.pop_operand();
                self.push(Slot::from_i32(!a.as_i32()));
            }
            // Shift counts are masked to the register width, as the target
            // hardware does.
            OP_SHL => self.int_binop(|a, b| a.wrapping_shl(b as u32)),
            OP_SHR => self.int_binop(|a, b| a.wrapping_shr(b as u32)),

            // -----------------------------------------------------------------
            // Comparison
            // -----------------------------------------------------------------
            OP_IEQ => self.int_cmp(|a, b| a == b),
            OP_INE => self.int_cmp(|a, b| a != b),
            OP_IGT => self.int_cmp(|a, b| a > b),
            OP_ILT => self.int_cmp(|a, b| a < b),
            OP_IGE => self.int_cmp(|a, b| a >= b),
            OP_ILE => self.int_cmp(|a, b| a <= b),
            OP_FEQ => self.float_cmp(|a, b| a == b),
            OP_FNE => self.float_cmp(|a, b| a != b),
            OP_FGT => self.float_cmp(|a, b| a > b),
            OP_FLT => self.float_cmp(|a, b| a < b),
            OP_FGE => self.float_cmp(|a, b| a >= b),
            OP_FLE => self.float_cmp(|a, b| a <= b),

            // -----------------------------------------------------------------
            // Conversion
            // -----------------------------------------------------------------
            OP_I2F => {
                let a = self.pop_operand();
                self.push(Slot::from_f32(a.as_i32() as f32));
            }
            OP_F2I => {
                let a = self.pop_operand();
                self.push(Slot::from_i32(a.as_f32() as i32));
            }

            // -----------------------------------------------------------------
            // System calls
            // -----------------------------------------------------------------
            OP_DELAY => {
                let ms = self.pop_operand();
                arm.delay_start(ms.as_i32() as u32);
                self.split_op = OP_DELAY;
            }
            OP_RST => {
                // Completion is observed through a following WAIT.
                arm.reset();
            }
            OP_WAIT => {
                self.split_op = OP_WAIT;
            }
            OP_WAITJ => {
                let id = self.pop_operand();
                self.split_op = OP_WAITJ;
                self.temp_info = id.as_i32() as u32;
            }
            OP_MOVJ => {
                let angle = self.pop_operand();
                let id = self.pop_operand();
                if let Some(actuator) = Actuator::from_id(id.as_i32()) {
                    arm.set_target(actuator, angle.as_f32());
                }
                self.split_op = OP_WAITJ;
                self.temp_info = id.as_i32() as u32;
            }
            OP_SETJ => {
                let angle = self.pop_operand();
                let id = self.pop_operand();
                if let Some(actuator) = Actuator::from_id(id.as_i32()) {
                    arm.set_target(actuator, angle.as_f32());
                }
            }
            OP_READJ => {
                let id = self.pop_operand();
                let angle = match Actuator::from_id(id.as_i32()) {
                    Some(actuator) => Slot::from_f32(arm.angle(actuator)),
                    None => Slot::ZERO,
                };
                self.push(angle);
            }
            OP_MOVOC => {
                if self.cartesian_move(arm) {
                    self.split_op = OP_WAIT;
                }
            }
            OP_SETOC => {
                self.cartesian_move(arm);
            }
            OP_MOVJC => {
                self.combined_move(arm);
                self.split_op = OP_WAIT;
            }
            OP_SETJC => {
                self.combined_move(arm);
            }
            OP_GRIPO => {
                arm.gripper_open();
            }
            OP_GRIPC => {
                arm.gripper_close();
            }
            OP_SETJSPD => {
                let percent = self.pop_operand();
                let id = self.pop_operand();
                if let Some(actuator) = Actuator::from_id(id.as_i32()) {
                    arm.set_speed(actuator, percent.as_f32());
                }
            }
            OP_OLEDI => {
                let width = self.pop_operand();
                let value = self.pop_operand();
                let col = self.pop_operand();
                let row = self.pop_operand();
                arm.show_number(row.as_i32(), col.as_i32(), value.as_i32(), width.as_i32());
            }
            OP_PRINT => {
                let value = self.pop_operand();
                arm.debug_print(value.as_i32());
            }

            _ => {
                self.status = VmStatus::InvalidOperator;
            }
        }
    }

    /// Re-checks a pending split operation; clears it once its condition
    /// holds. No program counter movement, no opcode execution.
    fn step_suspended(&mut self, arm: &mut dyn ArmCtrl) {
        match self.split_op {
            OP_DELAY => {
                if arm.delay_elapsed() {
                    self.split_op = 0;
                }
            }
            OP_WAIT => {
                if arm.all_joints_reached() {
                    self.split_op = 0;
                }
            }
            OP_WAITJ => match Actuator::from_id(self.temp_info as i32) {
                Some(actuator) => {
                    if arm.reached(actuator) {
                        self.split_op = 0;
                    }
                }
                // Waiting on nothing real; resume immediately.
                None => self.split_op = 0,
            },
            // An unrecognized tag would wedge the program forever; treat
            // it as already satisfied.
            _ => self.split_op = 0,
        }
    }

    fn int_binop(&mut self, f: impl FnOnce(i32, i32) -> i32) {
        let b = self.pop_operand();
        let a = self.pop_operand();
        self.push(Slot::from_i32(f(a.as_i32(), b.as_i32())));
    }

    fn float_binop(&mut self, f: impl FnOnce(f32, f32) -> f32) {
        let b = self.pop_operand();
        let a = self.pop_operand();
        self.push(Slot::from_f32(f(a.as_f32(), b.as_f32())));
    }

    fn int_cmp(&mut self, f: impl FnOnce(i32, i32) -> bool) {
        let b = self.pop_operand();
        let a = self.pop_operand();
        self.push(Slot::from_bool(f(a.as_i32(), b.as_i32())));
    }

    fn float_cmp(&mut self, f: impl FnOnce(f32, f32) -> bool) {
        let b = self.pop_operand();
        let a = self.pop_operand();
        self.push(Slot::from_bool(f(a.as_f32(), b.as_f32())));
    }

    /// Pops a Cartesian target (alpha in degrees, then z, y, x), resolves
    /// it and commands the four joints. Solver failure skips the move and
    /// returns false; the program keeps running either way.
    fn cartesian_move(&mut self, arm: &mut dyn ArmCtrl) -> bool {
        let alpha = self.pop_operand();
        let z = self.pop_operand();
        let y = self.pop_operand();
        let x = self.pop_operand();
        let target = CartesianTarget {
            x: x.as_f32(),
            y: y.as_f32(),
            z: z.as_f32(),
            alpha_rad: alpha.as_f32().to_radians(),
        };
        match arm.resolve_cartesian(target) {
            Ok(angles) => {
                arm.set_target(Actuator::Joint1, angles.m1);
                arm.set_target(Actuator::Joint2, angles.m2);
                arm.set_target(Actuator::Joint3, angles.m3);
                arm.set_target(Actuator::Joint4, angles.m4);
                true
            }
            Err(_) => false,
        }
    }

    /// Pops six joint-space angles (gripper, servo, joints 4..1) and
    /// commands all six actuators.
    fn combined_move(&mut self, arm: &mut dyn ArmCtrl) {
        let gripper = self.pop_operand();
        let servo = self.pop_operand();
        let m4 = self.pop_operand();
        let m3 = self.pop_operand();
        let m2 = self.pop_operand();
        let m1 = self.pop_operand();

        arm.set_target(Actuator::Joint1, m1.as_f32());
        arm.set_target(Actuator::Joint2, m2.as_f32());
        arm.set_target(Actuator::Joint3, m3.as_f32());
        arm.set_target(Actuator::Joint4, m4.as_f32());
        arm.set_target(Actuator::BaseServo, servo.as_f32());
        arm.set_target(Actuator::Gripper, gripper.as_f32());
    }
}
