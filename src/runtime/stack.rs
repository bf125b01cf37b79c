//! Stack and frame primitives.
//!
//! Every primitive bounds-checks its access, and on violation sets the
//! matching terminal status and returns a zero slot (for reads) or drops
//! the value (for writes). Callers keep executing the remainder of the
//! current instruction with the placeholder; the poll loop observes the
//! status afterwards. Nothing here unwinds.

use crate::bytecode::slot::Slot;
use crate::runtime::status::VmStatus;
use crate::runtime::vm::Vm;

/// Reserved slots at the bottom of every call frame: return address,
/// parent frame offset, parent local count.
pub(crate) const FRAME_HEADER_SLOTS: u16 = 3;

impl Vm {
    // -------------------------------------------------------------------------
    // Program reads (advance the program counter)
    // -------------------------------------------------------------------------

    pub(crate) fn read_program_1b(&mut self) -> u8 {
        let pc = self.program_counter as usize;
        if pc >= self.memory.program_size() as usize {
            self.status = VmStatus::ReadInvalidProgram;
            return 0;
        }
        self.program_counter += 1;
        self.memory.program()[pc]
    }

    pub(crate) fn read_program_2b(&mut self) -> u16 {
        let pc = self.program_counter as usize;
        if pc + 1 >= self.memory.program_size() as usize {
            self.status = VmStatus::ReadInvalidProgram;
            return 0;
        }
        self.program_counter += 2;
        let p = self.memory.program();
        u16::from_le_bytes([p[pc], p[pc + 1]])
    }

    pub(crate) fn read_program_4b(&mut self) -> u32 {
        let pc = self.program_counter as usize;
        if pc + 3 >= self.memory.program_size() as usize {
            self.status = VmStatus::ReadInvalidProgram;
            return 0;
        }
        self.program_counter += 4;
        let p = self.memory.program();
        u32::from_le_bytes([p[pc], p[pc + 1], p[pc + 2], p[pc + 3]])
    }

    // -------------------------------------------------------------------------
    // Stack slots
    // -------------------------------------------------------------------------

    pub(crate) fn stack_slot(&self, off: usize) -> Slot {
        self.memory.stack.get(off).copied().unwrap_or(Slot::ZERO)
    }

    fn set_stack_slot(&mut self, off: usize, value: Slot) {
        if let Some(slot) = self.memory.stack.get_mut(off) {
            *slot = value;
        }
    }

    /// Offset of the first local slot of the current frame, one past the
    /// reserved header. Computed wide: `pop_frame` restores the frame
    /// offset from a program-controlled stack slot, so this sum must not
    /// wrap in 16 bits.
    pub(crate) fn frame_base(&self) -> usize {
        self.frame.frame_offset as usize + FRAME_HEADER_SLOTS as usize
    }

    pub(crate) fn push(&mut self, value: Slot) {
        if self.stack_offset as usize >= self.memory.stack.len() {
            self.status = VmStatus::StackOverflow;
            return;
        }
        self.set_stack_slot(self.stack_offset as usize, value);
        self.stack_offset += 1;
    }

    pub(crate) fn pop(&mut self) -> Slot {
        if self.stack_offset == 0 {
            self.status = VmStatus::StackUnderflow;
            return Slot::ZERO;
        }
        self.stack_offset -= 1;
        self.stack_slot(self.stack_offset as usize)
    }

    /// Like [`Vm::pop`], but refuses to cross the current frame's reserved
    /// header boundary. This is the guard that keeps a buggy program from
    /// consuming its own call frame.
    pub(crate) fn pop_operand(&mut self) -> Slot {
        if self.stack_offset as usize == self.frame_base() {
            self.status = VmStatus::OperandStackUnderflow;
            return Slot::ZERO;
        }
        self.pop()
    }

    // -------------------------------------------------------------------------
    // Constant / global / local access
    // -------------------------------------------------------------------------

    pub(crate) fn read_const(&mut self, idx: u16) -> Slot {
        if idx >= self.memory.const_count() {
            self.status = VmStatus::ReadInvalidConst;
            return Slot::ZERO;
        }
        self.memory.const_slot(idx)
    }

    pub(crate) fn read_global(&mut self, idx: u16) -> Slot {
        match self.memory.globals.get(idx as usize) {
            Some(&slot) => slot,
            None => {
                self.status = VmStatus::ReadInvalidGlobal;
                Slot::ZERO
            }
        }
    }

    pub(crate) fn write_global(&mut self, idx: u16, value: Slot) {
        match self.memory.globals.get_mut(idx as usize) {
            Some(slot) => *slot = value,
            None => self.status = VmStatus::WriteInvalidGlobal,
        }
    }

    /// Local `idx` lives directly above the frame header.
    fn local_off(&self, idx: u8) -> usize {
        self.frame_base() + idx as usize
    }

    pub(crate) fn read_local(&mut self, idx: u8) -> Slot {
        let off = self.local_off(idx);
        if idx >= self.frame.local_size || off >= self.memory.stack.len() {
            self.status = VmStatus::ReadInvalidLocal;
            return Slot::ZERO;
        }
        self.stack_slot(off)
    }

    pub(crate) fn write_local(&mut self, idx: u8, value: Slot) {
        let off = self.local_off(idx);
        if idx >= self.frame.local_size || off >= self.memory.stack.len() {
            self.status = VmStatus::WriteInvalidLocal;
            return;
        }
        self.set_stack_slot(off, value);
    }

    // -------------------------------------------------------------------------
    // Call frames
    // -------------------------------------------------------------------------

    /// Opens a new frame: pops `argc` arguments, pushes the three header
    /// slots, then re-pushes the arguments in their original left-to-right
    /// order as the start of the new frame's local storage.
    ///
    /// The new frame's local count is NOT set here; the function body's
    /// ENTER declares it and extends the stack past the locals. Until then
    /// no local access is valid.
    pub(crate) fn push_frame(&mut self, return_addr: u16, argc: u8) {
        let mut args = Vec::with_capacity(argc as usize);
        for _ in 0..argc {
            args.push(self.pop());
        }

        self.push(Slot::from_i32(return_addr as i32));
        self.push(Slot::from_i32(self.frame.frame_offset as i32));

        // The header starts at the return-address slot just pushed.
        self.frame.frame_offset = self.stack_offset.saturating_sub(2);

        self.push(Slot::from_i32(self.frame.local_size as i32));

        for &arg in args.iter().rev() {
            self.push(arg);
        }
    }

    /// Discards the current frame (including any operand residue), restores
    /// the parent's header fields and jumps to the stored return address.
    /// Pushing a return value is the caller's business.
    pub(crate) fn pop_frame(&mut self) {
        let fo = self.frame.frame_offset;
        let base = fo as usize;
        let parent_offset = self.stack_slot(base + 1).as_i32() as u16;
        self.frame.local_size = self.stack_slot(base + 2).as_i32() as u8;
        self.program_counter = self.stack_slot(base).as_i32() as u16;
        self.stack_offset = fo;
        self.frame.frame_offset = parent_offset;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::image::ImageBuilder;
    use crate::bytecode::op::OP_HALT;
    use crate::runtime::vm::VmConfig;

    fn vm_with_program(program: &[u8]) -> Vm {
        let mut b = ImageBuilder::new();
        for &byte in program {
            b.op(byte);
        }
        Vm::load(b.build()).unwrap()
    }

    fn small_vm(stack_slots: usize) -> Vm {
        let mut b = ImageBuilder::new();
        b.op(OP_HALT);
        let config = VmConfig {
            stack_slots,
            ..VmConfig::default()
        };
        Vm::load_with_config(b.build(), &config).unwrap()
    }

    #[test]
    fn test_program_reads_advance_pc() {
        let mut vm = vm_with_program(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert_eq!(vm.read_program_1b(), 0x01);
        assert_eq!(vm.program_counter(), 1);
        assert_eq!(vm.read_program_2b(), 0x0302);
        assert_eq!(vm.program_counter(), 3);
        assert_eq!(vm.read_program_4b(), 0x0706_0504);
        assert_eq!(vm.program_counter(), 7);
        assert_eq!(vm.status(), VmStatus::Running);
    }

    #[test]
    fn test_program_read_past_end() {
        let mut vm = vm_with_program(&[0x01, 0x02]);
        vm.read_program_1b();
        // A two-byte read with one byte left faults and leaves pc alone.
        assert_eq!(vm.read_program_2b(), 0);
        assert_eq!(vm.status(), VmStatus::ReadInvalidProgram);
        assert_eq!(vm.program_counter(), 1);
    }

    #[test]
    fn test_push_pop_round_trip() {
        let mut vm = vm_with_program(&[OP_HALT]);
        vm.push(Slot::from_i32(11));
        vm.push(Slot::from_f32(2.5));
        assert_eq!(vm.pop().as_f32(), 2.5);
        assert_eq!(vm.pop().as_i32(), 11);
        assert_eq!(vm.status(), VmStatus::Running);
    }

    #[test]
    fn test_pop_empty_stack() {
        let mut vm = vm_with_program(&[OP_HALT]);
        assert_eq!(vm.pop(), Slot::ZERO);
        assert_eq!(vm.status(), VmStatus::StackUnderflow);
        assert_eq!(vm.stack_top(), 0);
    }

    #[test]
    fn test_push_at_capacity_drops_value() {
        let mut vm = small_vm(4);
        for i in 0..4 {
            vm.push(Slot::from_i32(i));
        }
        assert_eq!(vm.status(), VmStatus::Running);
        vm.push(Slot::from_i32(99));
        assert_eq!(vm.status(), VmStatus::StackOverflow);
        assert_eq!(vm.stack_top(), 4);
        // The resident slots are untouched.
        assert_eq!(vm.peek(3), Some(Slot::from_i32(3)));
    }

    #[test]
    fn test_globals_bounds() {
        let mut b = ImageBuilder::new();
        b.set_global_count(2);
        b.op(OP_HALT);
        let mut vm = Vm::load(b.build()).unwrap();

        vm.write_global(1, Slot::from_i32(7));
        assert_eq!(vm.read_global(1).as_i32(), 7);
        assert_eq!(vm.status(), VmStatus::Running);

        assert_eq!(vm.read_global(2), Slot::ZERO);
        assert_eq!(vm.status(), VmStatus::ReadInvalidGlobal);

        vm.status = VmStatus::Running;
        vm.write_global(2, Slot::ONE);
        assert_eq!(vm.status(), VmStatus::WriteInvalidGlobal);
    }

    #[test]
    fn test_const_bounds() {
        let mut b = ImageBuilder::new();
        b.push_const(Slot::from_i32(5));
        b.op(OP_HALT);
        let mut vm = Vm::load(b.build()).unwrap();
        assert_eq!(vm.read_const(0).as_i32(), 5);
        assert_eq!(vm.read_const(1), Slot::ZERO);
        assert_eq!(vm.status(), VmStatus::ReadInvalidConst);
    }

    #[test]
    fn test_frame_arguments_keep_their_order() {
        let mut vm = vm_with_program(&[OP_HALT]);
        vm.push(Slot::from_i32(3));
        vm.push(Slot::from_i32(4));
        vm.push_frame(0x1234, 2);

        // Header at offset 0, arguments re-pushed above it in order.
        assert_eq!(vm.frame.frame_offset, 0);
        assert_eq!(vm.stack_top(), 5);
        assert_eq!(vm.stack_slot(0).as_i32(), 0x1234);
        assert_eq!(vm.stack_slot(1).as_i32(), 0);
        assert_eq!(vm.stack_slot(2).as_i32(), 0);
        assert_eq!(vm.stack_slot(3).as_i32(), 3);
        assert_eq!(vm.stack_slot(4).as_i32(), 4);

        // Locals are not valid until ENTER declares them.
        assert_eq!(vm.frame.local_size, 0);
        vm.read_local(0);
        assert_eq!(vm.status(), VmStatus::ReadInvalidLocal);
    }

    #[test]
    fn test_operand_guard_at_header_boundary() {
        let mut vm = vm_with_program(&[OP_HALT]);
        vm.push_frame(0x0042, 0);
        // Mirror of ENTER with zero locals.
        vm.frame.local_size = 0;

        assert_eq!(vm.stack_top(), 3);
        assert_eq!(vm.pop_operand(), Slot::ZERO);
        assert_eq!(vm.status(), VmStatus::OperandStackUnderflow);
        assert_eq!(vm.stack_top(), 3);
    }

    #[test]
    fn test_push_then_pop_frame_restores_caller() {
        let mut vm = vm_with_program(&[OP_HALT]);
        vm.program_counter = 0;
        vm.push(Slot::from_i32(1)); // caller operand residue
        vm.push_frame(0x0077, 0);
        vm.frame.local_size = 2;
        vm.stack_offset = vm.frame.frame_offset + FRAME_HEADER_SLOTS + 2;

        vm.pop_frame();
        assert_eq!(vm.program_counter(), 0x0077);
        assert_eq!(vm.frame.frame_offset, 0);
        assert_eq!(vm.frame.local_size, 0);
        assert_eq!(vm.stack_top(), 1);
        assert_eq!(vm.peek(0), Some(Slot::from_i32(1)));
        assert_eq!(vm.status(), VmStatus::Running);
    }

    #[test]
    fn test_locals_read_write() {
        let mut vm = vm_with_program(&[OP_HALT]);
        vm.push(Slot::from_i32(10));
        vm.push_frame(0, 1);
        vm.frame.local_size = 2;
        vm.stack_offset = vm.frame.frame_offset + FRAME_HEADER_SLOTS + 2;

        assert_eq!(vm.read_local(0).as_i32(), 10);
        vm.write_local(1, Slot::from_i32(20));
        assert_eq!(vm.read_local(1).as_i32(), 20);

        vm.write_local(2, Slot::ONE);
        assert_eq!(vm.status(), VmStatus::WriteInvalidLocal);
    }

    #[test]
    fn test_locals_outside_stack_region_fault() {
        // A frame offset restored from a forged header can sit past the
        // stack region; local access faults instead of wrapping in u16.
        let mut vm = vm_with_program(&[OP_HALT]);
        vm.frame.frame_offset = 0xFFFF;
        vm.frame.local_size = 200;

        assert_eq!(vm.read_local(0), Slot::ZERO);
        assert_eq!(vm.status(), VmStatus::ReadInvalidLocal);

        vm.status = VmStatus::Running;
        vm.write_local(0, Slot::ONE);
        assert_eq!(vm.status(), VmStatus::WriteInvalidLocal);

        // The operand guard never matches the bogus boundary; the pop
        // falls through to the ordinary underflow check.
        vm.status = VmStatus::Running;
        assert_eq!(vm.pop_operand(), Slot::ZERO);
        assert_eq!(vm.status(), VmStatus::StackUnderflow);
    }
}
