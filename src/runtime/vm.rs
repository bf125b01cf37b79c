use log::debug;

use crate::bytecode::image::{ImageLayout, LoadError, SLOT_SIZE};
use crate::bytecode::slot::Slot;
use crate::runtime::status::VmStatus;

/// Memory budgets for a loaded program.
///
/// The defaults are the firmware's fixed budgets; hosts running images in
/// simulation may raise them.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Stack capacity in slots, shared by operands and frame bookkeeping.
    pub stack_slots: usize,
    /// Constant pool budget in bytes.
    pub const_area_max: usize,
    /// Global variable area budget in bytes.
    pub global_area_max: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            stack_slots: 1024,
            const_area_max: 4096,
            global_area_max: 4096,
        }
    }
}

/// The four memory regions of a loaded program.
///
/// Program and constants are views into the owned image bytes; globals and
/// stack are allocated fresh at load and released when the `Vm` drops.
#[derive(Debug)]
pub(crate) struct VmMemory {
    image: Vec<u8>,
    layout: ImageLayout,
    pub(crate) globals: Vec<Slot>,
    pub(crate) stack: Vec<Slot>,
}

impl VmMemory {
    pub(crate) fn program(&self) -> &[u8] {
        let start = self.layout.program_off;
        &self.image[start..start + self.layout.program_size as usize]
    }

    pub(crate) fn program_size(&self) -> u16 {
        self.layout.program_size
    }

    pub(crate) fn const_count(&self) -> u16 {
        self.layout.const_count
    }

    /// Raw pool read; the caller has already bounds-checked `idx`.
    pub(crate) fn const_slot(&self, idx: u16) -> Slot {
        let off = self.layout.const_off + idx as usize * SLOT_SIZE;
        Slot::from_le_bytes([
            self.image[off],
            self.image[off + 1],
            self.image[off + 2],
            self.image[off + 3],
        ])
    }
}

/// Where the current call frame sits and how many locals it declared,
/// kept out of the stack for fast access. The return address has no
/// mirror; `pop_frame` reads it back from its reserved stack slot.
/// `local_size` is only meaningful once the frame's ENTER has executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FrameHeader {
    pub(crate) frame_offset: u16,
    pub(crate) local_size: u8,
}

/// The interpreter.
///
/// One instance is live at a time; the surrounding application polls
/// [`Vm::step`] once per loop iteration and stops when [`Vm::status`] is no
/// longer running. Dropping the `Vm` releases every region; an in-flight
/// suspended operation is abandoned, not unwound.
#[derive(Debug)]
pub struct Vm {
    pub(crate) memory: VmMemory,
    pub(crate) program_counter: u16,
    pub(crate) stack_offset: u16,
    pub(crate) frame: FrameHeader,
    /// Opcode that owns multi-poll execution, 0 when none is pending.
    pub(crate) split_op: u8,
    /// Private payload of the pending operation.
    pub(crate) temp_info: u32,
    pub(crate) status: VmStatus,
}

impl Vm {
    /// Validates `image` and builds a freshly reset interpreter over it
    /// with the default budgets.
    pub fn load(image: Vec<u8>) -> Result<Vm, LoadError> {
        Vm::load_with_config(image, &VmConfig::default())
    }

    pub fn load_with_config(image: Vec<u8>, config: &VmConfig) -> Result<Vm, LoadError> {
        let layout = ImageLayout::parse(&image, config)?;

        let mut globals: Vec<Slot> = Vec::new();
        globals
            .try_reserve_exact(layout.global_count as usize)
            .map_err(|_| LoadError::AllocGlobalAreaFailed)?;
        globals.resize(layout.global_count as usize, Slot::ZERO);

        let mut stack: Vec<Slot> = Vec::new();
        stack
            .try_reserve_exact(config.stack_slots)
            .map_err(|_| LoadError::AllocStackFailed)?;
        stack.resize(config.stack_slots, Slot::ZERO);

        debug!(
            "image loaded: {} constants, {} globals, {} program bytes, {} stack slots",
            layout.const_count,
            layout.global_count,
            layout.program_size,
            config.stack_slots
        );

        Ok(Vm {
            memory: VmMemory {
                image,
                layout,
                globals,
                stack,
            },
            program_counter: 0,
            stack_offset: 0,
            frame: FrameHeader::default(),
            split_op: 0,
            temp_info: 0,
            status: VmStatus::Running,
        })
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    /// Offset of the next instruction fetch into the program region.
    pub fn program_counter(&self) -> u16 {
        self.program_counter
    }

    /// Stack top as a slot offset from the stack base.
    pub fn stack_top(&self) -> u16 {
        self.stack_offset
    }

    /// Reads a live stack slot, `None` at or above the current top.
    pub fn peek(&self, off: u16) -> Option<Slot> {
        if off < self.stack_offset {
            self.memory.stack.get(off as usize).copied()
        } else {
            None
        }
    }

    pub fn global(&self, idx: u16) -> Option<Slot> {
        self.memory.globals.get(idx as usize).copied()
    }

    /// The read-only program region, e.g. for disassembly.
    pub fn program_bytes(&self) -> &[u8] {
        self.memory.program()
    }
}
