//! The program image wire format.
//!
//! An image is a single binary blob produced by the host compiler:
//!
//! ```text
//! [total_size: u32][const_count: u16][const_count * 4 bytes]
//! [global_count: u16][program bytes][md5 digest: 16 bytes]
//! ```
//!
//! All size fields are little-endian. `total_size` counts the whole blob
//! including the trailing digest; the digest covers every byte except
//! itself. [`ImageLayout::parse`] is the sole validator of this format on
//! the device side and [`ImageBuilder`] the producer on the host side.

use md5::{Digest, Md5};
use thiserror::Error;

use crate::bytecode::op;
use crate::bytecode::slot::Slot;
use crate::runtime::vm::VmConfig;

pub const SLOT_SIZE: usize = 4;
pub const DIGEST_SIZE: usize = 16;

/// total_size + const_count + global_count + digest, with empty pool and
/// program. Anything shorter cannot even hold the header.
pub const MIN_IMAGE_SIZE: usize = 4 + 2 + 2 + DIGEST_SIZE;

/// Why an image was rejected at load time.
///
/// Load failures are reported once, before an interpreter exists; they are
/// never visible as a running-interpreter status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("file damaged (size or digest mismatch)")]
    FileDamaged,
    #[error("constant area exceeds the pool budget")]
    ConstAreaTooLarge,
    #[error("constant area does not fit inside the image")]
    InvalidConstAreaSize,
    #[error("global area exceeds the pool budget")]
    GlobalAreaTooLarge,
    #[error("program area exceeds the 16-bit address range")]
    ProgramAreaTooLarge,
    #[error("allocating the global area failed")]
    AllocGlobalAreaFailed,
    #[error("allocating the stack area failed")]
    AllocStackFailed,
}

/// Region partition of a validated image.
///
/// Offsets index into the caller's image buffer; constants and program are
/// read in place, never copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLayout {
    pub const_off: usize,
    pub const_count: u16,
    pub global_count: u16,
    pub program_off: usize,
    pub program_size: u16,
}

impl ImageLayout {
    /// Validates an image blob and carves out its regions.
    pub fn parse(bytes: &[u8], config: &VmConfig) -> Result<ImageLayout, LoadError> {
        if bytes.len() < MIN_IMAGE_SIZE {
            return Err(LoadError::FileDamaged);
        }

        let total_size = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if total_size != bytes.len() {
            return Err(LoadError::FileDamaged);
        }

        let payload_end = total_size - DIGEST_SIZE;
        let digest = Md5::digest(&bytes[..payload_end]);
        if digest.as_slice() != &bytes[payload_end..] {
            return Err(LoadError::FileDamaged);
        }

        let const_count = u16::from_le_bytes([bytes[4], bytes[5]]);
        let const_bytes = const_count as usize * SLOT_SIZE;
        if const_bytes > config.const_area_max {
            return Err(LoadError::ConstAreaTooLarge);
        }
        // Header + pool + global_count field must leave room for the digest.
        if 4 + 2 + const_bytes + 2 + DIGEST_SIZE > total_size {
            return Err(LoadError::InvalidConstAreaSize);
        }

        let const_off = 6;
        let global_field_off = const_off + const_bytes;
        let global_count = u16::from_le_bytes([bytes[global_field_off], bytes[global_field_off + 1]]);
        if global_count as usize * SLOT_SIZE > config.global_area_max {
            return Err(LoadError::GlobalAreaTooLarge);
        }

        let program_off = global_field_off + 2;
        let program_size = payload_end - program_off;
        if program_size > u16::MAX as usize {
            return Err(LoadError::ProgramAreaTooLarge);
        }

        Ok(ImageLayout {
            const_off,
            const_count,
            global_count,
            program_off,
            program_size: program_size as u16,
        })
    }
}

/// Host-side image packaging.
///
/// Collects constants, a global count and emitted program bytes, then
/// writes the header and trailing digest. Jump targets that are not known
/// yet can be emitted as placeholders and patched via [`ImageBuilder::patch_u16`].
#[derive(Debug, Default, Clone)]
pub struct ImageBuilder {
    constants: Vec<Slot>,
    global_count: u16,
    program: Vec<u8>,
}

impl ImageBuilder {
    pub fn new() -> ImageBuilder {
        ImageBuilder::default()
    }

    /// Appends a constant and returns its pool index.
    pub fn push_const(&mut self, value: Slot) -> u16 {
        self.constants.push(value);
        (self.constants.len() - 1) as u16
    }

    pub fn set_global_count(&mut self, count: u16) {
        self.global_count = count;
    }

    /// Current program offset; the address the next emitted byte will get.
    pub fn here(&self) -> u16 {
        self.program.len() as u16
    }

    pub fn op(&mut self, opcode: u8) {
        self.program.push(opcode);
    }

    pub fn op_u8(&mut self, opcode: u8, operand: u8) {
        self.program.push(opcode);
        self.program.push(operand);
    }

    pub fn op_u16(&mut self, opcode: u8, operand: u16) {
        self.program.push(opcode);
        self.program.extend_from_slice(&operand.to_le_bytes());
    }

    /// CALL with target address and argument count.
    pub fn call(&mut self, addr: u16, argc: u8) {
        self.program.push(op::OP_CALL);
        self.program.extend_from_slice(&addr.to_le_bytes());
        self.program.push(argc);
    }

    pub fn imm_i32(&mut self, value: i32) {
        self.program.push(op::OP_IMMI);
        self.program.extend_from_slice(&value.to_le_bytes());
    }

    pub fn imm_f32(&mut self, value: f32) {
        self.program.push(op::OP_IMMF);
        self.program.extend_from_slice(&value.to_le_bytes());
    }

    /// Overwrites a previously emitted u16 operand (jump back-patching).
    pub fn patch_u16(&mut self, at: u16, value: u16) {
        let at = at as usize;
        self.program[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Packages the image: header, constant pool, global count, program,
    /// trailing digest.
    pub fn build(&self) -> Vec<u8> {
        let total = MIN_IMAGE_SIZE + self.constants.len() * SLOT_SIZE + self.program.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(self.constants.len() as u16).to_le_bytes());
        for c in &self.constants {
            out.extend_from_slice(&c.to_le_bytes());
        }
        out.extend_from_slice(&self.global_count.to_le_bytes());
        out.extend_from_slice(&self.program);
        let digest = Md5::digest(&out);
        out.extend_from_slice(&digest);
        out
    }
}
