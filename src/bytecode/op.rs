//! The instruction set.
//!
//! Opcode byte values are fixed by the host compiler that produces program
//! images; they are part of the wire format and must not be renumbered.
//! Every instruction is one opcode byte followed by zero or more
//! little-endian operand bytes (see [`describe`]).

// =============================================================================
// Control flow
// =============================================================================

pub const OP_NOP: u8 = 0x00;
pub const OP_HALT: u8 = 0x01;
pub const OP_JMP: u8 = 0x02;
pub const OP_JZ: u8 = 0x03;
pub const OP_JNZ: u8 = 0x04;
pub const OP_CALL: u8 = 0x05;
pub const OP_ENTER: u8 = 0x06;
pub const OP_RET: u8 = 0x07;
pub const OP_RET0: u8 = 0x08;

// =============================================================================
// Stack and data motion
// =============================================================================

pub const OP_LOADK: u8 = 0x11;
pub const OP_LOADG: u8 = 0x12;
pub const OP_LOADL: u8 = 0x13;
pub const OP_IMMI: u8 = 0x14;
pub const OP_IMMF: u8 = 0x15;
pub const OP_POP: u8 = 0x16;
pub const OP_STORL: u8 = 0x17;
pub const OP_STORG: u8 = 0x18;

// =============================================================================
// Integer arithmetic
// =============================================================================

pub const OP_IADD: u8 = 0x21;
pub const OP_ISUB: u8 = 0x22;
pub const OP_IMUL: u8 = 0x23;
pub const OP_IDIV: u8 = 0x24;
pub const OP_IMOD: u8 = 0x25;
pub const OP_INEG: u8 = 0x26;

// =============================================================================
// Float arithmetic
// =============================================================================

pub const OP_FADD: u8 = 0x31;
pub const OP_FSUB: u8 = 0x32;
pub const OP_FMUL: u8 = 0x33;
pub const OP_FDIV: u8 = 0x34;
pub const OP_FNEG: u8 = 0x35;

// =============================================================================
// Logic
// =============================================================================

pub const OP_LNOT: u8 = 0x41;
pub const OP_LAND: u8 = 0x42;
pub const OP_LOR: u8 = 0x43;

// =============================================================================
// Bitwise
// =============================================================================

pub const OP_BAND: u8 = 0x51;
pub const OP_BOR: u8 = 0x52;
pub const OP_BXOR: u8 = 0x53;
pub const OP_BNOT: u8 = 0x54;
pub const OP_SHL: u8 = 0x55;
pub const OP_SHR: u8 = 0x56;

// =============================================================================
// Comparison (integer, then float; each pushes integer 0/1)
// =============================================================================

pub const OP_IEQ: u8 = 0x61;
pub const OP_INE: u8 = 0x62;
pub const OP_IGT: u8 = 0x63;
pub const OP_ILT: u8 = 0x64;
pub const OP_IGE: u8 = 0x65;
pub const OP_ILE: u8 = 0x66;

pub const OP_FEQ: u8 = 0x71;
pub const OP_FNE: u8 = 0x72;
pub const OP_FGT: u8 = 0x73;
pub const OP_FLT: u8 = 0x74;
pub const OP_FGE: u8 = 0x75;
pub const OP_FLE: u8 = 0x76;

// =============================================================================
// Conversion
// =============================================================================

pub const OP_I2F: u8 = 0x81;
pub const OP_F2I: u8 = 0x82;

// =============================================================================
// System calls
// =============================================================================

pub const OP_DELAY: u8 = 0x91;
pub const OP_RST: u8 = 0x92;
pub const OP_WAIT: u8 = 0x93;
pub const OP_WAITJ: u8 = 0x94;
pub const OP_MOVJ: u8 = 0x95;
pub const OP_SETJ: u8 = 0x96;
pub const OP_READJ: u8 = 0x97;
pub const OP_MOVOC: u8 = 0x98;
pub const OP_SETOC: u8 = 0x99;
pub const OP_MOVJC: u8 = 0x9A;
pub const OP_SETJC: u8 = 0x9B;
pub const OP_GRIPO: u8 = 0x9C;
pub const OP_GRIPC: u8 = 0x9D;
pub const OP_SETJSPD: u8 = 0x9E;
pub const OP_OLEDI: u8 = 0xA1;

// Debug print: pops one operand. The firmware build discards the value but
// the pop must still happen to keep the stack balanced.
pub const OP_PRINT: u8 = 0xB1;

/// Operand bytes following an opcode, for linear decoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operands {
    None,
    U8,
    U16,
    /// u16 address followed by u8 argument count (CALL only).
    AddrArgc,
    /// 4 raw bytes pushed as-is (IMMI / IMMF).
    Imm32,
}

/// Mnemonic and operand layout for a known opcode, `None` otherwise.
pub fn describe(op: u8) -> Option<(&'static str, Operands)> {
    use Operands::*;
    let d = match op {
        OP_NOP => ("NOP", None),
        OP_HALT => ("HALT", None),
        OP_JMP => ("JMP", U16),
        OP_JZ => ("JZ", U16),
        OP_JNZ => ("JNZ", U16),
        OP_CALL => ("CALL", AddrArgc),
        OP_ENTER => ("ENTER", U8),
        OP_RET => ("RET", None),
        OP_RET0 => ("RET0", None),

        OP_LOADK => ("LOADK", U16),
        OP_LOADG => ("LOADG", U16),
        OP_LOADL => ("LOADL", U8),
        OP_IMMI => ("IMMI", Imm32),
        OP_IMMF => ("IMMF", Imm32),
        OP_POP => ("POP", None),
        OP_STORL => ("STORL", U8),
        OP_STORG => ("STORG", U16),

        OP_IADD => ("IADD", None),
        OP_ISUB => ("ISUB", None),
        OP_IMUL => ("IMUL", None),
        OP_IDIV => ("IDIV", None),
        OP_IMOD => ("IMOD", None),
        OP_INEG => ("INEG", None),
        OP_FADD => ("FADD", None),
        OP_FSUB => ("FSUB", None),
        OP_FMUL => ("FMUL", None),
        OP_FDIV => ("FDIV", None),
        OP_FNEG => ("FNEG", None),

        OP_LNOT => ("LNOT", None),
        OP_LAND => ("LAND", None),
        OP_LOR => ("LOR", None),
        OP_BAND => ("BAND", None),
        OP_BOR => ("BOR", None),
        OP_BXOR => ("BXOR", None),
        OP_BNOT => ("BNOT", None),
        OP_SHL => ("SHL", None),
        OP_SHR => ("SHR", None),

        OP_IEQ => ("IEQ", None),
        OP_INE => ("INE", None),
        OP_IGT => ("IGT", None),
        OP_ILT => ("ILT", None),
        OP_IGE => ("IGE", None),
        OP_ILE => ("ILE", None),
        OP_FEQ => ("FEQ", None),
        OP_FNE => ("FNE", None),
        OP_FGT => ("FGT", None),
        OP_FLT => ("FLT", None),
        OP_FGE => ("FGE", None),
        OP_FLE => ("FLE", None),

        OP_I2F => ("I2F", None),
        OP_F2I => ("F2I", None),

        OP_DELAY => ("DELAY", None),
        OP_RST => ("RST", None),
        OP_WAIT => ("WAIT", None),
        OP_WAITJ => ("WAITJ", None),
        OP_MOVJ => ("MOVJ", None),
        OP_SETJ => ("SETJ", None),
        OP_READJ => ("READJ", None),
        OP_MOVOC => ("MOVOC", None),
        OP_SETOC => ("SETOC", None),
        OP_MOVJC => ("MOVJC", None),
        OP_SETJC => ("SETJC", None),
        OP_GRIPO => ("GRIPO", None),
        OP_GRIPC => ("GRIPC", None),
        OP_SETJSPD => ("SETJSPD", None),
        OP_OLEDI => ("OLEDI", None),
        OP_PRINT => ("PRINT", None),

        _ => return Option::None,
    };
    Some(d)
}
