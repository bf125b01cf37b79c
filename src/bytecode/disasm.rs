//! Disassembler for the program region of an image.

use std::fmt::Write;

use crate::bytecode::op::{self, Operands};

/// Render a linear listing of `program`, one instruction per line.
///
/// Immediates are shown under both interpretations since the bytes carry no
/// tag. Unknown opcode bytes become raw data lines and decoding continues
/// at the next byte, so a corrupt region still produces a readable dump.
pub fn disassemble(program: &[u8]) -> String {
    let mut out = String::new();
    let mut pc = 0usize;

    while pc < program.len() {
        let opcode = program[pc];
        let _ = write!(out, "{:04x}  ", pc);

        let Some((mnemonic, operands)) = op::describe(opcode) else {
            let _ = writeln!(out, "db 0x{:02x}", opcode);
            pc += 1;
            continue;
        };

        match operands {
            Operands::None => {
                let _ = writeln!(out, "{}", mnemonic);
                pc += 1;
            }
            Operands::U8 => match program.get(pc + 1) {
                Some(&b) => {
                    let _ = writeln!(out, "{} {}", mnemonic, b);
                    pc += 2;
                }
                None => {
                    let _ = writeln!(out, "{} <truncated>", mnemonic);
                    pc = program.len();
                }
            },
            Operands::U16 => match read_u16(program, pc + 1) {
                Some(v) => {
                    let _ = writeln!(out, "{} 0x{:04x}", mnemonic, v);
                    pc += 3;
                }
                None => {
                    let _ = writeln!(out, "{} <truncated>", mnemonic);
                    pc = program.len();
                }
            },
            Operands::AddrArgc => {
                match (read_u16(program, pc + 1), program.get(pc + 3)) {
                    (Some(addr), Some(&argc)) => {
                        let _ = writeln!(out, "{} 0x{:04x}, {}", mnemonic, addr, argc);
                        pc += 4;
                    }
                    _ => {
                        let _ = writeln!(out, "{} <truncated>", mnemonic);
                        pc = program.len();
                    }
                }
            }
            Operands::Imm32 => match read_u32(program, pc + 1) {
                Some(raw) => {
                    let _ = writeln!(
                        out,
                        "{} {} ({})",
                        mnemonic,
                        raw as i32,
                        f32::from_bits(raw)
                    );
                    pc += 5;
                }
                None => {
                    let _ = writeln!(out, "{} <truncated>", mnemonic);
                    pc = program.len();
                }
            },
        }
    }

    out
}

fn read_u16(program: &[u8], at: usize) -> Option<u16> {
    let bytes = program.get(at..at + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(program: &[u8], at: usize) -> Option<u32> {
    let bytes = program.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
