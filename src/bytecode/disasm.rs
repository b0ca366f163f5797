use std::fmt::Write;

use crate::bytecode::{Chunk, OpCode};

/// Print disassembly of a chunk
pub fn print_chunk(chunk: &Chunk, name: &str) {
    print!("{}", disassemble_chunk(chunk, name));
}

/// Render every instruction in `chunk` under a `== name ==` header.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", name);

    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }

    out
}

/// Render the instruction at `offset` as one line and return the offset of
/// the next instruction.
///
/// Format: `OOOO LLLL NAME [operand 'constant']`, with the line column shown
/// as `   |` when it repeats the previous instruction's line.
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let _ = write!(out, "{:04} ", offset);

    let line = chunk.line_at(offset);
    if offset > 0 && line == chunk.line_at(offset - 1) {
        out.push_str("   | ");
    } else {
        let _ = write!(out, "{:4} ", line.unwrap_or(0));
    }

    let byte = chunk.code()[offset];
    match OpCode::try_from(byte) {
        Ok(OpCode::Constant) => constant_instruction(chunk, offset, out),
        Ok(op) => simple_instruction(op, offset, out),
        Err(unknown) => {
            let _ = writeln!(out, "Unknown opcode {}", unknown);
            offset + 1
        }
    }
}

fn simple_instruction(op: OpCode, offset: usize, out: &mut String) -> usize {
    let _ = writeln!(out, "{}", op.name());
    offset + op.width()
}

fn constant_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let name = OpCode::Constant.name();

    let Some(&index) = chunk.code().get(offset + 1) else {
        let _ = writeln!(out, "{:<16} <missing operand>", name);
        return chunk.len();
    };

    match chunk.constant(index) {
        Some(value) => {
            let _ = writeln!(out, "{:<16} {:4} '{}'", name, index, value);
        }
        None => {
            let _ = writeln!(out, "{:<16} {:4} <out of range>", name, index);
        }
    }

    offset + OpCode::Constant.width()
}
