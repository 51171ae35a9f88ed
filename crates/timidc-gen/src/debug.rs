//! Human-readable renderings of compiled chunks, for `--dev` tracing.

use std::fmt::Write;

use crate::chunk::Chunk;
use crate::opcode::OpCode;

/// Renders the disassembly of a chunk.
pub fn disassemble(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", name);

    let mut offset = 0;
    while offset < chunk.code_len() {
        offset = disassemble_instruction(chunk, offset, &mut out);
    }
    out
}

/// Renders one instruction and returns the offset of the next.
fn disassemble_instruction(chunk: &Chunk, offset: usize, out: &mut String) -> usize {
    let _ = write!(out, "{:04} ", offset);

    let byte = chunk.code()[offset];
    let opcode = match OpCode::try_from(byte) {
        Ok(opcode) => opcode,
        Err(_) => {
            let _ = writeln!(out, "??           0x{:02x}", byte);
            return offset + 1;
        },
    };

    match opcode {
        OpCode::Constant | OpCode::ConstantLong => constant_instruction(chunk, opcode, offset, out),
        OpCode::JumpIfFls | OpCode::Jump | OpCode::Loop => {
            distance_instruction(chunk, opcode, offset, out)
        },
        OpCode::GetLocal | OpCode::SetLocal => slot_instruction(chunk, opcode, offset, out),
        OpCode::DefineGlobal | OpCode::GetGlobal | OpCode::SetGlobal => {
            global_instruction(chunk, opcode, offset, out)
        },
        _ => {
            let _ = writeln!(out, "{}", opcode.mnemonic());
            offset + 1
        },
    }
}

/// `CONSTANT idx 'value'` with a 1- or 3-byte operand.
fn constant_instruction(chunk: &Chunk, opcode: OpCode, offset: usize, out: &mut String) -> usize {
    let (index, next) = read_pool_index(chunk, opcode, offset);
    match chunk.constants().get(index) {
        Some(value) => {
            let _ = writeln!(out, "{:<16} {:4} '{}'", opcode.mnemonic(), index, value);
        },
        None => {
            let _ = writeln!(out, "{:<16} {:4} <bad index>", opcode.mnemonic(), index);
        },
    }
    next
}

/// `JUMP dist -> target`; `LOOP` distances run backwards.
fn distance_instruction(chunk: &Chunk, opcode: OpCode, offset: usize, out: &mut String) -> usize {
    let low = chunk.code().get(offset + 1).copied().unwrap_or(0) as usize;
    let high = chunk.code().get(offset + 2).copied().unwrap_or(0) as usize;
    let distance = low | (high << 8);

    let after = offset + 3;
    let target = if opcode == OpCode::Loop {
        after.wrapping_sub(distance)
    } else {
        after + distance
    };
    let _ = writeln!(out, "{:<16} {:4} -> {:04}", opcode.mnemonic(), distance, target);
    after
}

/// `GET_LOCAL slot` with a 1-byte operand.
fn slot_instruction(chunk: &Chunk, opcode: OpCode, offset: usize, out: &mut String) -> usize {
    let slot = chunk.code().get(offset + 1).copied().unwrap_or(0);
    let _ = writeln!(out, "{:<16} {:4}", opcode.mnemonic(), slot);
    offset + 2
}

/// Global accesses carry a trailing CONSTANT / CONSTANT_LONG naming the
/// variable.
fn global_instruction(chunk: &Chunk, opcode: OpCode, offset: usize, out: &mut String) -> usize {
    let prefix = chunk.code().get(offset + 1).copied().unwrap_or(0);
    let Ok(prefix_op) = OpCode::try_from(prefix) else {
        let _ = writeln!(out, "{:<16} <bad operand>", opcode.mnemonic());
        return offset + 2;
    };

    let (index, next) = read_pool_index(chunk, prefix_op, offset + 1);
    match chunk.constants().get(index) {
        Some(value) => {
            let _ = writeln!(out, "{:<16} {:4} '{}'", opcode.mnemonic(), index, value);
        },
        None => {
            let _ = writeln!(out, "{:<16} {:4} <bad index>", opcode.mnemonic(), index);
        },
    }
    next
}

/// Decodes the operand of a CONSTANT / CONSTANT_LONG at `offset`.
///
/// Returns the pool index and the offset just past the operand.
fn read_pool_index(chunk: &Chunk, opcode: OpCode, offset: usize) -> (usize, usize) {
    if opcode == OpCode::ConstantLong {
        let b0 = chunk.code().get(offset + 1).copied().unwrap_or(0) as usize;
        let b1 = chunk.code().get(offset + 2).copied().unwrap_or(0) as usize;
        let b2 = chunk.code().get(offset + 3).copied().unwrap_or(0) as usize;
        (b0 | (b1 << 8) | (b2 << 16), offset + 4)
    } else {
        let index = chunk.code().get(offset + 1).copied().unwrap_or(0) as usize;
        (index, offset + 2)
    }
}

/// Renders a hex dump of a serialised image, eight bytes per row.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for row in bytes.chunks(8) {
        let rendered: Vec<String> = row.iter().map(|byte| format!("{:02x}", byte)).collect();
        let _ = writeln!(out, "{}", rendered.join(" "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_disassemble_simple_instructions() {
        let mut chunk = Chunk::new();
        chunk.emit_op(OpCode::One);
        chunk.emit_op(OpCode::Two);
        chunk.emit_op(OpCode::Add);
        chunk.emit_op(OpCode::Return);

        let listing = disassemble(&chunk, "test");
        assert!(listing.contains("== test =="));
        assert!(listing.contains("OP_1"));
        assert!(listing.contains("OP_ADD"));
        assert!(listing.contains("OP_RETURN"));
    }

    #[test]
    fn test_disassemble_constant_operand() {
        let mut chunk = Chunk::new();
        chunk.emit_constant(Value::Int(42));
        chunk.emit_op(OpCode::Return);

        let listing = disassemble(&chunk, "test");
        assert!(listing.contains("OP_CONSTANT"));
        assert!(listing.contains("'42'"));
    }

    #[test]
    fn test_disassemble_jump_target() {
        let mut chunk = Chunk::new();
        let jump = chunk.emit_jump(OpCode::Jump);
        chunk.emit_op(OpCode::Nop);
        chunk.patch_jump(jump).expect("fits");
        chunk.emit_op(OpCode::Return);

        let listing = disassemble(&chunk, "test");
        // Jump over one byte: distance 1, landing at offset 4
        assert!(listing.contains("OP_JUMP"));
        assert!(listing.contains("1 -> 0004"));
    }

    #[test]
    fn test_hex_dump_rows() {
        let dump = hex_dump(&[0xFA, 0xCC, 0, 1, 2, 3, 4, 5, 6]);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "fa cc 00 01 02 03 04 05");
        assert_eq!(lines[1], "06");
    }
}
