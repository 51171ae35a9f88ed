//! timidc-gen - Bytecode back end for the Timid compiler.
//!
//! Walks the AST from `timidc-par` and emits a [`Chunk`]: a flat code
//! stream plus a constant pool. The numeric opcode and value-tag values
//! are part of the bytecode file format and must never change; see
//! [`opcode`] and [`value`] for the pinned tables.
//!
//! The [`writer`] module serialises a finished chunk to disk behind the
//! `0xFA 0xCC` magic, and [`debug`] renders human-readable disassembly
//! for `--dev` tracing.

pub mod chunk;
pub mod compiler;
pub mod debug;
pub mod opcode;
pub mod value;
pub mod writer;

pub use chunk::{Chunk, ChunkError};
pub use compiler::Compiler;
pub use opcode::OpCode;
pub use value::Value;
