//! Table-driven bytecode for field scripts and AKAO audio macros
//!
//! Opcode layouts are runtime data: each dialect's table is loaded from JSON,
//! validated once and then shared read-only. Operands are bit fields packed
//! MSB-first after the one-byte id.

mod decode;
mod table;

pub use decode::{InstructionStream, Opcode, Operand, decode, decode_bytes, decode_stream, encode};
pub use table::{Dialect, OpcodeTable, OpcodeTables, OpcodeTemplate, OperandTemplate};
