//! Instruction decoding and encoding

use super::table::{Dialect, OpcodeTable};
use crate::bits;
use crate::error::{Error, Result};
use crate::formats::common::RecordReader;
use serde::Serialize;
use std::fmt;

/// A decoded operand value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operand {
    pub name: String,
    pub value: u32,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:={}", self.name, self.value)
    }
}

/// A decoded instruction; operands follow template order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Opcode {
    pub id: u8,
    pub name: String,
    pub longname: String,
    pub operands: Vec<Operand>,
}

impl Opcode {
    /// Value of the operand called `name`
    pub fn operand(&self, name: &str) -> Option<u32> {
        self.operands.iter().find(|o| o.name == name).map(|o| o.value)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = if self.longname.is_empty() { &self.name } else { &self.longname };
        f.write_str(label)?;
        if !self.operands.is_empty() {
            f.write_str(" (")?;
            for (i, operand) in self.operands.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{operand}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Instructions up to and including the dialect's sentinel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstructionStream {
    /// Absolute offset of the first instruction
    pub offset: usize,
    pub instructions: Vec<Opcode>,
}

impl InstructionStream {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Opcode> {
        self.instructions.iter()
    }

    /// The terminating instruction
    pub fn terminator(&self) -> Option<&Opcode> {
        self.instructions.last()
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Opcode;
    type IntoIter = std::slice::Iter<'a, Opcode>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Decode one instruction at the reader's position
///
/// # Errors
/// Returns [`Error::UnknownOpcode`] for ids missing from `table`, and
/// [`Error::UnexpectedEof`] if the operand bytes are cut short.
pub fn decode(reader: &mut RecordReader<'_>, table: &OpcodeTable) -> Result<Opcode> {
    let id = reader.read_u8()?;
    let template = table.template(id)?;
    let raw = reader.read_bytes(template.footprint_bytes())?;
    let widths: Vec<u32> = template.widths().collect();
    let values = bits::decode_fields(raw, &widths)?;

    Ok(Opcode {
        id,
        name: template.name.clone(),
        longname: template.longname.clone(),
        operands: template
            .operands
            .iter()
            .zip(values)
            .map(|(t, value)| Operand {
                name: t.name.clone(),
                value,
            })
            .collect(),
    })
}

/// Decode one instruction from the start of `data`, returning it with the
/// number of bytes consumed
///
/// # Errors
/// As [`decode`].
pub fn decode_bytes(data: &[u8], table: &OpcodeTable) -> Result<(Opcode, usize)> {
    let mut reader = RecordReader::new(data);
    let opcode = decode(&mut reader, table)?;
    Ok((opcode, reader.position()))
}

/// Encode an instruction back to bytes with the same template that decodes it
///
/// # Errors
/// Returns [`Error::UnknownOpcode`] if the id has no entry,
/// [`Error::OperandMismatch`] if the operand names differ from the template,
/// and [`Error::ValueOutOfRange`] if a value does not fit its width.
pub fn encode(opcode: &Opcode, table: &OpcodeTable) -> Result<Vec<u8>> {
    let template = table.template(opcode.id)?;
    let mismatch = |message: String| Error::OperandMismatch {
        opcode: template.name.clone(),
        message,
    };

    if opcode.operands.len() != template.operands.len() {
        return Err(mismatch(format!(
            "expected {} operands, got {}",
            template.operands.len(),
            opcode.operands.len()
        )));
    }
    for (expected, actual) in template.operands.iter().zip(&opcode.operands) {
        if expected.name != actual.name {
            return Err(mismatch(format!("expected operand '{}', got '{}'", expected.name, actual.name)));
        }
    }

    let widths: Vec<u32> = template.widths().collect();
    let values: Vec<u32> = opcode.operands.iter().map(|o| o.value).collect();
    let mut out = Vec::with_capacity(1 + template.footprint_bytes());
    out.push(opcode.id);
    out.extend(bits::encode_fields(&values, &widths)?);
    Ok(out)
}

/// Decode instructions until the table's dialect sentinel, inclusive
///
/// # Errors
/// Returns [`Error::UnterminatedStream`] if the buffer ends before the
/// sentinel, or any error from [`decode`].
pub fn decode_stream(reader: &mut RecordReader<'_>, table: &OpcodeTable) -> Result<InstructionStream> {
    let offset = reader.position();
    let sentinel = table.dialect().sentinel();
    let what = match table.dialect() {
        Dialect::FieldScript => "field script stream",
        Dialect::AudioMacro => "audio macro stream",
    };

    let instructions = reader.repeat_until(what, |op: &Opcode| op.id == sentinel, |r| decode(r, table))?;
    tracing::trace!("Decoded {} {} instructions at 0x{offset:X}", instructions.len(), table.dialect().name());
    Ok(InstructionStream { offset, instructions })
}
