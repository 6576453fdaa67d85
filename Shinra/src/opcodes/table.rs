//! Opcode templates and their JSON loader

use crate::bits;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Bytecode dialect an opcode table belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dialect {
    /// Entity scripts inside a field's script section
    FieldScript,
    /// Channel streams inside an AKAO audio macro
    AudioMacro,
}

impl Dialect {
    /// Opcode id that ends an instruction stream
    pub const fn sentinel(self) -> u8 {
        match self {
            Self::FieldScript => 0x00,
            Self::AudioMacro => 0xEE,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::FieldScript => "field script",
            Self::AudioMacro => "audio macro",
        }
    }
}

/// One operand slot of an opcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperandTemplate {
    pub name: String,
    pub description: String,
    /// Width in bits (1-32)
    pub width: u32,
}

/// Layout of one opcode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpcodeTemplate {
    pub id: u8,
    pub name: String,
    pub longname: String,
    pub description: String,
    pub operands: Vec<OperandTemplate>,
}

impl OpcodeTemplate {
    pub fn widths(&self) -> impl Iterator<Item = u32> + '_ {
        self.operands.iter().map(|o| o.width)
    }

    /// Bytes of operand data following the id byte
    pub fn footprint_bytes(&self) -> usize {
        bits::footprint_bytes(self.widths())
    }

    /// Long name when the table has one, short name otherwise
    pub fn display_name(&self) -> &str {
        if self.longname.is_empty() {
            &self.name
        } else {
            &self.longname
        }
    }
}

// JSON layout

#[derive(Deserialize)]
struct RawOpcode {
    id: u32,
    name: String,
    #[serde(default)]
    longname: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    operands: Vec<RawOperand>,
}

#[derive(Deserialize)]
struct RawOperand {
    name: String,
    #[serde(default)]
    description: String,
    size: RawSize,
}

/// Operand width, either a bit count or the older `"BitsInteger(N)"` form
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Bits(u32),
    Legacy(String),
}

impl RawSize {
    fn bits(&self) -> Option<u32> {
        match self {
            Self::Bits(n) => Some(*n),
            Self::Legacy(s) => s
                .trim()
                .strip_prefix("BitsInteger(")
                .and_then(|rest| rest.strip_suffix(')'))
                .and_then(|n| n.trim().parse().ok()),
        }
    }
}

/// Immutable id → template lookup for one dialect
#[derive(Debug, Clone)]
pub struct OpcodeTable {
    dialect: Dialect,
    entries: Vec<Option<OpcodeTemplate>>,
}

impl OpcodeTable {
    /// Build a table, rejecting duplicate ids, duplicate operand names,
    /// empty names and operand widths outside 1..=32.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOpcodeTable`] on the first invalid entry.
    pub fn new(dialect: Dialect, templates: impl IntoIterator<Item = OpcodeTemplate>) -> Result<Self> {
        let mut entries: Vec<Option<OpcodeTemplate>> = vec![None; 256];

        for template in templates {
            let invalid = |message: String| Error::InvalidOpcodeTable {
                id: u32::from(template.id),
                message,
            };

            if template.name.is_empty() {
                return Err(invalid("empty opcode name".into()));
            }
            let mut seen = HashSet::new();
            for operand in &template.operands {
                if operand.name.is_empty() {
                    return Err(invalid("empty operand name".into()));
                }
                if !seen.insert(operand.name.as_str()) {
                    return Err(invalid(format!("duplicate operand '{}'", operand.name)));
                }
                if operand.width == 0 || operand.width > bits::MAX_WIDTH {
                    return Err(invalid(format!(
                        "operand '{}' has width {} (supported: 1-32)",
                        operand.name, operand.width
                    )));
                }
            }

            let slot = &mut entries[template.id as usize];
            if slot.is_some() {
                return Err(invalid("duplicate opcode id".into()));
            }
            *slot = Some(template);
        }

        let table = Self { dialect, entries };
        tracing::debug!("Loaded {} {} opcodes", table.len(), dialect.name());
        Ok(table)
    }

    /// Parse a table from its JSON form
    ///
    /// # Errors
    /// Returns [`Error::OpcodeTableJson`] for malformed JSON and
    /// [`Error::InvalidOpcodeTable`] for entries that fail validation.
    pub fn from_json_str(dialect: Dialect, json: &str) -> Result<Self> {
        let raw: Vec<RawOpcode> = serde_json::from_str(json)?;

        let mut templates = Vec::with_capacity(raw.len());
        for item in raw {
            let id = u8::try_from(item.id).map_err(|_| Error::InvalidOpcodeTable {
                id: item.id,
                message: "id out of range 0-255".into(),
            })?;

            let mut operands = Vec::with_capacity(item.operands.len());
            for op in item.operands {
                let width = op.size.bits().ok_or_else(|| Error::InvalidOpcodeTable {
                    id: item.id,
                    message: format!("operand '{}' has an unreadable size", op.name),
                })?;
                operands.push(OperandTemplate {
                    name: op.name,
                    description: op.description,
                    width,
                });
            }

            templates.push(OpcodeTemplate {
                id,
                name: item.name,
                longname: item.longname,
                description: item.description,
                operands,
            });
        }

        Self::new(dialect, templates)
    }

    /// Load a table from a JSON file
    ///
    /// # Errors
    /// Returns [`Error::Io`] if the file cannot be read, otherwise as
    /// [`from_json_str`](Self::from_json_str).
    pub fn from_path<P: AsRef<Path>>(dialect: Dialect, path: P) -> Result<Self> {
        let mut file = File::open(path.as_ref())?;
        let mut json = String::new();
        file.read_to_string(&mut json)?;
        tracing::debug!("Reading {} opcode table from {}", dialect.name(), path.as_ref().display());
        Self::from_json_str(dialect, &json)
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn get(&self, id: u8) -> Option<&OpcodeTemplate> {
        self.entries[id as usize].as_ref()
    }

    /// # Errors
    /// Returns [`Error::UnknownOpcode`] if `id` has no entry.
    pub fn template(&self, id: u8) -> Result<&OpcodeTemplate> {
        self.get(id).ok_or(Error::UnknownOpcode(id))
    }

    /// # Errors
    /// Returns [`Error::UnknownOpcode`] if `id` has no entry.
    pub fn footprint_bytes(&self, id: u8) -> Result<usize> {
        self.template(id).map(OpcodeTemplate::footprint_bytes)
    }

    /// Templates in id order
    pub fn iter(&self) -> impl Iterator<Item = &OpcodeTemplate> {
        self.entries.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Both dialect tables, loaded once and shared
#[derive(Debug, Clone)]
pub struct OpcodeTables {
    pub field: Arc<OpcodeTable>,
    pub audio: Arc<OpcodeTable>,
}

impl OpcodeTables {
    /// # Errors
    /// Returns [`Error::InvalidOpcodeTable`] if a table was loaded for the
    /// wrong dialect.
    pub fn new(field: OpcodeTable, audio: OpcodeTable) -> Result<Self> {
        for (table, expected) in [(&field, Dialect::FieldScript), (&audio, Dialect::AudioMacro)] {
            if table.dialect() != expected {
                return Err(Error::InvalidOpcodeTable {
                    id: 0,
                    message: format!("{} table supplied where {} was expected", table.dialect().name(), expected.name()),
                });
            }
        }
        Ok(Self {
            field: Arc::new(field),
            audio: Arc::new(audio),
        })
    }

    /// Load both tables from JSON files
    ///
    /// # Errors
    /// As [`OpcodeTable::from_path`].
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(field_path: P, audio_path: Q) -> Result<Self> {
        Self::new(
            OpcodeTable::from_path(Dialect::FieldScript, field_path)?,
            OpcodeTable::from_path(Dialect::AudioMacro, audio_path)?,
        )
    }

    pub fn get(&self, dialect: Dialect) -> &OpcodeTable {
        match dialect {
            Dialect::FieldScript => &self.field,
            Dialect::AudioMacro => &self.audio,
        }
    }
}
