//! Field script section: entities, their script slots, audio macros and dialogs

use crate::error::Result;
use crate::formats::akao::{AudioMacro, read_akao};
use crate::formats::common::RecordReader;
use crate::formats::text::read_text;
use crate::opcodes::{InstructionStream, OpcodeTables, decode_stream};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Script slots per entity
pub const SLOTS_PER_ENTITY: usize = 32;

const NAME_LEN: usize = 8;

/// One entity slot. Slots that point at the same offset share one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityScript {
    /// Offset from the script section start
    pub offset: u16,
    pub stream: Arc<InstructionStream>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub name: String,
    /// Always [`SLOTS_PER_ENTITY`] entries
    pub scripts: Vec<EntityScript>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Script {
    pub version: u16,
    pub model_count: u8,
    pub scale: u16,
    pub creator: String,
    pub name: String,
    pub entities: Vec<Entity>,
    pub audio_macros: Vec<AudioMacro>,
    pub dialogs: Vec<String>,
}

impl Script {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }
}

/// Decode a script section at the reader's position
///
/// # Errors
/// Fails if any pointer leaves the buffer, a stream is unterminated, or an
/// opcode is missing from `tables`.
pub fn read_script(reader: &mut RecordReader<'_>, tables: &OpcodeTables) -> Result<Script> {
    reader.with_anchor("script", |r| {
        let version = r.read_u16()?;
        let entity_count = r.read_u8()? as usize;
        let model_count = r.read_u8()?;
        let dialogs_offset = r.read_u16()?;
        let akao_count = r.read_u16()? as usize;
        let scale = r.read_u16()?;
        r.skip(6)?;
        let creator = r.read_padded_string(NAME_LEN)?;
        let name = r.read_padded_string(NAME_LEN)?;
        let entity_names = r.array(entity_count, |r| r.read_padded_string(NAME_LEN))?;

        let audio_macros = r.array(akao_count, |r| {
            let offset = r.read_u32()? as usize;
            r.follow("script", offset, |r| read_akao(r, &tables.audio))
        })?;

        let mut streams: HashMap<u16, Arc<InstructionStream>> = HashMap::new();
        let mut entities = Vec::with_capacity(entity_count);
        for entity_name in entity_names {
            let scripts = r.array(SLOTS_PER_ENTITY, |r| {
                let offset = r.read_u16()?;
                let stream = match streams.get(&offset) {
                    Some(stream) => Arc::clone(stream),
                    None => {
                        let stream = Arc::new(r.follow("script", usize::from(offset), |r| {
                            decode_stream(r, &tables.field)
                        })?);
                        streams.insert(offset, Arc::clone(&stream));
                        stream
                    }
                };
                Ok(EntityScript { offset, stream })
            })?;
            entities.push(Entity {
                name: entity_name,
                scripts,
            });
        }

        let dialogs = r.follow("script", usize::from(dialogs_offset), read_dialogs)?;

        tracing::debug!(
            "Script '{name}' by '{creator}': {} entities, {} streams, {} audio macros, {} dialogs",
            entities.len(),
            streams.len(),
            audio_macros.len(),
            dialogs.len()
        );

        Ok(Script {
            version,
            model_count,
            scale,
            creator,
            name,
            entities,
            audio_macros,
            dialogs,
        })
    })
}

/// Dialog table: u16 count, u16 offsets from the table start, then strings
fn read_dialogs(reader: &mut RecordReader<'_>) -> Result<Vec<String>> {
    reader.with_anchor("dialogs", |r| {
        let count = r.read_u16()? as usize;
        let offsets = r.array(count, RecordReader::read_u16)?;
        offsets
            .into_iter()
            .map(|offset| r.follow("dialogs", usize::from(offset), read_text))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::{Dialect, OpcodeTable};
    use pretty_assertions::assert_eq;

    fn tables() -> OpcodeTables {
        let field = OpcodeTable::from_json_str(
            Dialect::FieldScript,
            r#"[{"id": 0, "name": "RET"},
                {"id": 16, "name": "JMPF", "operands": [{"name": "offset", "size": 8}]}]"#,
        )
        .unwrap();
        let audio = OpcodeTable::from_json_str(Dialect::AudioMacro, r#"[{"id": 238, "name": "END"}]"#).unwrap();
        OpcodeTables::new(field, audio).unwrap()
    }

    fn padded(name: &str) -> Vec<u8> {
        let mut out = name.as_bytes().to_vec();
        out.resize(NAME_LEN, 0);
        out
    }

    /// One entity, no audio macros, two streams and two dialogs
    fn script_bytes(prefix: usize) -> Vec<u8> {
        let mut data = vec![0xCC; prefix];
        data.extend(0x0502u16.to_le_bytes());
        data.extend([1, 3]);
        data.extend(108u16.to_le_bytes());
        data.extend(0u16.to_le_bytes());
        data.extend(512u16.to_le_bytes());
        data.extend([0; 6]);
        data.extend(padded("sqex"));
        data.extend(padded("md1_1"));
        data.extend(padded("cloud"));
        data.extend(104u16.to_le_bytes());
        for _ in 1..SLOTS_PER_ENTITY {
            data.extend(107u16.to_le_bytes());
        }
        data.extend([0x10, 0x05, 0x00]);
        data.push(0x00);
        // dialog table at 108
        data.extend(2u16.to_le_bytes());
        data.extend(6u16.to_le_bytes());
        data.extend(9u16.to_le_bytes());
        data.extend([0x28, 0x49, 0xFF]);
        data.extend([0xEA, 0x01, 0xFF]);
        data
    }

    #[test]
    fn test_script_header_and_dialogs() {
        let data = script_bytes(0);
        let script = read_script(&mut RecordReader::new(&data), &tables()).unwrap();

        assert_eq!(script.version, 0x0502);
        assert_eq!(script.model_count, 3);
        assert_eq!(script.scale, 512);
        assert_eq!(script.creator, "sqex");
        assert_eq!(script.name, "md1_1");
        assert_eq!(script.dialogs, vec!["Hi".to_string(), "{CLOUD}!".to_string()]);
        assert!(script.audio_macros.is_empty());
    }

    #[test]
    fn test_offsets_relative_to_section_start() {
        let data = script_bytes(20);
        let mut reader = RecordReader::new(&data);
        reader.skip(20).unwrap();
        let script = read_script(&mut reader, &tables()).unwrap();

        let cloud = script.entity("cloud").unwrap();
        assert_eq!(cloud.scripts.len(), SLOTS_PER_ENTITY);
        assert_eq!(cloud.scripts[0].stream.offset, 124);
        assert_eq!(cloud.scripts[0].stream.len(), 2);
        assert_eq!(script.dialogs.len(), 2);
        // cursor continues after the slot table, not after the last pointer target
        assert_eq!(reader.position(), 20 + 104);
    }

    #[test]
    fn test_shared_slots_decode_once() {
        let data = script_bytes(0);
        let script = read_script(&mut RecordReader::new(&data), &tables()).unwrap();
        let slots = &script.entities[0].scripts;
        assert!(Arc::ptr_eq(&slots[1].stream, &slots[31].stream));
        assert!(!Arc::ptr_eq(&slots[0].stream, &slots[1].stream));
    }
}
