//! Field files (PSX `.DAT`)
//!
//! A decompressed field starts with seven u32 section pointers: script,
//! walkmesh, tilemap, camera, triggers, encounters and models. The values are
//! PSX RAM addresses; subtracting the first one and adding the 28-byte
//! header size gives the file offset.

pub mod camera;
pub mod script;
pub mod tilemap;
pub mod walkmesh;

pub use camera::{Camera, read_camera};
pub use script::{Entity, EntityScript, SLOTS_PER_ENTITY, Script, read_script};
pub use tilemap::{
    Layer, LayerInfo, LayerKind, PageGroup, ResolvedTile, Tile, TileParameter, Tilemap, TexturePageInfo, read_tilemap,
};
pub use walkmesh::{Access, NO_NEIGHBOR, Triangle, Vertex, Walkmesh, read_walkmesh};

use crate::compression::{DecompressOptions, decompress_with};
use crate::error::{Error, Result};
use crate::formats::common::RecordReader;
use crate::opcodes::OpcodeTables;
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Number of section pointers
pub const SECTION_COUNT: usize = 7;

/// Size of the pointer table
pub const HEADER_SIZE: usize = SECTION_COUNT * 4;

/// File offsets of every section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSections {
    pub script: usize,
    pub walkmesh: usize,
    pub tilemap: usize,
    pub camera: usize,
    pub triggers: usize,
    pub encounters: usize,
    pub models: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub sections: FieldSections,
    pub script: Script,
    pub walkmesh: Walkmesh,
    pub tilemap: Tilemap,
    pub camera: Camera,
}

/// Read, decompress and decode a field file
///
/// # Errors
/// Returns an error if the file cannot be read, decompression fails, or any
/// section fails to decode.
pub fn read_field<P: AsRef<Path>>(path: P, tables: &OpcodeTables) -> Result<Field> {
    read_field_with(path, tables, DecompressOptions::default())
}

/// [`read_field`] with explicit decompression options
///
/// # Errors
/// As [`read_field`].
pub fn read_field_with<P: AsRef<Path>>(path: P, tables: &OpcodeTables, options: DecompressOptions) -> Result<Field> {
    let mut file = File::open(path.as_ref())?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    tracing::debug!("Decoding field {}", path.as_ref().display());
    let data = decompress_with(&buffer, options)?;
    parse_field_bytes(&data, tables)
}

/// Decode the section pointer table
///
/// # Errors
/// Returns [`Error::MalformedPointer`] if a pointer lies below the first one
/// or past the end of `data`.
pub fn parse_sections(data: &[u8]) -> Result<FieldSections> {
    let mut reader = RecordReader::new(data);
    reader.push_anchor("field");
    let raw: Vec<u32> = reader.array(SECTION_COUNT, RecordReader::read_u32)?;
    let first = raw[0];

    let mut offsets = [0usize; SECTION_COUNT];
    for (slot, &value) in offsets.iter_mut().zip(&raw) {
        let relative = value.checked_sub(first).ok_or_else(|| Error::MalformedPointer {
            anchor: "field".to_string(),
            offset: value as usize,
            target: first as usize,
            len: data.len(),
        })? as usize;
        *slot = reader.resolve("field", relative + HEADER_SIZE)?;
    }

    let [script, walkmesh, tilemap, camera, triggers, encounters, models] = offsets;
    Ok(FieldSections {
        script,
        walkmesh,
        tilemap,
        camera,
        triggers,
        encounters,
        models,
    })
}

/// Decode an already decompressed field
///
/// # Errors
/// As [`read_field`], minus I/O and decompression.
pub fn parse_field_bytes(data: &[u8], tables: &OpcodeTables) -> Result<Field> {
    let sections = parse_sections(data)?;
    let mut reader = RecordReader::new(data);

    let script = reader.peek_at(sections.script, |r| read_script(r, tables))?;
    let walkmesh = reader.peek_at(sections.walkmesh, read_walkmesh)?;
    let tilemap = reader.peek_at(sections.tilemap, read_tilemap)?;
    let camera = reader.peek_at(sections.camera, read_camera)?;

    tracing::debug!(
        "Field '{}': {} entities, {} sectors, {} tiles",
        script.name,
        script.entities.len(),
        walkmesh.sector_count(),
        tilemap.tile_count()
    );

    Ok(Field {
        sections,
        script,
        walkmesh,
        tilemap,
        camera,
    })
}
