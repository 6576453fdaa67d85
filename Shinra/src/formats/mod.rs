//! Container decoders for FF7 field assets
//!
//! Every decoder takes a decompressed buffer (or a [`RecordReader`] already
//! positioned inside one) and either returns the whole value tree or fails.

pub mod akao;
pub mod common;
pub mod field;
pub mod mim;
pub mod text;

pub use common::RecordReader;

pub use akao::{AkaoChannel, AkaoTimestamp, AudioMacro, parse_akao_bytes, read_akao};
pub use field::{Field, FieldSections, parse_field_bytes, read_field, read_field_with};
pub use mim::{Clut, Palette, PaletteEntry, TextureAtlas, TexturePage, parse_mim_bytes, read_mim, read_mim_with};
pub use text::{decode_text, read_text};
