//! # Shinra
//!
//! A pure-Rust library for decoding Final Fantasy VII (PlayStation) field assets.
//!
//! ## Supported Formats
//!
//! - **LZS** - The game's LZ77-style compressed file wrapper
//! - **Field `.DAT`** - Scripts, walkmesh, background tilemap and camera
//! - **AKAO** - Audio macro banks embedded in field scripts
//! - **MIM** - CLUT and texture pages for field backgrounds
//! - **Dialogs** - The game's single-byte text encoding
//!
//! Script and audio bytecode is decoded through opcode tables loaded from JSON
//! at runtime, so operand layouts are data rather than code.
//!
//! ## Quick Start
//!
//! ```no_run
//! use shinra::prelude::*;
//!
//! let tables = OpcodeTables::load("FieldScriptOpcodes.json", "AKAOOpcodes.json")?;
//! let field = read_field("MD1_1.DAT", &tables)?;
//!
//! for entity in &field.script.entities {
//!     println!("{}: {} slots", entity.name, entity.scripts.len());
//! }
//! for dialog in &field.script.dialogs {
//!     println!("{dialog}");
//! }
//! # Ok::<(), shinra::Error>(())
//! ```
//!
//! ### Decompressing only
//!
//! ```no_run
//! use shinra::compression::{DecompressOptions, read_lzs_with};
//!
//! let raw = read_lzs_with("MD1_1.MIM", DecompressOptions::disc())?;
//! println!("{} bytes", raw.len());
//! # Ok::<(), shinra::Error>(())
//! ```

pub mod batch;
pub mod bits;
pub mod compression;
pub mod error;
pub mod formats;
pub mod opcodes;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};

    pub use crate::compression::{DecompressOptions, SizeHeader, decompress, decompress_with, read_lzs};
    pub use crate::opcodes::{Dialect, InstructionStream, Opcode, OpcodeTable, OpcodeTables};
    pub use crate::formats::RecordReader;
    pub use crate::formats::akao::AudioMacro;
    pub use crate::formats::field::{Camera, Field, Script, Tilemap, Walkmesh, read_field, read_field_with};
    pub use crate::formats::mim::{TextureAtlas, read_mim};

    pub use crate::batch::{BatchFieldResult, decode_fields, find_field_files};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
