use anyhow::Context;
use clap::{Args, Subcommand, ValueEnum};
use shinra::compression::DecompressOptions;
use shinra::opcodes::{Dialect, OpcodeTables};
use std::path::PathBuf;

use crate::config::{Config, HeaderKind};

pub mod batch;
pub mod decompress;
pub mod dialogs;
pub mod field;
pub mod mim;
pub mod opcodes;
pub mod script;

/// Opcode table locations
#[derive(Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// Field script opcode table (JSON)
    #[arg(long)]
    pub field_opcodes: Option<PathBuf>,

    /// AKAO opcode table (JSON)
    #[arg(long)]
    pub audio_opcodes: Option<PathBuf>,
}

impl TableArgs {
    /// Load both tables, falling back to paths from the config
    pub fn load(&self, config: &Config) -> anyhow::Result<OpcodeTables> {
        let field = self
            .field_opcodes
            .as_ref()
            .or(config.opcodes.field.as_ref())
            .context("no field script opcode table; pass --field-opcodes or set opcodes.field in the config")?;
        let audio = self
            .audio_opcodes
            .as_ref()
            .or(config.opcodes.audio.as_ref())
            .context("no AKAO opcode table; pass --audio-opcodes or set opcodes.audio in the config")?;
        tracing::debug!("Loading opcode tables {} and {}", field.display(), audio.display());
        Ok(OpcodeTables::load(field, audio)?)
    }
}

/// LZS decompression flags
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct LzsArgs {
    /// How to read the 4-byte size header
    #[arg(long, value_enum)]
    pub header: Option<HeaderKind>,

    /// Keep output from a truncated stream instead of failing
    #[arg(long)]
    pub lenient: bool,
}

impl LzsArgs {
    pub fn options(self, config: &Config) -> DecompressOptions {
        config.decompress_options(self.header, self.lenient)
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectArg {
    Field,
    Audio,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Field => Dialect::FieldScript,
            DialectArg::Audio => Dialect::AudioMacro,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decompress an LZS file
    Decompress {
        /// Compressed input file
        input: PathBuf,

        /// Output file (defaults to the input with a `.bin` extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        lzs: LzsArgs,
    },

    /// Summarize a field file
    Field {
        /// Field `.DAT` file
        input: PathBuf,

        /// Print the whole decoded field as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        tables: TableArgs,

        #[command(flatten)]
        lzs: LzsArgs,
    },

    /// Disassemble entity scripts of a field
    Script {
        /// Field `.DAT` file
        input: PathBuf,

        /// Only this entity
        #[arg(short, long)]
        entity: Option<String>,

        #[command(flatten)]
        tables: TableArgs,

        #[command(flatten)]
        lzs: LzsArgs,
    },

    /// Print the dialog strings of a field
    Dialogs {
        /// Field `.DAT` file
        input: PathBuf,

        #[command(flatten)]
        tables: TableArgs,

        #[command(flatten)]
        lzs: LzsArgs,
    },

    /// Summarize a MIM texture atlas
    Mim {
        /// MIM file
        input: PathBuf,

        #[command(flatten)]
        lzs: LzsArgs,
    },

    /// Validate and list an opcode table
    Opcodes {
        /// Opcode table (JSON)
        table: PathBuf,

        /// Bytecode dialect the table describes
        #[arg(short, long, value_enum, default_value = "field")]
        dialect: DialectArg,
    },

    /// Decode every field file under a directory
    Batch {
        /// Directory to search recursively
        source: PathBuf,

        #[command(flatten)]
        tables: TableArgs,

        #[command(flatten)]
        lzs: LzsArgs,
    },
}

impl Commands {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        match self {
            Commands::Decompress { input, output, lzs } => {
                decompress::execute(input, output.as_deref(), lzs.options(config))
            }
            Commands::Field { input, json, tables, lzs } => {
                field::execute(input, &tables.load(config)?, lzs.options(config), *json)
            }
            Commands::Script { input, entity, tables, lzs } => {
                script::execute(input, &tables.load(config)?, lzs.options(config), entity.as_deref())
            }
            Commands::Dialogs { input, tables, lzs } => {
                dialogs::execute(input, &tables.load(config)?, lzs.options(config))
            }
            Commands::Mim { input, lzs } => mim::execute(input, lzs.options(config)),
            Commands::Opcodes { table, dialect } => opcodes::execute(table, (*dialect).into()),
            Commands::Batch { source, tables, lzs } => {
                batch::execute(source, &tables.load(config)?, lzs.options(config))
            }
        }
    }
}
