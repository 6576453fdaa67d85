//! User configuration
//!
//! Stored as TOML at `<config dir>/shinra/config.toml`. Command-line flags
//! override anything set here.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use shinra::compression::{DecompressOptions, SizeHeader};
use std::path::{Path, PathBuf};

/// LZS size header interpretation, as spelled in config and on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum HeaderKind {
    /// Header holds the decompressed size
    #[default]
    Decompressed,
    /// Header holds the compressed payload length (retail disc files)
    Compressed,
}

impl From<HeaderKind> for SizeHeader {
    fn from(kind: HeaderKind) -> Self {
        match kind {
            HeaderKind::Decompressed => SizeHeader::Decompressed,
            HeaderKind::Compressed => SizeHeader::Compressed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpcodeConfig {
    /// Field script opcode table (JSON)
    pub field: Option<PathBuf>,
    /// AKAO opcode table (JSON)
    pub audio: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecompressConfig {
    pub header: HeaderKind,
    pub lenient: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub opcodes: OpcodeConfig,
    pub decompress: DecompressConfig,
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("shinra").join("config.toml"))
    }

    /// Load config from `path`, or from [`Config::default_path`]
    ///
    /// An explicit path must exist and parse. A missing default file yields
    /// defaults, and an unparsable one is logged and ignored.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            let contents =
                std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
            return toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()));
        }

        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Ok(Self::default());
        };
        match toml::from_str(&contents) {
            Ok(config) => {
                tracing::debug!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {e}", path.display());
                Ok(Self::default())
            }
        }
    }

    /// Decompression options with command-line overrides applied
    pub fn decompress_options(&self, header: Option<HeaderKind>, lenient: bool) -> DecompressOptions {
        DecompressOptions {
            header: header.unwrap_or(self.decompress.header).into(),
            lenient: lenient || self.decompress.lenient,
        }
    }
}
