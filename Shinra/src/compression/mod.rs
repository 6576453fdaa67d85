//! Compression utilities
//!
//! Every field, MIM and standalone script file on the disc is wrapped in
//! the LZS container handled by [`lzs`].

pub mod lzs;

pub use lzs::{DecompressOptions, SizeHeader, decompress, decompress_with, read_lzs, read_lzs_with};
