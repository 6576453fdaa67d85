//! LZS decompression
//!
//! The container is a 4-byte little-endian size header followed by groups of
//! one control byte and up to eight tokens. Control bits are consumed LSB
//! first: a set bit is a literal byte, a clear bit is a two-byte reference
//! into a 4096-byte circular history.
//!
//! Reference layout (`b0`, `b1`):
//!
//! ```text
//! b0: OOOO OOOO   low offset bits
//! b1: OOOO LLLL   high offset bits, length - 3
//! ```
//!
//! The history position read is `(offset + 18) mod 4096`. References may
//! overlap the bytes they produce, so copies go one byte at a time.

use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Size of the size header in bytes
pub const HEADER_SIZE: usize = 4;

/// Size of the circular history window
pub const WINDOW_SIZE: usize = 4096;

const WINDOW_MASK: usize = WINDOW_SIZE - 1;

/// Bias added to a reference offset to get the history position
const OFFSET_BIAS: usize = 18;

/// Minimum reference length
const MIN_MATCH: usize = 3;

/// Upper bound on output bytes per input byte (one control byte and eight
/// 2-byte references yield 144 bytes from 17)
const MAX_EXPANSION: usize = 9;

/// How the 4-byte header is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SizeHeader {
    /// The header is the number of bytes to produce.
    #[default]
    Decompressed,
    /// The header is the length of the compressed payload that follows it.
    /// Decoding runs until that payload is consumed.
    Compressed,
}

/// Options for [`decompress_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompressOptions {
    /// Meaning of the size header.
    pub header: SizeHeader,
    /// Return the bytes produced so far instead of [`Error::TruncatedStream`].
    pub lenient: bool,
}

impl DecompressOptions {
    /// Options for retail disc files, whose header holds the payload length.
    pub fn disc() -> Self {
        Self {
            header: SizeHeader::Compressed,
            lenient: false,
        }
    }
}

/// Circular history buffer. Once full, each write evicts the oldest byte.
struct History {
    elems: [u8; WINDOW_SIZE],
    start: usize,
    count: usize,
}

impl History {
    fn new() -> Self {
        Self {
            elems: [0; WINDOW_SIZE],
            start: 0,
            count: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        let end = (self.start + self.count) & WINDOW_MASK;
        self.elems[end] = byte;
        if self.count == WINDOW_SIZE {
            self.start = (self.start + 1) & WINDOW_MASK;
        } else {
            self.count += 1;
        }
    }

    fn get(&self, position: usize) -> u8 {
        self.elems[position & WINDOW_MASK]
    }
}

/// Read and decompress an LZS file from disk
///
/// # Errors
/// Returns an error if the file cannot be read or the stream is truncated.
pub fn read_lzs<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    read_lzs_with(path, DecompressOptions::default())
}

/// Read and decompress an LZS file from disk with explicit options
///
/// # Errors
/// Returns an error if the file cannot be read or the stream is truncated.
pub fn read_lzs_with<P: AsRef<Path>>(path: P, options: DecompressOptions) -> Result<Vec<u8>> {
    let mut file = File::open(path.as_ref())?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    tracing::debug!("Read {} compressed bytes from {}", buffer.len(), path.as_ref().display());
    decompress_with(&buffer, options)
}

/// Decompress an LZS buffer whose header declares the decompressed size
///
/// # Errors
/// Returns [`Error::TruncatedStream`] if the input runs out early.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    decompress_with(data, DecompressOptions::default())
}

/// Decompress an LZS buffer
///
/// # Errors
/// Returns [`Error::MissingLzsHeader`] if the buffer is shorter than the header,
/// and [`Error::TruncatedStream`] (unless `options.lenient`) if the input runs
/// out mid-token or before the declared size is reached.
pub fn decompress_with(data: &[u8], options: DecompressOptions) -> Result<Vec<u8>> {
    if data.len() < HEADER_SIZE {
        return Err(Error::MissingLzsHeader(data.len()));
    }
    let declared = LittleEndian::read_u32(&data[..HEADER_SIZE]) as usize;

    let (target, input_end) = match options.header {
        SizeHeader::Decompressed => (Some(declared), data.len()),
        SizeHeader::Compressed => (None, HEADER_SIZE.saturating_add(declared).min(data.len())),
    };

    let mut history = History::new();
    // the header is untrusted; reserve no more than the input can expand to
    let bound = input_end.saturating_mul(MAX_EXPANSION);
    let mut output = Vec::with_capacity(target.unwrap_or(bound).min(bound));
    let mut pos = HEADER_SIZE;
    let reached = |len: usize| target.is_some_and(|t| len >= t);

    'stream: while pos < input_end && !reached(output.len()) {
        let control = data[pos];
        pos += 1;

        for bit in 0..8 {
            if pos >= input_end || reached(output.len()) {
                break 'stream;
            }

            if (control >> bit) & 1 == 1 {
                let literal = data[pos];
                pos += 1;
                history.push(literal);
                output.push(literal);
                continue;
            }

            if pos + 2 > input_end {
                return truncated(pos, output, declared, options);
            }
            let (b0, b1) = (data[pos] as usize, data[pos + 1] as usize);
            pos += 2;

            let length = (b1 & 0x0F) + MIN_MATCH;
            let offset = b0 | ((b1 & 0xF0) << 4);
            let read = (offset + OFFSET_BIAS) & WINDOW_MASK;

            for i in 0..length {
                if reached(output.len()) {
                    break;
                }
                let byte = history.get(read + i);
                history.push(byte);
                output.push(byte);
            }
        }
    }

    let short_of_target = target.is_some_and(|t| output.len() < t);
    let short_of_input = options.header == SizeHeader::Compressed && HEADER_SIZE.saturating_add(declared) > data.len();
    if short_of_target || short_of_input {
        return truncated(pos, output, declared, options);
    }

    tracing::debug!("Decompressed LZS: {} -> {} bytes", data.len(), output.len());
    Ok(output)
}

fn truncated(
    offset: usize,
    output: Vec<u8>,
    declared: usize,
    options: DecompressOptions,
) -> Result<Vec<u8>> {
    if options.lenient {
        tracing::warn!(
            "LZS stream truncated at offset {offset}; keeping {} bytes (header declares {declared})",
            output.len()
        );
        return Ok(output);
    }
    Err(Error::TruncatedStream {
        offset,
        produced: output.len(),
        expected: declared,
    })
}
