//! Error types for `Shinra`

use thiserror::Error;

/// The error type for `Shinra` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== LZS Errors ====================
    /// The compressed stream ended before the declared size was produced,
    /// or a control bit announced an operand that is not there.
    #[error("truncated LZS stream at input offset {offset}: produced {produced} of {expected} bytes")]
    TruncatedStream {
        /// Input offset where decoding stopped.
        offset: usize,
        /// Number of bytes produced so far.
        produced: usize,
        /// Number of bytes the header declared.
        expected: usize,
    },

    /// The file is too short to hold the 4-byte LZS size header.
    #[error("LZS header missing: need 4 bytes, got {0}")]
    MissingLzsHeader(usize),

    // ==================== Bit-Field Errors ====================
    /// A bit-field read ran past the available bits.
    #[error("bit underflow: needed {needed} bits at bit {position}, only {available} available")]
    BitUnderflow {
        /// Bit position where the read started.
        position: usize,
        /// Bits requested.
        needed: usize,
        /// Bits left in the buffer.
        available: usize,
    },

    /// A field width outside 1..=32 was requested.
    #[error("invalid bit width: {0} (supported: 1-32)")]
    InvalidBitWidth(u32),

    /// A value does not fit in the width it is packed into.
    #[error("value {value} does not fit in {width} bits")]
    ValueOutOfRange {
        /// The value being packed.
        value: u32,
        /// The field width.
        width: u32,
    },

    // ==================== Opcode Errors ====================
    /// The opcode id has no entry in the active table.
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),

    /// An opcode table failed validation.
    #[error("invalid opcode table entry 0x{id:02X}: {message}")]
    InvalidOpcodeTable {
        /// The offending opcode id (or the raw JSON id truncated to 8 bits).
        id: u32,
        /// What is wrong with it.
        message: String,
    },

    /// An opcode's operands do not match its template on encode.
    #[error("operand mismatch for {opcode}: {message}")]
    OperandMismatch {
        /// Short opcode name.
        opcode: String,
        /// What is wrong with it.
        message: String,
    },

    /// JSON parsing error while loading an opcode table.
    #[error("opcode table JSON error: {0}")]
    OpcodeTableJson(#[from] serde_json::Error),

    // ==================== Record Parser Errors ====================
    /// A computed absolute offset falls outside the buffer.
    #[error("malformed pointer: {anchor} + 0x{offset:X} = 0x{target:X} is outside a {len}-byte buffer")]
    MalformedPointer {
        /// The anchor the offset was added to.
        anchor: String,
        /// The raw relative offset.
        offset: usize,
        /// The resolved absolute position.
        target: usize,
        /// The buffer length.
        len: usize,
    },

    /// A pointer referenced an anchor that is not on the anchor stack.
    #[error("unknown anchor: {0}")]
    UnknownAnchor(String),

    /// A sentinel-terminated sequence ran out of input before its sentinel.
    #[error("unterminated {what} starting at offset 0x{offset:X}")]
    UnterminatedStream {
        /// What kind of sequence was being read.
        what: &'static str,
        /// Absolute offset where the sequence started.
        offset: usize,
    },

    /// A fixed-width field ran past the end of the buffer.
    #[error("unexpected end of data at offset 0x{offset:X}: need {needed} bytes")]
    UnexpectedEof {
        /// Absolute offset of the read.
        offset: usize,
        /// Bytes requested.
        needed: usize,
    },

    // ==================== Container Errors ====================
    /// A container's fixed tag bytes do not match.
    #[error("bad magic at offset 0x{offset:X}: expected {expected:?}, found {found:?}")]
    BadMagic {
        /// Absolute offset of the tag.
        offset: usize,
        /// The expected tag.
        expected: [u8; 4],
        /// The bytes actually present.
        found: [u8; 4],
    },

    /// A walkmesh edge references a triangle that does not exist.
    #[error("triangle {triangle} edge {edge} references neighbor {neighbor} (only {count} sectors)")]
    InvalidNeighbor {
        /// Triangle index.
        triangle: usize,
        /// Edge index (0-2).
        edge: usize,
        /// Neighbor id read from the access pool.
        neighbor: u16,
        /// Number of sectors in the mesh.
        count: usize,
    },
}

/// A specialized Result type for `Shinra` operations.
pub type Result<T> = std::result::Result<T, Error>;
