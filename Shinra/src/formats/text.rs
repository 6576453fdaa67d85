//! Dialog text decoding
//!
//! Field dialogs use the game's own single-byte encoding: printable ASCII
//! shifted down by 0x20, an extended glyph page, and a block of control
//! codes rendered here as bracketed tags. `0xFF` ends a string.

use super::common::RecordReader;
use crate::error::{Error, Result};

/// End of string
pub const END: u8 = 0xFF;

const ESCAPE: u8 = 0xFE;

/// Glyphs for 0x5F-0xDF
const EXTENDED: [char; 129] = [
    ' ', 'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é',
    'è', 'ê', 'ë', 'í', 'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û',
    'ü', '†', '°', '¢', '£', '§', '•', '¶', 'ß', '®', '©', '™', '´', '¨', '≠', 'Æ',
    'Ø', '∞', '±', '≤', '≥', '¥', 'µ', '∂', '∑', '∏', 'π', '∫', 'ª', 'º', 'Ω', 'æ',
    'ø', '¿', '¡', '¬', '√', 'ƒ', '≈', '∆', '«', '»', '…', '\u{A0}', 'À', 'Ã', 'Õ', 'Œ',
    'œ', '–', '—', '“', '”', '‘', '’', '÷', '◊', 'ÿ', 'Ÿ', '⁄', '€', '‹', '›', 'ﬁ',
    'ﬂ', '‡', '·', '‚', '„', '‰', 'Â', 'Ê', 'Á', 'Ë', 'È', 'Í', 'Î', 'Ï', 'Ì', 'Ó',
    'Ô', '\u{F8FF}', 'Ò', 'Ú', 'Û', 'Ù', 'ı', 'ˆ', '˜', '¯', '˘', '˙', '˚', '¸', '˝', '˛',
    'ˇ',
];

const NAMES: [&str; 12] = [
    "CLOUD", "BARRET", "TIFA", "AERITH", "RED XIII", "YUFFIE", "CAIT SITH", "VINCENT", "CID",
    "PARTY #1", "PARTY #2", "PARTY #3",
];

const BUTTONS: [&str; 4] = ["CIRCLE", "TRIANGLE", "SQUARE", "CROSS"];

const COLORS: [&str; 8] = ["GRAY", "BLUE", "RED", "PURPLE", "GREEN", "CYAN", "YELLOW", "WHITE"];

/// Decode one string from the start of `data`
///
/// Returns the text and the number of bytes consumed, terminator included.
///
/// # Errors
/// Returns [`Error::UnterminatedStream`] if `data` ends before `0xFF`.
pub fn decode_text(data: &[u8]) -> Result<(String, usize)> {
    let mut reader = RecordReader::new(data);
    let text = read_text(&mut reader)?;
    Ok((text, reader.position()))
}

/// Decode one string at the reader's position, consuming the terminator
///
/// # Errors
/// Returns [`Error::UnterminatedStream`] if the buffer ends before `0xFF`.
pub fn read_text(reader: &mut RecordReader<'_>) -> Result<String> {
    let start = reader.position();
    let unterminated = || Error::UnterminatedStream {
        what: "dialog string",
        offset: start,
    };

    let mut out = String::new();
    loop {
        let byte = reader.read_u8().map_err(|_| unterminated())?;
        match byte {
            0x00..=0x5E => out.push(char::from(byte + 0x20)),
            0x5F..=0xDF => out.push(EXTENDED[usize::from(byte - 0x5F)]),
            0xE0 => out.push_str("{CHOICE}"),
            0xE1 => out.push_str("{TAB}"),
            0xE2 => out.push_str(", "),
            0xE3 => out.push_str(".\""),
            0xE4 => out.push_str("…\""),
            0xE7 => out.push('\n'),
            0xE8 => out.push_str("{NEW}"),
            0xEA..=0xF5 => push_tag(&mut out, NAMES[usize::from(byte - 0xEA)]),
            0xF6..=0xF9 => push_tag(&mut out, BUTTONS[usize::from(byte - 0xF6)]),
            ESCAPE => {
                let code = reader.read_u8().map_err(|_| unterminated())?;
                read_escape(reader, code, &mut out).map_err(|_| unterminated())?;
            }
            END => return Ok(out),
            _ => out.push_str(&format!("{{{byte:02X}}}")),
        }
    }
}

fn read_escape(reader: &mut RecordReader<'_>, code: u8, out: &mut String) -> Result<()> {
    match code {
        0xD2..=0xD9 => push_tag(out, COLORS[usize::from(code - 0xD2)]),
        0xDA => push_tag(out, "FLASH"),
        0xDB => push_tag(out, "RAINBOW"),
        0xDC => push_tag(out, "PAUSE"),
        0xDD => {
            let frames = reader.read_u16()?;
            out.push_str(&format!("{{WAIT {frames}}}"));
        }
        0xDE => push_tag(out, "NUM"),
        0xDF => push_tag(out, "HEX"),
        0xE0 => push_tag(out, "SCROLL"),
        0xE1 => push_tag(out, "RNUM"),
        0xE2 => {
            let offset = reader.read_u16()?;
            let length = reader.read_u16()?;
            out.push_str(&format!("{{STR {offset:04X} {length}}}"));
        }
        _ => out.push_str(&format!("{{FE {code:02X}}}")),
    }
    Ok(())
}

fn push_tag(out: &mut String, tag: &str) {
    out.push('{');
    out.push_str(tag);
    out.push('}');
}
