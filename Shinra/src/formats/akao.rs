//! AKAO audio macro containers
//!
//! Layout:
//!
//! ```text
//! 0x00  "AKAO"
//! 0x04  u16 id
//! 0x06  u16 length
//! 0x08  u16 reverb type
//! 0x0A  6 × BCD  year month day hour minute second
//! 0x10  u24 channel mask, 1 pad byte
//! 0x14  u16 offset per set mask bit
//! ```
//!
//! Each channel offset is relative to the end of its own offset field.

use super::common::RecordReader;
use crate::error::{Error, Result};
use crate::opcodes::{InstructionStream, OpcodeTable, decode_stream};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Container tag
pub const AKAO_MAGIC: [u8; 4] = *b"AKAO";

/// Creation time stored as packed BCD digits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AkaoTimestamp {
    /// Two-digit year
    pub year: u8,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

fn from_bcd(byte: u8) -> u8 {
    (byte >> 4) * 10 + (byte & 0x0F)
}

impl AkaoTimestamp {
    fn read(reader: &mut RecordReader<'_>) -> Result<Self> {
        let raw: [u8; 6] = reader.read_array()?;
        let [year, month, day, hour, minute, second] = raw.map(from_bcd);
        Ok(Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    /// Calendar time, with years 70-99 in the 1900s
    ///
    /// Returns `None` when the digits do not form a valid date.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let century = if self.year >= 70 { 1900 } else { 2000 };
        NaiveDate::from_ymd_opt(century + i32::from(self.year), u32::from(self.month), u32::from(self.day))?
            .and_hms_opt(u32::from(self.hour), u32::from(self.minute), u32::from(self.second))
    }
}

/// One channel's instruction stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AkaoChannel {
    /// Raw offset as stored
    pub offset: u16,
    pub stream: InstructionStream,
}

/// A decoded audio macro
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioMacro {
    pub id: u16,
    pub length: u16,
    pub reverb_type: u16,
    pub timestamp: AkaoTimestamp,
    /// 24-bit channel mask
    pub mask: u32,
    /// One entry per set bit of `mask`, lowest bit first
    pub channels: Vec<AkaoChannel>,
}

impl AudioMacro {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Decode an audio macro from the start of `data`
///
/// # Errors
/// Returns [`Error::BadMagic`] if the tag is wrong, or any parse error from
/// the channel streams.
pub fn parse_akao_bytes(data: &[u8], table: &OpcodeTable) -> Result<AudioMacro> {
    read_akao(&mut RecordReader::new(data), table)
}

/// Decode an audio macro at the reader's position
///
/// # Errors
/// As [`parse_akao_bytes`].
pub fn read_akao(reader: &mut RecordReader<'_>, table: &OpcodeTable) -> Result<AudioMacro> {
    let start = reader.position();
    let magic: [u8; 4] = reader.read_array()?;
    if magic != AKAO_MAGIC {
        return Err(Error::BadMagic {
            offset: start,
            expected: AKAO_MAGIC,
            found: magic,
        });
    }

    let id = reader.read_u16()?;
    let length = reader.read_u16()?;
    let reverb_type = reader.read_u16()?;
    let timestamp = AkaoTimestamp::read(reader)?;
    let mask = reader.read_u24()?;
    reader.skip(1)?;

    let count = mask.count_ones() as usize;
    let channels = reader.array(count, |r| {
        let offset = r.read_u16()?;
        r.with_anchor("akao channel", |r| {
            let stream = r.follow("akao channel", usize::from(offset), |r| decode_stream(r, table))?;
            Ok(AkaoChannel { offset, stream })
        })
    })?;

    tracing::debug!("AKAO {id} at 0x{start:X}: {count} channels (mask {mask:024b})");
    Ok(AudioMacro {
        id,
        length,
        reverb_type,
        timestamp,
        mask,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::{Dialect, OpcodeTemplate, OperandTemplate};
    use pretty_assertions::assert_eq;

    fn audio_table() -> OpcodeTable {
        let template = |id: u8, name: &str, operands: Vec<OperandTemplate>| OpcodeTemplate {
            id,
            name: name.into(),
            longname: String::new(),
            description: String::new(),
            operands,
        };
        OpcodeTable::new(
            Dialect::AudioMacro,
            [
                template(0xA0, "NOTE", vec![OperandTemplate { name: "key".into(), description: String::new(), width: 8 }]),
                template(0xEE, "END", Vec::new()),
            ],
        )
        .unwrap()
    }

    fn header(mask: u32) -> Vec<u8> {
        let mut data = b"AKAO".to_vec();
        data.extend(7u16.to_le_bytes());
        data.extend(0x40u16.to_le_bytes());
        data.extend(2u16.to_le_bytes());
        data.extend([0x97, 0x01, 0x31, 0x23, 0x59, 0x07]);
        data.extend(&mask.to_le_bytes()[..3]);
        data.push(0);
        data
    }

    #[test]
    fn test_channel_offsets_follow_their_field() {
        let mut data = header(0b101);
        // offsets at 0x14 and 0x16; streams at 0x18 and 0x1B
        data.extend(2u16.to_le_bytes());
        data.extend(3u16.to_le_bytes());
        data.extend([0xA0, 0x3C, 0xEE]);
        data.extend([0xEE]);

        let akao = parse_akao_bytes(&data, &audio_table()).unwrap();
        assert_eq!(akao.id, 7);
        assert_eq!(akao.reverb_type, 2);
        assert_eq!(akao.channel_count(), 2);
        assert_eq!(akao.channels[0].stream.offset, 0x18);
        assert_eq!(akao.channels[0].stream.len(), 2);
        assert_eq!(akao.channels[0].stream.instructions[0].operand("key"), Some(0x3C));
        assert_eq!(akao.channels[1].stream.offset, 0x1B);
        for channel in &akao.channels {
            assert_eq!(channel.stream.terminator().map(|op| op.id), Some(0xEE));
        }
    }

    #[test]
    fn test_bcd_timestamp() {
        let mut data = header(0);
        data.push(0xEE);
        let akao = parse_akao_bytes(&data, &audio_table()).unwrap();
        let ts = akao.timestamp;
        assert_eq!((ts.year, ts.month, ts.day), (97, 1, 31));
        assert_eq!((ts.hour, ts.minute, ts.second), (23, 59, 7));
        assert_eq!(ts.to_datetime().unwrap().to_string(), "1997-01-31 23:59:07");
        assert!(akao.channels.is_empty());
    }

    #[test]
    fn test_invalid_timestamp_has_no_datetime() {
        let ts = AkaoTimestamp { year: 97, month: 13, day: 1, hour: 0, minute: 0, second: 0 };
        assert_eq!(ts.to_datetime(), None);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = header(0);
        data[0] = b'X';
        assert!(matches!(
            parse_akao_bytes(&data, &audio_table()),
            Err(Error::BadMagic { offset: 0, found, .. }) if &found == b"XKAO"
        ));
    }

    #[test]
    fn test_channel_pointer_at_end_of_data() {
        let mut data = header(0b1);
        data.extend(0u16.to_le_bytes());
        assert!(matches!(
            parse_akao_bytes(&data, &audio_table()),
            Err(Error::MalformedPointer { target: 22, len: 22, .. })
        ));
    }

    #[test]
    fn test_channel_pointer_out_of_range() {
        let mut data = header(0b1);
        data.extend(0x100u16.to_le_bytes());
        assert!(matches!(
            parse_akao_bytes(&data, &audio_table()),
            Err(Error::MalformedPointer { .. })
        ));
    }
}
