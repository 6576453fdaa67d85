//! MSB-first bit-field reading and writing
//!
//! Fields are packed back to back with no alignment: bit 0 of the run is the
//! most significant bit of byte 0, and a field may straddle any number of
//! byte boundaries. Opcode operands and the packed tile/CLUT attributes all
//! use this layout.

use crate::error::{Error, Result};

/// Widest supported field
pub const MAX_WIDTH: u32 = 32;

fn check_width(width: u32) -> Result<()> {
    if width == 0 || width > MAX_WIDTH {
        return Err(Error::InvalidBitWidth(width));
    }
    Ok(())
}

/// Bitstream reader over a byte slice
pub struct BitReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read `width` bits as an unsigned value
    ///
    /// # Errors
    /// Returns [`Error::BitUnderflow`] if fewer than `width` bits remain, and
    /// [`Error::InvalidBitWidth`] for widths outside 1..=32.
    pub fn read_bits(&mut self, width: u32) -> Result<u32> {
        check_width(width)?;
        let needed = width as usize;
        if needed > self.remaining() {
            return Err(Error::BitUnderflow {
                position: self.position,
                needed,
                available: self.remaining(),
            });
        }

        let mut result = 0u32;
        let mut left = needed;
        while left > 0 {
            let byte = self.data[self.position / 8];
            let offset = self.position % 8;
            let take = (8 - offset).min(left);
            let chunk = (byte >> (8 - offset - take)) & ((1u16 << take) - 1) as u8;
            result = (result << take) | u32::from(chunk);
            self.position += take;
            left -= take;
        }
        Ok(result)
    }

    /// Current position in bits
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bits left to read
    pub fn remaining(&self) -> usize {
        self.data.len() * 8 - self.position
    }
}

/// Bitstream writer producing the layout [`BitReader`] consumes
#[derive(Default)]
pub struct BitWriter {
    data: Vec<u8>,
    position: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the low `width` bits of `value`
    ///
    /// # Errors
    /// Returns [`Error::ValueOutOfRange`] if `value` needs more than `width`
    /// bits, and [`Error::InvalidBitWidth`] for widths outside 1..=32.
    pub fn write_bits(&mut self, value: u32, width: u32) -> Result<()> {
        check_width(width)?;
        if width < MAX_WIDTH && value >> width != 0 {
            return Err(Error::ValueOutOfRange { value, width });
        }

        let mut left = width as usize;
        while left > 0 {
            let offset = self.position % 8;
            if offset == 0 {
                self.data.push(0);
            }
            let take = (8 - offset).min(left);
            let chunk = ((value >> (left - take)) & ((1u32 << take) - 1)) as u8;
            let last = self.data.len() - 1;
            self.data[last] |= chunk << (8 - offset - take);
            self.position += take;
            left -= take;
        }
        Ok(())
    }

    /// Bits written so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Finish, zero-padding the final partial byte
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Decode one value per width, in order
///
/// # Errors
/// Returns [`Error::BitUnderflow`] if the widths add up to more bits than `data` holds.
pub fn decode_fields(data: &[u8], widths: &[u32]) -> Result<Vec<u32>> {
    let mut reader = BitReader::new(data);
    widths.iter().map(|&w| reader.read_bits(w)).collect()
}

/// Pack values with the given widths, in order
///
/// # Errors
/// Returns [`Error::ValueOutOfRange`] if a value does not fit its width.
pub fn encode_fields(values: &[u32], widths: &[u32]) -> Result<Vec<u8>> {
    debug_assert_eq!(values.len(), widths.len());
    let mut writer = BitWriter::new();
    for (&value, &width) in values.iter().zip(widths) {
        writer.write_bits(value, width)?;
    }
    Ok(writer.into_bytes())
}

/// Bytes needed to hold fields of the given widths
pub fn footprint_bytes(widths: impl IntoIterator<Item = u32>) -> usize {
    let bits: u32 = widths.into_iter().sum();
    bits.div_ceil(8) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_read_msb_first() {
        let data = [0b1011_0101, 0b1100_1010];
        let mut reader = BitReader::new(&data);

        assert_eq!(reader.read_bits(1).unwrap(), 1);
        assert_eq!(reader.read_bits(1).unwrap(), 0);
        assert_eq!(reader.read_bits(2).unwrap(), 0b11);
        assert_eq!(reader.read_bits(4).unwrap(), 0b0101);
        assert_eq!(reader.read_bits(8).unwrap(), 0b1100_1010);
    }

    #[test]
    fn test_read_cross_byte() {
        let data = [0x12, 0x34, 0x56];
        assert_eq!(decode_fields(&data, &[4, 12, 8]).unwrap(), vec![0x1, 0x234, 0x56]);
        assert_eq!(decode_fields(&data, &[3, 17]).unwrap(), vec![0b000, 0b1_0010_0011_0100_0101]);
    }

    #[test]
    fn test_read_full_width() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF, 0x80];
        assert_eq!(decode_fields(&data, &[32, 1]).unwrap(), vec![0xDEAD_BEEF, 1]);
    }

    #[test]
    fn test_underflow() {
        let mut reader = BitReader::new(&[0xFF]);
        reader.read_bits(5).unwrap();
        assert!(matches!(
            reader.read_bits(4),
            Err(Error::BitUnderflow { position: 5, needed: 4, available: 3 })
        ));
    }

    #[test]
    fn test_invalid_width() {
        let mut reader = BitReader::new(&[0; 8]);
        assert!(matches!(reader.read_bits(0), Err(Error::InvalidBitWidth(0))));
        assert!(matches!(reader.read_bits(33), Err(Error::InvalidBitWidth(33))));
    }

    #[test]
    fn test_write_pads_final_byte() {
        let bytes = encode_fields(&[1, 0x7F], &[1, 7]).unwrap();
        assert_eq!(bytes, vec![0xFF]);
        let bytes = encode_fields(&[0b101], &[3]).unwrap();
        assert_eq!(bytes, vec![0b1010_0000]);
    }

    #[test]
    fn test_write_rejects_oversized_value() {
        assert!(matches!(
            encode_fields(&[16], &[4]),
            Err(Error::ValueOutOfRange { value: 16, width: 4 })
        ));
        assert!(encode_fields(&[u32::MAX], &[32]).is_ok());
    }

    #[test]
    fn test_round_trip_width_combinations() {
        // every pair and triple of widths whose total stays within 64 bits
        let widths: Vec<u32> = vec![1, 2, 3, 5, 7, 8, 9, 13, 16, 17, 24, 31, 32];
        let value_for = |w: u32, seed: u32| {
            let max = if w == 32 { u32::MAX } else { (1u32 << w) - 1 };
            seed.wrapping_mul(0x9E37_79B9) & max
        };
        for &a in &widths {
            for &b in &widths {
                for &c in &[0u32, 1, 6, 32] {
                    let layout: Vec<u32> = [a, b, c].into_iter().filter(|&w| w > 0).collect();
                    if layout.iter().sum::<u32>() > 64 {
                        continue;
                    }
                    let values: Vec<u32> = layout
                        .iter()
                        .enumerate()
                        .map(|(i, &w)| value_for(w, a * 31 + b * 7 + i as u32))
                        .collect();
                    let packed = encode_fields(&values, &layout).unwrap();
                    assert_eq!(packed.len(), footprint_bytes(layout.iter().copied()));
                    assert_eq!(decode_fields(&packed, &layout).unwrap(), values);
                }
            }
        }
    }

    #[test]
    fn test_footprint() {
        assert_eq!(footprint_bytes([]), 0);
        assert_eq!(footprint_bytes([1]), 1);
        assert_eq!(footprint_bytes([8, 8]), 2);
        assert_eq!(footprint_bytes([4, 4, 1]), 2);
    }
}
