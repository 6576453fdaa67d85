//! Cursor-based record reader with a stack of named anchors

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

#[derive(Debug, Clone, Copy)]
struct Anchor {
    name: &'static str,
    position: usize,
}

/// Sequential little-endian reader over a decompressed buffer.
///
/// Relative pointers never resolve against the file start implicitly: a
/// section records its start with [`push_anchor`](Self::push_anchor), and
/// offsets inside it are resolved by anchor name. Anchors nest, and lookup
/// finds the innermost anchor with a matching name.
pub struct RecordReader<'a> {
    cursor: Cursor<&'a [u8]>,
    anchors: Vec<Anchor>,
}

impl<'a> RecordReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            anchors: Vec::new(),
        }
    }

    /// The whole underlying buffer
    pub fn data(&self) -> &'a [u8] {
        *self.cursor.get_ref()
    }

    pub fn len(&self) -> usize {
        self.data().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data().is_empty()
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }

    pub fn at_end(&self) -> bool {
        self.remaining() == 0
    }

    /// Move the cursor to an absolute position (the end of the buffer is allowed)
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.len() {
            return Err(Error::UnexpectedEof {
                offset: position,
                needed: 0,
            });
        }
        self.cursor.set_position(position as u64);
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.ensure(count)?;
        self.seek(self.position() + count)
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.remaining() < needed {
            return Err(Error::UnexpectedEof {
                offset: self.position(),
                needed,
            });
        }
        Ok(())
    }

    // ==================== Fixed-width fields ====================

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn read_u24(&mut self) -> Result<u32> {
        self.ensure(3)?;
        Ok(self.cursor.read_u24::<LittleEndian>()?)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        Ok(self.cursor.read_i16::<LittleEndian>()?)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.cursor.read_i32::<LittleEndian>()?)
    }

    /// Borrow the next `count` bytes and advance past them
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.ensure(count)?;
        let start = self.position();
        let data = self.data();
        self.cursor.set_position((start + count) as u64);
        Ok(&data[start..start + count])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a fixed-length NUL-padded ASCII string
    ///
    /// The string ends at the first NUL; anything after it is padding.
    pub fn read_padded_string(&mut self, len: usize) -> Result<String> {
        let bytes = self.read_bytes(len)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(len);
        Ok(bytes[..end].iter().map(|&b| char::from(b)).collect())
    }

    // ==================== Sequences ====================

    /// Read `count` records with `f`
    pub fn array<T, F>(&mut self, count: usize, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let mut items = Vec::with_capacity(count.min(self.remaining().max(1)));
        for _ in 0..count {
            items.push(f(self)?);
        }
        Ok(items)
    }

    /// Read records until one satisfies `is_last`; that record is kept
    ///
    /// Running out of input first is [`Error::UnterminatedStream`].
    pub fn repeat_until<T, F, P>(&mut self, what: &'static str, is_last: P, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
        P: Fn(&T) -> bool,
    {
        let start = self.position();
        let mut items = Vec::new();
        loop {
            if self.at_end() {
                return Err(Error::UnterminatedStream { what, offset: start });
            }
            let item = f(self)?;
            let done = is_last(&item);
            items.push(item);
            if done {
                return Ok(items);
            }
        }
    }

    // ==================== Anchors ====================

    /// Record the current position under `name`
    pub fn push_anchor(&mut self, name: &'static str) {
        let position = self.position();
        self.anchors.push(Anchor { name, position });
    }

    /// Record an absolute position under `name`
    pub fn push_anchor_at(&mut self, name: &'static str, position: usize) -> Result<()> {
        if position > self.len() {
            return Err(Error::MalformedPointer {
                anchor: name.to_string(),
                offset: position,
                target: position,
                len: self.len(),
            });
        }
        self.anchors.push(Anchor { name, position });
        Ok(())
    }

    /// Drop the innermost anchor, returning its position
    pub fn pop_anchor(&mut self) -> Option<usize> {
        self.anchors.pop().map(|a| a.position)
    }

    /// Position of the innermost anchor called `name`
    pub fn anchor(&self, name: &str) -> Result<usize> {
        self.anchors
            .iter()
            .rev()
            .find(|a| a.name == name)
            .map(|a| a.position)
            .ok_or_else(|| Error::UnknownAnchor(name.to_string()))
    }

    /// Run `f` with `name` anchored at the current position
    ///
    /// The anchor is popped whether or not `f` succeeds.
    pub fn with_anchor<T, F>(&mut self, name: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.push_anchor(name);
        let result = f(self);
        self.pop_anchor();
        result
    }

    /// Absolute position of `offset` relative to the anchor `name`
    ///
    /// The end of the buffer is a valid result, for tables whose trailing
    /// entries mark empty sections.
    pub fn resolve(&self, name: &str, offset: usize) -> Result<usize> {
        let base = self.anchor(name)?;
        let target = base + offset;
        if target > self.len() {
            return Err(Error::MalformedPointer {
                anchor: name.to_string(),
                offset,
                target,
                len: self.len(),
            });
        }
        Ok(target)
    }

    /// Parse with `f` at `offset` from the anchor `name`, then come back
    pub fn follow<T, F>(&mut self, name: &str, offset: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        let target = self.resolve(name, offset)?;
        if target == self.len() {
            return Err(Error::MalformedPointer {
                anchor: name.to_string(),
                offset,
                target,
                len: self.len(),
            });
        }
        self.peek_at(target, f)
    }

    /// Parse with `f` at an absolute position without moving the main cursor
    pub fn peek_at<T, F>(&mut self, position: usize, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        if position >= self.len() {
            return Err(Error::MalformedPointer {
                anchor: "start".to_string(),
                offset: position,
                target: position,
                len: self.len(),
            });
        }
        let saved = self.position();
        self.cursor.set_position(position as u64);
        let result = f(self);
        self.cursor.set_position(saved as u64);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_little_endian_fields() {
        let data = [0x01, 0x34, 0x12, 0x56, 0x34, 0x12, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let mut reader = RecordReader::new(&data);

        assert_eq!(reader.read_u8().unwrap(), 0x01);
        assert_eq!(reader.read_u16().unwrap(), 0x1234);
        assert_eq!(reader.read_u24().unwrap(), 0x12_3456);
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.read_u32().unwrap(), 0x1234_5678);
        assert!(reader.at_end());
    }

    #[test]
    fn test_eof_reports_offset() {
        let mut reader = RecordReader::new(&[1, 2, 3]);
        reader.read_u16().unwrap();
        assert!(matches!(
            reader.read_u32(),
            Err(Error::UnexpectedEof { offset: 2, needed: 4 })
        ));
        // failed reads do not move the cursor
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_padded_string() {
        let mut reader = RecordReader::new(b"md1_1\0\0\0cloud\0xx");
        assert_eq!(reader.read_padded_string(8).unwrap(), "md1_1");
        assert_eq!(reader.read_padded_string(8).unwrap(), "cloud");
    }

    #[test]
    fn test_data_dependent_array() {
        let data = [3, 10, 0, 20, 0, 30, 0];
        let mut reader = RecordReader::new(&data);
        let count = reader.read_u8().unwrap() as usize;
        let values = reader.array(count, RecordReader::read_u16).unwrap();
        assert_eq!(values, vec![10, 20, 30]);
    }

    #[test]
    fn test_repeat_until_keeps_terminator() {
        let data = [1, 2, 0xFF, 4];
        let mut reader = RecordReader::new(&data);
        let items = reader
            .repeat_until("byte run", |&b| b == 0xFF, RecordReader::read_u8)
            .unwrap();
        assert_eq!(items, vec![1, 2, 0xFF]);
        assert_eq!(reader.position(), 3);
    }

    #[test]
    fn test_repeat_until_unterminated() {
        let mut reader = RecordReader::new(&[1, 2, 3]);
        reader.read_u8().unwrap();
        assert!(matches!(
            reader.repeat_until("byte run", |&b| b == 0xFF, RecordReader::read_u8),
            Err(Error::UnterminatedStream { what: "byte run", offset: 1 })
        ));
    }

    #[test]
    fn test_nested_anchors() {
        let mut data = vec![0u8; 16];
        data[4] = 0xAA;
        data[10] = 0xBB;
        let mut reader = RecordReader::new(&data);

        reader.push_anchor("outer");
        reader.push_anchor_at("inner", 8).unwrap();
        assert_eq!(reader.follow("inner", 2, RecordReader::read_u8).unwrap(), 0xBB);
        assert_eq!(reader.follow("outer", 4, RecordReader::read_u8).unwrap(), 0xAA);
        assert_eq!(reader.position(), 0);

        // an inner anchor shadows an outer one with the same name
        reader.push_anchor_at("outer", 6).unwrap();
        assert_eq!(reader.resolve("outer", 4).unwrap(), 10);
        assert_eq!(reader.pop_anchor(), Some(6));
        assert_eq!(reader.resolve("outer", 4).unwrap(), 4);
    }

    #[test]
    fn test_with_anchor_pops_on_error() {
        let data = [0u8; 4];
        let mut reader = RecordReader::new(&data);
        reader.skip(2).unwrap();
        let result: Result<u32> = reader.with_anchor("section", RecordReader::read_u32);
        assert!(result.is_err());
        assert!(matches!(reader.anchor("section"), Err(Error::UnknownAnchor(_))));
    }

    #[test]
    fn test_malformed_pointer() {
        let data = [0u8; 8];
        let mut reader = RecordReader::new(&data);
        reader.push_anchor_at("section", 4).unwrap();
        assert!(matches!(
            reader.resolve("section", 5),
            Err(Error::MalformedPointer { target: 9, len: 8, .. })
        ));
        assert!(matches!(
            reader.follow("missing", 0, RecordReader::read_u8),
            Err(Error::UnknownAnchor(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_pointer_to_buffer_end() {
        let data = [0u8; 8];
        let mut reader = RecordReader::new(&data);
        reader.push_anchor_at("section", 4).unwrap();
        assert_eq!(reader.resolve("section", 4).unwrap(), 8);
        assert!(matches!(
            reader.follow("section", 4, RecordReader::read_u8),
            Err(Error::MalformedPointer { target: 8, len: 8, .. })
        ));
        assert!(matches!(
            reader.peek_at(8, RecordReader::read_u8),
            Err(Error::MalformedPointer { target: 8, .. })
        ));
    }

    #[test]
    fn test_peek_restores_cursor() {
        let data = [1, 2, 3, 4];
        let mut reader = RecordReader::new(&data);
        reader.read_u8().unwrap();
        assert_eq!(reader.peek_at(3, RecordReader::read_u8).unwrap(), 4);
        assert_eq!(reader.read_u8().unwrap(), 2);
    }
}
