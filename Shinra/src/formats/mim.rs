//! MIM texture atlases
//!
//! A CLUT block followed by as many texture page blocks as fit in the file.
//! Every block starts with `u32 length, u16 x, u16 y, u16 width, u16 height`
//! in VRAM units (one unit is a 16-bit word, so two 8-bit pixels).

use super::common::RecordReader;
use crate::bits;
use crate::compression::{DecompressOptions, decompress_with};
use crate::error::{Error, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Tile edge in pixels
pub const TILE_PIXELS: usize = 16;

/// VRAM words per texture page column
const PAGE_WIDTH_WORDS: i32 = 64;

/// Expand a 5-bit channel to 8 bits
fn expand_channel(value: u32) -> u8 {
    ((value << 3) + (value >> 2)) as u8
}

/// One 15-bit colour plus the semi-transparency flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaletteEntry {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub stp: bool,
}

impl PaletteEntry {
    /// Unpack `stp:1 blue:5 green:5 red:5` from a little-endian word
    pub fn from_packed(value: u16) -> Result<Self> {
        let fields = bits::decode_fields(&value.to_be_bytes(), &[1, 5, 5, 5])?;
        Ok(Self {
            stp: fields[0] == 1,
            blue: expand_channel(fields[1]),
            green: expand_channel(fields[2]),
            red: expand_channel(fields[3]),
        })
    }

    pub fn rgb(&self) -> [u8; 3] {
        [self.red, self.green, self.blue]
    }

    pub fn is_black(&self) -> bool {
        self.rgb() == [0, 0, 0]
    }

    /// Opacity as the PSX draws it: black is transparent unless `stp` is
    /// set, and any other colour is opaque unless `stp` is set.
    pub fn alpha(&self) -> u8 {
        if self.is_black() == self.stp { 255 } else { 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub entries: Vec<PaletteEntry>,
}

impl Palette {
    pub fn alpha_mask(&self) -> Vec<u8> {
        self.entries.iter().map(PaletteEntry::alpha).collect()
    }

    /// RGBA for a palette index
    pub fn rgba(&self, index: u8) -> Option<[u8; 4]> {
        let entry = self.entries.get(usize::from(index))?;
        let [r, g, b] = entry.rgb();
        Some([r, g, b, entry.alpha()])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clut {
    pub length: u32,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// `height` palettes of `width` entries
    pub palettes: Vec<Palette>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TexturePage {
    pub length: u32,
    pub x: u16,
    pub y: u16,
    /// Width in 16-bit words
    pub width: u16,
    pub height: u16,
    /// `width × height` words, each holding two 8-bit palette indices
    pub data: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureAtlas {
    pub clut: Clut,
    pub pages: Vec<TexturePage>,
}

impl TextureAtlas {
    /// Palette indices of a 16×16 tile, row by row
    ///
    /// `page_y` selects the texture page block, `page_x` the 64-word column
    /// within VRAM, and `source_x`/`source_y` are pixel coordinates inside
    /// that column. Returns `None` if the tile is not covered by the page.
    pub fn tile_indices(&self, page_x: u8, page_y: u8, source_x: u8, source_y: u8) -> Option<Vec<u8>> {
        let page = self.pages.get(usize::from(page_y))?;
        let column = i32::from(source_x >> 1) + i32::from(page_x) * PAGE_WIDTH_WORDS - i32::from(page.x);
        let column = usize::try_from(column).ok()?;
        let words_per_row = TILE_PIXELS / 2;
        if column + words_per_row > usize::from(page.width) {
            return None;
        }

        let mut indices = Vec::with_capacity(TILE_PIXELS * TILE_PIXELS);
        for y in 0..TILE_PIXELS {
            let row = usize::from(source_y) + y;
            let start = row * usize::from(page.width) + column;
            let words = page.data.get(start..start + words_per_row)?;
            indices.extend(words.iter().flat_map(|w| w.to_le_bytes()));
        }
        Some(indices)
    }
}

/// Read, decompress and decode a MIM file
///
/// # Errors
/// Returns an error if the file cannot be read, decompression fails, or the
/// CLUT block is cut short.
pub fn read_mim<P: AsRef<Path>>(path: P) -> Result<TextureAtlas> {
    read_mim_with(path, DecompressOptions::default())
}

/// [`read_mim`] with explicit decompression options
///
/// # Errors
/// As [`read_mim`].
pub fn read_mim_with<P: AsRef<Path>>(path: P, options: DecompressOptions) -> Result<TextureAtlas> {
    let mut file = File::open(path.as_ref())?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    tracing::debug!("Decoding MIM {}", path.as_ref().display());
    parse_mim_bytes(&decompress_with(&buffer, options)?)
}

fn read_clut(reader: &mut RecordReader<'_>) -> Result<Clut> {
    let length = reader.read_u32()?;
    let x = reader.read_u16()?;
    let y = reader.read_u16()?;
    let width = reader.read_u16()?;
    let height = reader.read_u16()?;
    let palettes = reader.array(usize::from(height), |r| {
        let entries = r.array(usize::from(width), |r| PaletteEntry::from_packed(r.read_u16()?))?;
        Ok(Palette { entries })
    })?;
    Ok(Clut {
        length,
        x,
        y,
        width,
        height,
        palettes,
    })
}

fn read_page(reader: &mut RecordReader<'_>) -> Result<TexturePage> {
    let length = reader.read_u32()?;
    let x = reader.read_u16()?;
    let y = reader.read_u16()?;
    let width = reader.read_u16()?;
    let height = reader.read_u16()?;
    let data = reader.array(usize::from(width) * usize::from(height), RecordReader::read_u16)?;
    Ok(TexturePage {
        length,
        x,
        y,
        width,
        height,
        data,
    })
}

/// Decode an already decompressed MIM
///
/// Texture pages are read until one no longer fits; trailing bytes after the
/// last complete page are ignored.
///
/// # Errors
/// Returns [`Error::UnexpectedEof`] if the CLUT block is cut short.
pub fn parse_mim_bytes(data: &[u8]) -> Result<TextureAtlas> {
    let mut reader = RecordReader::new(data);
    let clut = read_clut(&mut reader)?;

    let mut pages = Vec::new();
    while !reader.at_end() {
        let start = reader.position();
        match read_page(&mut reader) {
            Ok(page) => pages.push(page),
            Err(Error::UnexpectedEof { .. }) => {
                tracing::debug!("Ignoring {} trailing bytes after the last texture page", data.len() - start);
                break;
            }
            Err(e) => return Err(e),
        }
    }

    tracing::debug!(
        "MIM: {}x{} CLUT, {} texture pages",
        clut.width,
        clut.height,
        pages.len()
    );
    Ok(TextureAtlas { clut, pages })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn block_header(data: &mut Vec<u8>, x: u16, y: u16, width: u16, height: u16) {
        let length = 12 + u32::from(width) * u32::from(height) * 2;
        data.extend(length.to_le_bytes());
        for v in [x, y, width, height] {
            data.extend(v.to_le_bytes());
        }
    }

    fn sample() -> Vec<u8> {
        let mut data = Vec::new();
        block_header(&mut data, 0, 480, 2, 1);
        data.extend(0x0000u16.to_le_bytes());
        data.extend((0x8000u16 | (31 << 10) | 1).to_le_bytes());

        // one 16-word wide page placed at VRAM x = 64, 16 rows
        block_header(&mut data, 64, 0, 16, 16);
        for row in 0..16u16 {
            for col in 0..16u16 {
                data.extend(((row << 8) | col).to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn test_palette_expansion() {
        let atlas = parse_mim_bytes(&sample()).unwrap();
        assert_eq!(atlas.clut.y, 480);
        let palette = &atlas.clut.palettes[0];
        assert_eq!(palette.entries.len(), 2);

        let black = palette.entries[0];
        assert!(black.is_black() && !black.stp);
        let entry = palette.entries[1];
        assert!(entry.stp);
        assert_eq!(entry.rgb(), [8, 0, 255]);
    }

    #[test]
    fn test_alpha_rules() {
        let entry = |v: u16| PaletteEntry::from_packed(v).unwrap();
        assert_eq!(entry(0x0000).alpha(), 0);
        assert_eq!(entry(0x8000).alpha(), 255);
        assert_eq!(entry(0x001F).alpha(), 255);
        assert_eq!(entry(0x801F).alpha(), 0);

        let atlas = parse_mim_bytes(&sample()).unwrap();
        assert_eq!(atlas.clut.palettes[0].alpha_mask(), vec![0, 0]);
        assert_eq!(atlas.clut.palettes[0].rgba(1), Some([8, 0, 255, 0]));
        assert_eq!(atlas.clut.palettes[0].rgba(2), None);
    }

    #[test]
    fn test_greedy_pages_ignore_partial_tail() {
        let mut data = sample();
        block_header(&mut data, 0, 0, 4, 4);
        data.extend([0; 6]);
        let atlas = parse_mim_bytes(&data).unwrap();
        assert_eq!(atlas.pages.len(), 1);
        assert_eq!(atlas.pages[0].data.len(), 256);
    }

    #[test]
    fn test_tile_indices() {
        let atlas = parse_mim_bytes(&sample()).unwrap();
        // page column 1 starts at VRAM x = 64, the page's own x
        let tile = atlas.tile_indices(1, 0, 0, 0).unwrap();
        assert_eq!(tile.len(), 256);
        // word (row 0, col 0) = 0x0000, word (row 0, col 1) = 0x0001
        assert_eq!(&tile[..4], &[0, 0, 1, 0]);
        // row 3 starts with word 0x0300
        assert_eq!(&tile[48..50], &[0, 3]);

        // source x 16 pixels = 8 words into the page
        let tile = atlas.tile_indices(1, 0, 16, 0).unwrap();
        assert_eq!(tile[0], 8);

        assert_eq!(atlas.tile_indices(0, 0, 0, 0), None);
        assert_eq!(atlas.tile_indices(1, 1, 0, 0), None);
        assert_eq!(atlas.tile_indices(1, 0, 32, 0), None);
    }

    #[test]
    fn test_truncated_clut() {
        let mut data = sample();
        data.truncate(14);
        assert!(matches!(parse_mim_bytes(&data), Err(Error::UnexpectedEof { .. })));
    }
}
