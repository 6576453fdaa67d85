//! Background tilemap section
//!
//! The section starts with four u32 offsets (background info, texture pages,
//! sprite info, extra info) and four layer-info lists. Each list runs until
//! an entry of type `0x7FFF`, which carries no position or count. Tile groups
//! follow in layer order, with the texture page table between the
//! background and sprite groups. A group whose type is `0x7FFE` is not
//! drawable: its `pos` names the texture page used by the tiles before it.

use crate::bits;
use crate::error::{Error, Result};
use crate::formats::common::RecordReader;
use serde::Serialize;

/// Layer-info list terminator
pub const TERMINATOR: u16 = 0x7FFF;

/// Layer-info type marking a texture page reference
pub const TEXTURE_REFERENCE: u16 = 0x7FFE;

/// Edge length of a tile in pixels
pub const TILE_SIZE: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerInfo {
    pub kind: u16,
    pub pos: u16,
    pub count: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TexturePageInfo {
    pub page_x: u8,
    pub page_y: u8,
    pub blending_mode: u8,
    pub depth: u8,
}

impl TexturePageInfo {
    /// Unpack `pad:7 depth:2 blend:2 page_y:1 page_x:4`, MSB first
    fn from_packed(value: u16) -> Result<Self> {
        let fields = bits::decode_fields(&value.to_be_bytes(), &[7, 2, 2, 1, 4])?;
        Ok(Self {
            depth: fields[1] as u8,
            blending_mode: fields[2] as u8,
            page_y: fields[3] as u8,
            page_x: fields[4] as u8,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileParameter {
    pub blend: bool,
    pub id: u8,
}

impl TileParameter {
    fn from_packed(value: u8) -> Result<Self> {
        let fields = bits::decode_fields(&[value], &[1, 7])?;
        Ok(Self {
            blend: fields[0] == 1,
            id: fields[1] as u8,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub destination_x: i16,
    pub destination_y: i16,
    pub source_x: u8,
    pub source_y: u8,
    pub clut_number: u8,
    /// Sprite tiles carry their own page
    pub texture_page: Option<TexturePageInfo>,
    /// Sprite tiles only
    pub group: Option<u16>,
    /// Sprite and extra tiles
    pub parameter: Option<TileParameter>,
    /// Sprite and extra tiles
    pub state: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PageGroup {
    /// Index into [`Tilemap::texture_pages`]
    TextureReference { page: u16 },
    Tiles { info: LayerInfo, tiles: Vec<Tile> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayerKind {
    Background,
    Sprite,
    Extra,
    Reserved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer {
    pub kind: LayerKind,
    /// Layer-info entries, terminator excluded
    pub infos: Vec<LayerInfo>,
    pub groups: Vec<PageGroup>,
}

/// A tile with the texture page it samples from, if known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTile<'a> {
    pub tile: &'a Tile,
    pub page: Option<TexturePageInfo>,
}

impl Layer {
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.groups.iter().flat_map(|g| match g {
            PageGroup::Tiles { tiles, .. } => tiles.as_slice(),
            PageGroup::TextureReference { .. } => &[],
        })
    }

    pub fn tile_count(&self) -> usize {
        self.tiles().count()
    }

    /// Pair each tile with its texture page
    ///
    /// Tiles with their own page keep it. Others take the page of the next
    /// texture reference in the layer; tiles after the last reference get `None`.
    pub fn resolved_tiles<'a>(&'a self, pages: &[TexturePageInfo]) -> Vec<ResolvedTile<'a>> {
        let mut out: Vec<ResolvedTile<'a>> = Vec::with_capacity(self.tile_count());
        let mut pending = 0;
        for group in &self.groups {
            match group {
                PageGroup::Tiles { tiles, .. } => {
                    out.extend(tiles.iter().map(|tile| ResolvedTile {
                        tile,
                        page: tile.texture_page,
                    }));
                }
                PageGroup::TextureReference { page } => {
                    let page = pages.get(usize::from(*page)).copied();
                    for resolved in &mut out[pending..] {
                        resolved.page = resolved.page.or(page);
                    }
                    pending = out.len();
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tilemap {
    /// Background info, texture pages, sprite info, extra info
    pub section_offsets: [u32; 4],
    pub origin_x: i32,
    pub origin_y: i32,
    pub width: u32,
    pub height: u32,
    pub background: Layer,
    pub texture_pages: Vec<TexturePageInfo>,
    pub sprites: Layer,
    pub extra: Layer,
    /// Layer-info list only; no tile records follow it
    pub reserved: Layer,
}

impl Tilemap {
    pub fn layers(&self) -> [&Layer; 4] {
        [&self.background, &self.sprites, &self.extra, &self.reserved]
    }

    pub fn tile_count(&self) -> usize {
        self.layers().iter().map(|l| l.tile_count()).sum()
    }
}

fn read_layer_infos(reader: &mut RecordReader<'_>) -> Result<Vec<LayerInfo>> {
    let mut infos = reader.repeat_until(
        "tilemap layer info",
        |info: &LayerInfo| info.kind == TERMINATOR,
        |r| {
            let kind = r.read_u16()?;
            if kind == TERMINATOR {
                return Ok(LayerInfo { kind, pos: 0, count: 0 });
            }
            Ok(LayerInfo {
                kind,
                pos: r.read_u16()?,
                count: r.read_u16()?,
            })
        },
    )?;
    infos.pop();
    Ok(infos)
}

fn read_tile(reader: &mut RecordReader<'_>, kind: LayerKind) -> Result<Tile> {
    let destination_x = reader.read_i16()?;
    let destination_y = reader.read_i16()?;
    let source_x = reader.read_u8()?;
    let source_y = reader.read_u8()?;
    let packed_clut = reader.read_u16()?;
    let clut_number = bits::decode_fields(&packed_clut.to_be_bytes(), &[6, 4, 6])?[1] as u8;

    let mut tile = Tile {
        destination_x,
        destination_y,
        source_x,
        source_y,
        clut_number,
        texture_page: None,
        group: None,
        parameter: None,
        state: None,
    };

    if kind == LayerKind::Sprite {
        tile.texture_page = Some(TexturePageInfo::from_packed(reader.read_u16()?)?);
        tile.group = Some(reader.read_u16()?);
    }
    if matches!(kind, LayerKind::Sprite | LayerKind::Extra) {
        tile.parameter = Some(TileParameter::from_packed(reader.read_u8()?)?);
        tile.state = Some(reader.read_u8()?);
    }
    Ok(tile)
}

fn read_groups(reader: &mut RecordReader<'_>, kind: LayerKind, infos: Vec<LayerInfo>) -> Result<Layer> {
    let mut groups = Vec::with_capacity(infos.len());
    for info in &infos {
        let tiles = reader.array(usize::from(info.count), |r| read_tile(r, kind))?;
        groups.push(if info.kind == TEXTURE_REFERENCE {
            PageGroup::TextureReference { page: info.pos }
        } else {
            PageGroup::Tiles { info: *info, tiles }
        });
    }
    Ok(Layer { kind, infos, groups })
}

/// Decode a tilemap section at the reader's position
///
/// # Errors
/// Returns [`Error::UnterminatedStream`] if a layer-info list has no
/// terminator, [`Error::MalformedPointer`] if the sprite section starts
/// before the texture page table, or a parse error on short input.
pub fn read_tilemap(reader: &mut RecordReader<'_>) -> Result<Tilemap> {
    let start = reader.position();
    let section_offsets = [reader.read_u32()?, reader.read_u32()?, reader.read_u32()?, reader.read_u32()?];
    let [_, texture_page_offset, sprite_info_offset, _] = section_offsets;

    let mut infos = Vec::with_capacity(4);
    for _ in 0..4 {
        infos.push(read_layer_infos(reader)?);
    }
    let mut infos = infos.into_iter();
    let mut next_infos = || infos.next().unwrap_or_default();

    let background = read_groups(reader, LayerKind::Background, next_infos())?;

    let page_bytes = sprite_info_offset
        .checked_sub(texture_page_offset)
        .ok_or_else(|| Error::MalformedPointer {
            anchor: "tilemap texture pages".to_string(),
            offset: sprite_info_offset as usize,
            target: texture_page_offset as usize,
            len: reader.len(),
        })? as usize;
    let texture_pages = reader
        .read_bytes(page_bytes)?
        .chunks_exact(2)
        .map(|pair| TexturePageInfo::from_packed(u16::from_le_bytes([pair[0], pair[1]])))
        .collect::<Result<Vec<_>>>()?;

    let sprites = read_groups(reader, LayerKind::Sprite, next_infos())?;
    let extra = read_groups(reader, LayerKind::Extra, next_infos())?;
    let reserved = Layer {
        kind: LayerKind::Reserved,
        infos: next_infos(),
        groups: Vec::new(),
    };

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (i32::MAX, i32::MAX, i32::MIN, i32::MIN);
    for tile in [&background, &sprites, &extra].into_iter().flat_map(Layer::tiles) {
        let (x, y) = (i32::from(tile.destination_x), i32::from(tile.destination_y));
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let (origin_x, origin_y, width, height) = if min_x > max_x {
        (0, 0, 0, 0)
    } else {
        (min_x, min_y, (max_x - min_x + TILE_SIZE) as u32, (max_y - min_y + TILE_SIZE) as u32)
    };

    tracing::debug!(
        "Tilemap at 0x{start:X}: {}x{} at ({origin_x}, {origin_y}), {} texture pages, {}/{}/{} tiles",
        width,
        height,
        texture_pages.len(),
        background.tile_count(),
        sprites.tile_count(),
        extra.tile_count()
    );

    Ok(Tilemap {
        section_offsets,
        origin_x,
        origin_y,
        width,
        height,
        background,
        texture_pages,
        sprites,
        extra,
        reserved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(data: &mut Vec<u8>, kind: u16, pos: u16, count: u16) {
        for v in [kind, pos, count] {
            data.extend(v.to_le_bytes());
        }
    }

    fn terminator(data: &mut Vec<u8>) {
        data.extend(TERMINATOR.to_le_bytes());
    }

    fn background_tile(data: &mut Vec<u8>, x: i16, y: i16, clut: u16) {
        data.extend(x.to_le_bytes());
        data.extend(y.to_le_bytes());
        data.extend([32, 48]);
        data.extend((clut << 6).to_le_bytes());
    }

    /// Background: two tiles then a reference to page 1. Sprites: one tile.
    fn sample() -> Vec<u8> {
        let mut body = Vec::new();
        info(&mut body, 1, 0, 2);
        info(&mut body, TEXTURE_REFERENCE, 1, 0);
        terminator(&mut body);
        info(&mut body, 2, 0, 1);
        terminator(&mut body);
        terminator(&mut body);
        terminator(&mut body);

        background_tile(&mut body, -160, -112, 3);
        background_tile(&mut body, 144, 96, 15);
        // two texture pages
        let pages_at = body.len();
        body.extend(0x0005u16.to_le_bytes());
        body.extend(((2u16 << 7) | (1 << 5) | (1 << 4) | 0x9).to_le_bytes());
        let sprites_at = body.len();
        // sprite tile
        background_tile(&mut body, 0, 0, 1);
        body.extend(0x0003u16.to_le_bytes());
        body.extend(7u16.to_le_bytes());
        body.extend([0x85, 0x02]);

        let mut data = Vec::new();
        for offset in [0, pages_at, sprites_at, body.len()] {
            data.extend((offset as u32 + 0x1000).to_le_bytes());
        }
        data.extend(body);
        data
    }

    #[test]
    fn test_single_group_layer_info() {
        let mut data = vec![0; 16];
        info(&mut data, 1, 0, 2);
        terminator(&mut data);
        for _ in 0..3 {
            terminator(&mut data);
        }
        background_tile(&mut data, 0, 0, 0);
        background_tile(&mut data, 16, 0, 0);

        let tilemap = read_tilemap(&mut RecordReader::new(&data)).unwrap();
        assert_eq!(tilemap.background.infos.len(), 1);
        assert_eq!(tilemap.background.groups.len(), 1);
        assert_eq!(tilemap.background.tile_count(), 2);
        assert!(tilemap.texture_pages.is_empty());
        assert_eq!((tilemap.width, tilemap.height), (32, 16));
    }

    #[test]
    fn test_layers_and_pages() {
        let data = sample();
        let tilemap = read_tilemap(&mut RecordReader::new(&data)).unwrap();

        assert_eq!(tilemap.background.groups.len(), 2);
        assert!(matches!(tilemap.background.groups[1], PageGroup::TextureReference { page: 1 }));
        assert_eq!(tilemap.background.tile_count(), 2);
        assert_eq!(tilemap.tile_count(), 3);

        assert_eq!(
            tilemap.texture_pages,
            vec![
                TexturePageInfo { page_x: 5, page_y: 0, blending_mode: 0, depth: 0 },
                TexturePageInfo { page_x: 9, page_y: 1, blending_mode: 1, depth: 2 },
            ]
        );

        let tiles: Vec<_> = tilemap.background.tiles().collect();
        assert_eq!(tiles[0].clut_number, 3);
        assert_eq!(tiles[1].clut_number, 15);
        assert_eq!((tiles[0].source_x, tiles[0].source_y), (32, 48));

        let sprite = tilemap.sprites.tiles().next().unwrap();
        assert_eq!(sprite.group, Some(7));
        assert_eq!(sprite.texture_page.map(|p| p.page_x), Some(3));
        assert_eq!(sprite.parameter, Some(TileParameter { blend: true, id: 5 }));
        assert_eq!(sprite.state, Some(2));
    }

    #[test]
    fn test_bounding_box() {
        let data = sample();
        let tilemap = read_tilemap(&mut RecordReader::new(&data)).unwrap();
        assert_eq!((tilemap.origin_x, tilemap.origin_y), (-160, -112));
        assert_eq!((tilemap.width, tilemap.height), (320, 224));
    }

    #[test]
    fn test_resolved_tiles_take_following_reference() {
        let data = sample();
        let tilemap = read_tilemap(&mut RecordReader::new(&data)).unwrap();
        let resolved = tilemap.background.resolved_tiles(&tilemap.texture_pages);
        assert_eq!(resolved.len(), 2);
        assert!(resolved.iter().all(|r| r.page == Some(tilemap.texture_pages[1])));

        let sprites = tilemap.sprites.resolved_tiles(&tilemap.texture_pages);
        assert_eq!(sprites[0].page.map(|p| p.page_x), Some(3));
    }

    #[test]
    fn test_empty_tilemap() {
        let mut data = vec![0; 16];
        for _ in 0..4 {
            terminator(&mut data);
        }
        let tilemap = read_tilemap(&mut RecordReader::new(&data)).unwrap();
        assert_eq!(tilemap.tile_count(), 0);
        assert_eq!((tilemap.origin_x, tilemap.width), (0, 0));
    }

    #[test]
    fn test_unterminated_layer_info() {
        let mut data = vec![0; 16];
        info(&mut data, 1, 0, 2);
        assert!(matches!(
            read_tilemap(&mut RecordReader::new(&data)),
            Err(Error::UnterminatedStream { what: "tilemap layer info", offset: 16 })
        ));
    }
}
