//! Walkmesh section

use crate::error::{Error, Result};
use crate::formats::common::RecordReader;
use glam::Vec3;
use serde::Serialize;

/// Access value for an edge with no neighbor
pub const NO_NEIGHBOR: u16 = 0xFFFF;

/// Fixed-point vertex as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Vertex {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Vertex {
    fn read(reader: &mut RecordReader<'_>) -> Result<Self> {
        let vertex = Self {
            x: reader.read_i16()?,
            y: reader.read_i16()?,
            z: reader.read_i16()?,
        };
        reader.skip(2)?;
        Ok(vertex)
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(f32::from(self.x), f32::from(self.y), f32::from(self.z))
    }
}

/// Directed triangle edge and the triangle across it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Access {
    pub from: Vertex,
    pub to: Vertex,
    pub neighbor: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Triangle {
    pub id: usize,
    pub vertices: [Vertex; 3],
    /// Edges v0→v1, v1→v2, v2→v0
    pub access: [Access; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Walkmesh {
    pub triangles: Vec<Triangle>,
}

impl Walkmesh {
    pub fn sector_count(&self) -> usize {
        self.triangles.len()
    }

    /// Triangles sharing an edge with triangle `id`
    pub fn neighbors(&self, id: usize) -> impl Iterator<Item = &Triangle> {
        self.triangles
            .get(id)
            .into_iter()
            .flat_map(|t| t.access.iter())
            .filter_map(|a| a.neighbor)
            .filter_map(|n| self.triangles.get(usize::from(n)))
    }
}

/// Decode a walkmesh: sector count, vertex pool, then access pool
///
/// # Errors
/// Returns [`Error::InvalidNeighbor`] if an edge points past the last
/// triangle, or a parse error if the pools are cut short.
pub fn read_walkmesh(reader: &mut RecordReader<'_>) -> Result<Walkmesh> {
    let count = reader.read_u32()? as usize;
    let sectors = reader.array(count, |r| -> Result<[Vertex; 3]> {
        Ok([Vertex::read(r)?, Vertex::read(r)?, Vertex::read(r)?])
    })?;
    let access = reader.array(count, |r| -> Result<[u16; 3]> {
        Ok([r.read_u16()?, r.read_u16()?, r.read_u16()?])
    })?;

    let mut triangles = Vec::with_capacity(count);
    for (id, (vertices, ids)) in sectors.into_iter().zip(access).enumerate() {
        let mut edges = [Access {
            from: vertices[0],
            to: vertices[1],
            neighbor: None,
        }; 3];
        for (edge, &neighbor) in ids.iter().enumerate() {
            if neighbor != NO_NEIGHBOR && usize::from(neighbor) >= count {
                return Err(Error::InvalidNeighbor {
                    triangle: id,
                    edge,
                    neighbor,
                    count,
                });
            }
            edges[edge] = Access {
                from: vertices[edge],
                to: vertices[(edge + 1) % 3],
                neighbor: (neighbor != NO_NEIGHBOR).then_some(neighbor),
            };
        }
        triangles.push(Triangle {
            id,
            vertices,
            access: edges,
        });
    }

    tracing::debug!("Walkmesh: {count} sectors");
    Ok(Walkmesh { triangles })
}
