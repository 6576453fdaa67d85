//! Camera section

use crate::error::Result;
use crate::formats::common::RecordReader;
use glam::Vec3;
use serde::Serialize;

/// Fixed-point scale of axes and position
pub const FIXED_ONE: f32 = 4096.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera {
    pub axis_x: Vec3,
    pub axis_y: Vec3,
    pub axis_z: Vec3,
    pub position: Vec3,
    pub zoom: u16,
}

impl Camera {
    /// Negated dot products of the position with each axis component
    pub fn translation(&self) -> Vec3 {
        let p = self.position;
        -(self.axis_x * p.x + self.axis_y * p.y + self.axis_z * p.z)
    }

    pub fn tx(&self) -> f32 {
        self.translation().x
    }

    pub fn ty(&self) -> f32 {
        self.translation().y
    }

    pub fn tz(&self) -> f32 {
        self.translation().z
    }
}

fn read_axis(reader: &mut RecordReader<'_>) -> Result<Vec3> {
    let x = reader.read_i16()?;
    let y = reader.read_i16()?;
    let z = reader.read_i16()?;
    Ok(Vec3::new(f32::from(x), f32::from(y), f32::from(z)) / FIXED_ONE)
}

/// Decode the camera; the stored y axis and position y are sign-inverted
pub fn read_camera(reader: &mut RecordReader<'_>) -> Result<Camera> {
    let axis_x = read_axis(reader)?;
    let axis_y = -read_axis(reader)?;
    let axis_z = read_axis(reader)?;
    reader.skip(2)?;

    let x = reader.read_i32()?;
    let y = reader.read_i32()?;
    let z = reader.read_i32()?;
    let position = Vec3::new(x as f32, -(y as f32), z as f32) / FIXED_ONE;
    reader.skip(4)?;
    let zoom = reader.read_u16()?;

    Ok(Camera {
        axis_x,
        axis_y,
        axis_z,
        position,
        zoom,
    })
}
