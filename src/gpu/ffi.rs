use bytemuck::{Pod, Zeroable};

use crate::cpu::field::Cell;

/// One texel of the `Rgba32Float` field texture.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GPUCell {
    // not using glam to make sure WGSL compatibility
    pub pressure: f32,
    pub velocity: f32,
    pub gradient: [f32; 2],
}

impl From<Cell> for GPUCell {
    fn from(cell: Cell) -> Self {
        Self {
            pressure: cell.pressure,
            velocity: cell.velocity,
            gradient: [cell.gradient_x, cell.gradient_y],
        }
    }
}

/// One texel of the `Rgba8UnormSrgb` output texture.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct GPUPixel(pub [u8; 4]);

impl From<glam::Vec4> for GPUPixel {
    fn from(color: glam::Vec4) -> Self {
        let c = (color.clamp(glam::Vec4::ZERO, glam::Vec4::ONE) * 255.0).round();
        Self([c.x as u8, c.y as u8, c.z as u8, c.w as u8])
    }
}
