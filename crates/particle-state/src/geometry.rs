//! Static per-vertex attributes of the point cloud
//!
//! Each vertex maps to one texel of the state texture through its reference
//! coordinate. The seed position is only what the vertex would show without a
//! state texture; the render shader overrides it with the sampled state.

use crate::error::StateError;
use crate::image::StateImage;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertex layout uploaded once at start-up (20 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    /// Texel lookup coordinate in `[0, 1)^2` (`@location(0)`).
    pub reference: [f32; 2],
    /// Initial position before any step has run (`@location(1)`).
    pub seed_position: [f32; 3],
}

/// Reference coordinate of vertex `index` in a `width`-wide grid.
pub fn reference_uv(index: u32, width: u32) -> Vec2 {
    Vec2::new((index % width) as f32, (index / width) as f32) / width as f32
}

/// Per-particle attribute buffers.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleGeometry {
    width: u32,
    vertices: Vec<ParticleVertex>,
}

impl ParticleGeometry {
    /// One vertex per texel of `initial`, seeded from its `xyz`.
    pub fn build(initial: &StateImage) -> Result<Self, StateError> {
        let (width, height) = (initial.width(), initial.height());
        if width != height {
            return Err(StateError::NotSquare { width, height });
        }

        let vertices = initial
            .texels()
            .iter()
            .enumerate()
            .map(|(index, texel)| {
                let seed = Vec3::new(texel[0], texel[1], texel[2]);
                ParticleVertex {
                    reference: reference_uv(index as u32, width).to_array(),
                    seed_position: seed.to_array(),
                }
            })
            .collect();

        Ok(Self { width, vertices })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn particle_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    pub fn vertices(&self) -> &[ParticleVertex] {
        &self.vertices
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices.iter().map(|v| Vec3::from_array(v.seed_position))
    }

    pub fn reference_uvs(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.vertices.iter().map(|v| Vec2::from_array(v.reference))
    }
}
