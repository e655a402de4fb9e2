//! Per-step parameters for the update shader

use bytemuck::{Pod, Zeroable};

/// Uniform block bound at `@group(0) @binding(1)` of the update shader.
///
/// Layout matches the WGSL `SimulationUniforms` struct (16 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct SimulationUniforms {
    /// Seconds since the pipeline started. Monotonic.
    pub time: f32,
    /// Seconds since the previous step.
    pub delta: f32,
    /// State texture size in texels, filled in by the stepper.
    pub resolution: [f32; 2],
}

impl SimulationUniforms {
    pub fn new(time: f32, delta: f32) -> Self {
        Self {
            time,
            delta,
            resolution: [0.0; 2],
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = [width as f32, height as f32];
        self
    }
}
