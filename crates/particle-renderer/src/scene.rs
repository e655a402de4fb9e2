//! Scene-level draw settings

/// Everything drawn besides the particles themselves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scene {
    /// Clear colour in linear RGBA.
    pub background: wgpu::Color,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            // #000022 in linear
            background: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.01599,
                a: 1.0,
            },
        }
    }
}
