//! Grid constants for the particle field

/// Side length of the square state texture. One texel per particle.
pub const WIDTH: u32 = 32;

/// Components stored per texel (x, y, z, w).
pub const TEXEL_COMPONENTS: usize = 4;

/// Bytes per RGBA32F texel.
pub const TEXEL_SIZE: u32 = (TEXEL_COMPONENTS * std::mem::size_of::<f32>()) as u32;

/// Value of `w` for a freshly seeded, live particle.
pub const LIVE_WEIGHT: f32 = 1.0;
