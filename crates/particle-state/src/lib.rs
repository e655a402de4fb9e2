//! # Particle State
//!
//! CPU-side description of a texture-encoded particle field: the RGBA32F state
//! image, the ping-pong pair that owns two of them, the static per-vertex
//! attributes and the per-step uniforms.

pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod image;
pub mod ping_pong;
pub mod uniforms;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use geometry::*;
pub use image::*;
pub use ping_pong::*;
pub use uniforms::*;
