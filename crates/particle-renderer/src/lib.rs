//! # Particle Renderer
//!
//! Draws the particle field as points, displacing every vertex by the state
//! texture produced by the simulation.

pub mod camera;
pub mod draw;
pub mod renderer;
pub mod scene;
pub mod viewport;

pub use camera::*;
pub use draw::*;
pub use renderer::*;
pub use scene::*;
pub use viewport::*;
