//! # Particle Simulation Engine
//!
//! Ping-pong state stepping for a texture-encoded particle field. The update
//! rule is an externally supplied fragment shader run once per texel; a CPU
//! reference stepper implements the same contract without a GPU.

pub mod cpu;
pub mod error;
pub mod scope;
pub mod shader;
pub mod simulation;
pub mod stepper;
pub mod texture;

pub use cpu::*;
pub use error::*;
pub use simulation::*;
pub use stepper::*;
pub use texture::*;
