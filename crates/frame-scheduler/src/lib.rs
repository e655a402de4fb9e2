//! # Frame Scheduler
//!
//! Per-frame ordering for the particle field: sample the clock, run one
//! simulation step, draw the stepped state. The host's event loop calls
//! [`FrameScheduler::tick`] once per display refresh.

pub mod clock;
pub mod scheduler;

pub use clock::*;
pub use scheduler::*;
