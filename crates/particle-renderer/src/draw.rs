//! The draw seam driven by the frame scheduler

use crate::camera::Camera;
use crate::scene::Scene;
use crate::viewport::ViewportConfig;

/// Renders one frame from a borrowed simulation state.
///
/// `state` is only borrowed for the call. Implementations must not keep it:
/// the slot behind it becomes a write target on the next step.
pub trait DrawPass {
    type State;
    type Target: ?Sized;

    fn draw(&mut self, target: &Self::Target, scene: &Scene, camera: &Camera, state: &Self::State);

    /// Output surface changed size. Simulation state is unaffected.
    fn resize(&mut self, viewport: &ViewportConfig);
}
