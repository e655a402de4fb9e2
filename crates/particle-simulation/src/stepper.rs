//! The stepping contract shared by the GPU and CPU simulations

use particle_state::SimulationUniforms;

/// Advances a ping-pong particle state by one tick.
///
/// `step` runs the update rule with the write slot as destination and the read
/// slot as input, swaps roles, and returns the new read slot. The returned
/// reference is only valid until the next call: the slot behind it becomes the
/// write target on the following step.
pub trait StateStepper {
    type State;

    /// The fully written state of the last step, or the seed before any step.
    fn current(&self) -> &Self::State;

    fn step(&mut self, uniforms: &SimulationUniforms) -> &Self::State;

    fn particle_count(&self) -> u32;

    /// Steps taken since configuration.
    fn steps(&self) -> u64;
}
