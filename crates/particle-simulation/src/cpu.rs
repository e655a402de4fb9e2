//! CPU reference stepper
//!
//! Runs an update rule written in Rust over a pair of [`StateImage`]s with the
//! same ping-pong semantics as the GPU path. Useful for headless hosts and as
//! the behavioural reference in tests.

use crate::stepper::StateStepper;
use particle_state::{PingPong, SimulationUniforms, StateImage, Texel, TexelCoord};

/// What an update rule sees while computing one output texel.
pub struct TexelContext<'a> {
    state: &'a StateImage,
    coord: TexelCoord,
    uniforms: &'a SimulationUniforms,
}

impl<'a> TexelContext<'a> {
    pub fn coord(&self) -> TexelCoord {
        self.coord
    }

    pub fn uniforms(&self) -> &SimulationUniforms {
        self.uniforms
    }

    /// Previous value of this texel.
    pub fn current(&self) -> Texel {
        self.neighbor(0, 0)
    }

    /// Previous value at an offset, wrapping at the grid edges.
    pub fn neighbor(&self, du: i32, dv: i32) -> Texel {
        self.state.wrapped(self.coord.u, self.coord.v, du, dv)
    }
}

/// A texel-parallel update rule: previous state in, new texel out.
pub type UpdateRule = Box<dyn Fn(&TexelContext<'_>) -> Texel>;

pub struct CpuSimulation {
    images: PingPong<StateImage>,
    rule: UpdateRule,
}

impl CpuSimulation {
    /// Bind `rule` and seed both slots from `initial`.
    pub fn configure<F>(rule: F, initial: StateImage) -> Self
    where
        F: Fn(&TexelContext<'_>) -> Texel + 'static,
    {
        log::debug!(
            "Configuring CPU simulation ({}x{})",
            initial.width(),
            initial.height()
        );
        Self {
            images: PingPong::new(initial.clone(), initial),
            rule: Box::new(rule),
        }
    }

    /// The state the next step will overwrite.
    pub fn write_target(&self) -> &StateImage {
        self.images.write()
    }

    pub fn read_index(&self) -> usize {
        self.images.read_index()
    }
}

impl StateStepper for CpuSimulation {
    type State = StateImage;

    fn current(&self) -> &StateImage {
        self.images.read()
    }

    fn step(&mut self, uniforms: &SimulationUniforms) -> &StateImage {
        {
            let (read, write) = self.images.split_mut();
            let uniforms = uniforms.with_resolution(read.width(), read.height());
            let width = read.width();

            for (index, texel) in write.texels_mut().iter_mut().enumerate() {
                let index = index as u32;
                let context = TexelContext {
                    state: read,
                    coord: TexelCoord::new(index % width, index / width),
                    uniforms: &uniforms,
                };
                *texel = (self.rule)(&context);
            }
        }

        self.images.swap();
        self.images.read()
    }

    fn particle_count(&self) -> u32 {
        self.images.read().texel_count()
    }

    fn steps(&self) -> u64 {
        self.images.swaps()
    }
}
