//! Start-up configuration for a particle field

use crate::constants::WIDTH;
use crate::error::StateError;
use crate::image::StateImage;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Size and seeding of the particle field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldConfig {
    /// Side length of the square state grid.
    pub width: u32,
    /// Fixed RNG seed. `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            width: WIDTH,
            seed: None,
        }
    }
}

impl FieldConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn particle_count(&self) -> u32 {
        self.width * self.width
    }

    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Allocate the initial state and place every particle uniformly in the unit cube.
    pub fn initial_state(&self) -> Result<StateImage, StateError> {
        let mut image = StateImage::new(self.width, self.width)?;
        image.seed_uniform_cube(&mut self.rng());
        log::info!(
            "Seeded {} particles ({}x{} state grid)",
            image.texel_count(),
            self.width,
            self.width
        );
        Ok(image)
    }
}
