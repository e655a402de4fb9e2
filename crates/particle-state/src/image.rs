//! CPU-side RGBA32F state buffer
//!
//! Texel `(u, v)` holds `(x, y, z, w)` for exactly one particle. Texels are
//! stored row-major, so particle `i` lives at `u = i % width`, `v = i / width`.

use crate::constants::LIVE_WEIGHT;
use crate::error::StateError;
use rand::Rng;

/// One RGBA32F texel: particle position in `xyz`, liveness weight in `w`.
pub type Texel = [f32; 4];

/// Address of a texel in the state grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TexelCoord {
    pub u: u32,
    pub v: u32,
}

impl TexelCoord {
    pub const fn new(u: u32, v: u32) -> Self {
        Self { u, v }
    }

    /// Row-major particle index of this texel.
    pub fn index(self, width: u32) -> usize {
        (self.v * width + self.u) as usize
    }
}

/// Floating point state image, the CPU mirror of a state texture.
#[derive(Clone, Debug, PartialEq)]
pub struct StateImage {
    width: u32,
    height: u32,
    texels: Vec<Texel>,
}

impl StateImage {
    /// Allocate a zero-initialized `width x height` image.
    pub fn new(width: u32, height: u32) -> Result<Self, StateError> {
        if width == 0 || height == 0 {
            return Err(StateError::EmptyGrid { width, height });
        }

        Ok(Self {
            width,
            height,
            texels: vec![[0.0; 4]; (width * height) as usize],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel_count(&self) -> u32 {
        self.width * self.height
    }

    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    pub fn texels_mut(&mut self) -> &mut [Texel] {
        &mut self.texels
    }

    /// Raw bytes in upload order (row-major, tightly packed).
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    pub fn contains(&self, coord: TexelCoord) -> bool {
        coord.u < self.width && coord.v < self.height
    }

    pub fn texel(&self, u: u32, v: u32) -> Option<Texel> {
        let coord = TexelCoord::new(u, v);
        self.contains(coord)
            .then(|| self.texels[coord.index(self.width)])
    }

    pub fn set_texel(&mut self, u: u32, v: u32, value: Texel) -> Result<(), StateError> {
        let coord = TexelCoord::new(u, v);
        if !self.contains(coord) {
            return Err(StateError::OutOfBounds {
                u,
                v,
                width: self.width,
                height: self.height,
            });
        }
        let index = coord.index(self.width);
        self.texels[index] = value;
        Ok(())
    }

    /// Texel at `(u + du, v + dv)` with repeat wrapping on both axes.
    pub fn wrapped(&self, u: u32, v: u32, du: i32, dv: i32) -> Texel {
        let wu = (u as i64 + du as i64).rem_euclid(self.width as i64) as u32;
        let wv = (v as i64 + dv as i64).rem_euclid(self.height as i64) as u32;
        self.texels[TexelCoord::new(wu, wv).index(self.width)]
    }

    /// Overwrite every texel with `fill(coord)`, visiting texels in row-major order.
    pub fn seed<F>(&mut self, mut fill: F)
    where
        F: FnMut(TexelCoord) -> Texel,
    {
        let width = self.width;
        for (index, texel) in self.texels.iter_mut().enumerate() {
            let index = index as u32;
            *texel = fill(TexelCoord::new(index % width, index / width));
        }
    }

    /// Uniform random `x, y, z` in `[0, 1)`, `w` set to the live weight.
    pub fn seed_uniform_cube<R: Rng>(&mut self, rng: &mut R) {
        self.seed(|_| {
            [
                rng.random::<f32>(),
                rng.random::<f32>(),
                rng.random::<f32>(),
                LIVE_WEIGHT,
            ]
        });
    }

    /// Fail unless this image is `width x height`.
    pub fn ensure_same_size(&self, width: u32, height: u32) -> Result<(), StateError> {
        if self.width != width || self.height != height {
            return Err(StateError::SizeMismatch {
                expected_width: width,
                expected_height: height,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn new_image_is_zeroed() {
        let image = StateImage::new(3, 2).unwrap();
        assert_eq!(image.texel_count(), 6);
        assert!(image.texels().iter().all(|t| *t == [0.0; 4]));
        assert_eq!(image.as_bytes().len(), 6 * 16);
    }

    #[test]
    fn zero_dimension_is_an_error() {
        assert_eq!(
            StateImage::new(0, 4),
            Err(StateError::EmptyGrid { width: 0, height: 4 })
        );
    }

    #[test]
    fn written_texel_reads_back_exactly() {
        let mut image = StateImage::new(4, 4).unwrap();
        image.set_texel(2, 3, [0.25, -1.5, 3.0e-7, 1.0]).unwrap();
        assert_eq!(image.texel(2, 3), Some([0.25, -1.5, 3.0e-7, 1.0]));
        assert_eq!(image.texels()[3 * 4 + 2], [0.25, -1.5, 3.0e-7, 1.0]);
    }

    #[test]
    fn out_of_bounds_access() {
        let mut image = StateImage::new(2, 2).unwrap();
        assert_eq!(image.texel(2, 0), None);
        assert!(matches!(
            image.set_texel(0, 2, [1.0; 4]),
            Err(StateError::OutOfBounds { u: 0, v: 2, .. })
        ));
    }

    #[test]
    fn seed_visits_row_major() {
        let mut image = StateImage::new(3, 2).unwrap();
        let mut visited = Vec::new();
        image.seed(|coord| {
            visited.push(coord);
            [coord.u as f32, coord.v as f32, 0.0, 1.0]
        });
        assert_eq!(visited.len(), 6);
        assert_eq!(visited[4], TexelCoord::new(1, 1));
        assert_eq!(image.texel(2, 1), Some([2.0, 1.0, 0.0, 1.0]));
    }

    #[test]
    fn constant_fill_on_two_wide_grid() {
        let mut image = StateImage::new(2, 2).unwrap();
        image.seed(|_| [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(image.texel(0, 0), Some([0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn uniform_cube_seed_is_in_range_and_live() {
        let mut image = StateImage::new(32, 32).unwrap();
        image.seed_uniform_cube(&mut StdRng::seed_from_u64(11));
        for texel in image.texels() {
            assert!(texel[..3].iter().all(|c| (0.0..1.0).contains(c)));
            assert_eq!(texel[3], LIVE_WEIGHT);
        }
    }

    #[test]
    fn seeding_twice_with_the_same_seed_is_identical() {
        let mut first = StateImage::new(8, 8).unwrap();
        let mut second = StateImage::new(8, 8).unwrap();
        first.seed_uniform_cube(&mut StdRng::seed_from_u64(42));
        second.seed_uniform_cube(&mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);

        second.seed_uniform_cube(&mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn wrapped_lookup_repeats() {
        let mut image = StateImage::new(3, 3).unwrap();
        image.seed(|c| [c.u as f32, c.v as f32, 0.0, 1.0]);
        assert_eq!(image.wrapped(0, 0, -1, -1), [2.0, 2.0, 0.0, 1.0]);
        assert_eq!(image.wrapped(2, 1, 1, 0), [0.0, 1.0, 0.0, 1.0]);
        assert_eq!(image.wrapped(1, 1, 0, 7), [1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn single_texel_grid() {
        let mut image = StateImage::new(1, 1).unwrap();
        image.seed(|_| [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(image.wrapped(0, 0, 5, -3), [0.5, 0.5, 0.5, 1.0]);
    }
}
