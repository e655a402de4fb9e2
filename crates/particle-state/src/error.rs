use thiserror::Error;

/// Errors raised while building or addressing CPU-side particle state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("state grid must have a non-zero size, got {width}x{height}")]
    EmptyGrid { width: u32, height: u32 },

    #[error("texel ({u}, {v}) is outside the {width}x{height} state grid")]
    OutOfBounds { u: u32, v: u32, width: u32, height: u32 },

    #[error("particle geometry needs a square state grid, got {width}x{height}")]
    NotSquare { width: u32, height: u32 },

    #[error("state grids differ: expected {expected_width}x{expected_height}, got {width}x{height}")]
    SizeMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },
}
