//! Error type for conversion operations.

use thiserror::Error;

/// Errors that can occur while converting an image.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Width or height is zero.
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: i32 },

    /// 4:2:0 chroma subsampling requires even dimensions.
    #[error("4:2:0 sources require even dimensions, got {width}x{height}")]
    OddDimensions { width: usize, height: usize },

    /// A plane stride is smaller than the row it has to cover.
    #[error("{plane} stride {stride} is below the row width {min}")]
    StrideTooSmall {
        plane: &'static str,
        stride: usize,
        min: usize,
    },

    /// A plane buffer is too small for the requested geometry.
    #[error("{plane} buffer holds {len} bytes, needs {needed}")]
    BufferTooSmall {
        plane: &'static str,
        len: usize,
        needed: usize,
    },
}
