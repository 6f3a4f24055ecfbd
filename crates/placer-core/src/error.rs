//! Error types for placer core
//!
//! Each stage of the pure pipeline has its own error enum:
//! - Raster construction
//! - Tile assembly and addressing
//! - Diffing (including unmapped palette colors)
//! - Sampling

use crate::palette::Rgb;

/// Raster construction errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RasterError {
    /// Buffer length doesn't match `4 * width * height`
    #[error("raster buffer: expected {expected} bytes, got {got}")]
    BufferSizeMismatch {
        /// Required byte count
        expected: usize,
        /// Supplied byte count
        got: usize,
    },

    /// Zero width or height
    #[error("raster dimensions must be non-zero, got {width}x{height}")]
    EmptyDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },
}

/// Canvas assembly errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssembleError {
    /// No tiles supplied
    #[error("cannot assemble a canvas from zero tiles")]
    NoTiles,

    /// Assembled extent overflowed the coordinate space
    #[error("assembled canvas extent overflows at offset ({offset_x}, {offset_y})")]
    ExtentOverflow {
        /// Horizontal offset of the offending tile
        offset_x: u32,
        /// Vertical offset of the offending tile
        offset_y: u32,
    },
}

/// Global coordinate addressing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    /// Coordinate not covered by any tile
    #[error("coordinate ({x}, {y}) is outside every canvas tile")]
    OutOfBounds {
        /// Global x
        x: u32,
        /// Global y
        y: u32,
    },
}

/// Diff engine errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Template color has no palette entry
    #[error("template color {color} at ({x}, {y}) has no palette entry")]
    PaletteLookup {
        /// Template x
        x: u32,
        /// Template y
        y: u32,
        /// Unmapped template color
        color: Rgb,
    },

    /// Canvas smaller than the template
    #[error(
        "canvas {canvas_width}x{canvas_height} does not cover template {template_width}x{template_height}"
    )]
    DomainMismatch {
        /// Template width
        template_width: u32,
        /// Template height
        template_height: u32,
        /// Assembled canvas width
        canvas_width: u32,
        /// Assembled canvas height
        canvas_height: u32,
    },
}

impl DiffError {
    /// Check if error is a palette lookup failure
    #[inline]
    #[must_use]
    pub fn is_palette_lookup(&self) -> bool {
        matches!(self, Self::PaletteLookup { .. })
    }
}

/// Placement sampler errors
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SampleError {
    /// Every layer is empty
    #[error("no outstanding work to sample from")]
    NoWork,

    /// Total weight is not a finite number
    #[error("total placement weight {0} is not finite")]
    NonFiniteWeight(f64),
}
