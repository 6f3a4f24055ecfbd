//! Placer Core - template diffing and placement selection
//!
//! The pure half of the canvas placer:
//! - `Raster` storage for RGBA images
//! - Tile assembly and global-to-tile addressing
//! - The fixed 32 color palette
//! - Diffing a template against the canvas into layered work
//! - Stage-biased sampling of one correction from that work
//!
//! # Example
//!
//! ```rust
//! use placer_core::{diff, Raster, Sampler, PALETTE};
//!
//! let red = PALETTE[1].rgb();
//! let black = PALETTE[27].rgb();
//!
//! let template = Raster::from_fn(2, 1, |x, _| {
//!     if x == 0 { [red[0], red[1], red[2], 255] } else { [0, 0, 0, 0] }
//! });
//! let canvas = Raster::filled(2, 1, [black[0], black[1], black[2], 255]);
//!
//! let work = diff(&template, &canvas).unwrap();
//! assert_eq!(work.outstanding(), 1);
//!
//! let correction = Sampler::default().pick(&work, 0.5).unwrap();
//! assert_eq!((correction.x, correction.y, correction.color_index), (0, 0, 1));
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod assemble;
pub mod diff;
pub mod error;
pub mod palette;
pub mod raster;
pub mod sampler;
pub mod work;

// Re-exports for convenience
pub use assemble::{assemble, PlacedTile, TileAddress, TileLayout, TileSpec};
pub use diff::{diff, diff_with, DiffOptions, UnmappedColorPolicy};
pub use error::{AddressError, AssembleError, DiffError, RasterError, SampleError};
pub use palette::{ColorIndex, PaletteEntry, Rgb, PALETTE};
pub use raster::{Channel, Raster};
pub use sampler::{Sampler, DEFAULT_PRIORITY_BASE};
pub use work::{Correction, LayerNumber, Work};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with placer core
    pub use crate::{
        assemble, diff, Correction, PlacedTile, Raster, Sampler, TileLayout, Work, PALETTE,
    };
}
