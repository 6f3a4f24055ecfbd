//! Canvas assembly and tile addressing
//!
//! The remote canvas is served as fixed-offset tiles. Assembly stitches the
//! tiles into one raster covering the full extent; addressing maps a global
//! coordinate back to the tile that owns it.

use crate::error::{AddressError, AssembleError};
use crate::raster::Raster;
use serde::{Deserialize, Serialize};

/// A fetched tile positioned on the canvas
#[derive(Debug, Clone)]
pub struct PlacedTile {
    /// Tile pixels
    pub raster: Raster,
    /// Horizontal offset of the tile origin
    pub offset_x: u32,
    /// Vertical offset of the tile origin
    pub offset_y: u32,
}

impl PlacedTile {
    /// Create new placed tile
    #[inline]
    #[must_use]
    pub fn new(raster: Raster, offset_x: u32, offset_y: u32) -> Self {
        Self {
            raster,
            offset_x,
            offset_y,
        }
    }
}

/// Stitch tiles into one raster
///
/// The result spans `(max offset_x + width) x (max offset_y + height)`.
/// Uncovered pixels stay transparent black; overlapping tiles are not
/// blended, the later tile wins.
///
/// # Errors
/// - `AssembleError::NoTiles` for an empty slice
/// - `AssembleError::ExtentOverflow` if an offset pushes the extent past `u32`
pub fn assemble(tiles: &[PlacedTile]) -> Result<Raster, AssembleError> {
    if tiles.is_empty() {
        return Err(AssembleError::NoTiles);
    }

    let mut width = 0u32;
    let mut height = 0u32;
    for tile in tiles {
        let overflow = || AssembleError::ExtentOverflow {
            offset_x: tile.offset_x,
            offset_y: tile.offset_y,
        };
        let right = tile
            .offset_x
            .checked_add(tile.raster.width())
            .ok_or_else(overflow)?;
        let bottom = tile
            .offset_y
            .checked_add(tile.raster.height())
            .ok_or_else(overflow)?;
        width = width.max(right);
        height = height.max(bottom);
    }

    let mut canvas = Raster::blank(width, height);
    for tile in tiles {
        canvas.blit(&tile.raster, tile.offset_x, tile.offset_y);
    }

    tracing::trace!(width, height, tiles = tiles.len(), "assembled canvas");
    Ok(canvas)
}

/// One tile of the configured layout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSpec {
    /// Subscription tag used to resolve the tile snapshot
    pub tag: String,
    /// Horizontal offset of the tile origin
    pub offset_x: u32,
    /// Vertical offset of the tile origin
    pub offset_y: u32,
}

impl TileSpec {
    /// Create new tile spec
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<String>, offset_x: u32, offset_y: u32) -> Self {
        Self {
            tag: tag.into(),
            offset_x,
            offset_y,
        }
    }
}

/// Tile-local address of a global coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileAddress {
    /// Position of the owning tile in the layout
    pub canvas_index: u32,
    /// Tile-local x
    pub x: u32,
    /// Tile-local y
    pub y: u32,
}

/// Ordered set of equally sized canvas tiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileLayout {
    /// Width of every tile
    pub tile_width: u32,
    /// Height of every tile
    pub tile_height: u32,
    /// Tiles in canvas index order
    pub tiles: Vec<TileSpec>,
}

impl TileLayout {
    /// Side length of a reference tile
    pub const REFERENCE_TILE_SIZE: u32 = 1000;

    /// Create layout from explicit tiles
    #[inline]
    #[must_use]
    pub fn new(tile_width: u32, tile_height: u32, tiles: Vec<TileSpec>) -> Self {
        Self {
            tile_width,
            tile_height,
            tiles,
        }
    }

    /// Row-major grid of `columns x rows` tiles tagged `"0"`, `"1"`, ...
    #[must_use]
    pub fn grid(columns: u32, rows: u32, tile_width: u32, tile_height: u32) -> Self {
        let tiles = (0..rows)
            .flat_map(|row| (0..columns).map(move |col| (col, row)))
            .enumerate()
            .map(|(i, (col, row))| TileSpec::new(i.to_string(), col * tile_width, row * tile_height))
            .collect();
        Self::new(tile_width, tile_height, tiles)
    }

    /// The 2x2 grid of 1000x1000 tiles forming a 2000x2000 canvas
    #[must_use]
    pub fn reference() -> Self {
        Self::grid(2, 2, Self::REFERENCE_TILE_SIZE, Self::REFERENCE_TILE_SIZE)
    }

    /// Get total canvas extent as `(width, height)`
    #[must_use]
    pub fn extent(&self) -> (u32, u32) {
        self.tiles.iter().fold((0, 0), |(w, h), tile| {
            (
                w.max(tile.offset_x.saturating_add(self.tile_width)),
                h.max(tile.offset_y.saturating_add(self.tile_height)),
            )
        })
    }

    /// Map a global coordinate to its tile
    ///
    /// # Errors
    /// - `AddressError::OutOfBounds` if no tile covers `(x, y)`
    pub fn locate(&self, x: u32, y: u32) -> Result<TileAddress, AddressError> {
        self.tiles
            .iter()
            .enumerate()
            .find(|(_, tile)| {
                x >= tile.offset_x
                    && y >= tile.offset_y
                    && x - tile.offset_x < self.tile_width
                    && y - tile.offset_y < self.tile_height
            })
            .map(|(index, tile)| TileAddress {
                canvas_index: u32::try_from(index).unwrap_or(u32::MAX),
                x: x - tile.offset_x,
                y: y - tile.offset_y,
            })
            .ok_or(AddressError::OutOfBounds { x, y })
    }
}

impl Default for TileLayout {
    fn default() -> Self {
        Self::reference()
    }
}
