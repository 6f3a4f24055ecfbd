//! Fixed-size RGBA raster
//!
//! Pixels are stored row-major, four bytes per pixel. Rasters are immutable
//! once built; assembly writes into a private buffer before wrapping it.

use crate::error::RasterError;
use crate::palette::Rgb;

/// One of the four raster channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Red
    R = 0,
    /// Green
    G = 1,
    /// Blue
    B = 2,
    /// Alpha
    A = 3,
}

/// Immutable RGBA image
#[derive(Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Raster {
    /// Wrap an RGBA buffer
    ///
    /// # Errors
    /// - `RasterError::EmptyDimensions` if either dimension is zero
    /// - `RasterError::BufferSizeMismatch` if `data.len() != 4 * width * height`
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyDimensions { width, height });
        }
        let expected = byte_len(width, height);
        if data.len() != expected {
            return Err(RasterError::BufferSizeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create raster with every pixel set to `rgba`
    ///
    /// # Panics
    /// If either dimension is zero.
    #[must_use]
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::from_fn(width, height, |_, _| rgba)
    }

    /// Create raster by evaluating `f(x, y)` for every pixel
    ///
    /// # Panics
    /// If either dimension is zero.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> [u8; 4]) -> Self {
        assert!(width > 0 && height > 0, "raster dimensions must be non-zero");
        let mut data = Vec::with_capacity(byte_len(width, height));
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Transparent black raster used as an assembly target
    pub(crate) fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; byte_len(width, height)],
        }
    }

    /// Get width
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get height
    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read one channel of one pixel
    ///
    /// # Panics
    /// If `(x, y)` is outside the raster.
    #[inline]
    #[must_use]
    pub fn channel(&self, x: u32, y: u32, c: Channel) -> u8 {
        self.data[self.offset(x, y) + c as usize]
    }

    /// Read all four channels of one pixel
    ///
    /// # Panics
    /// If `(x, y)` is outside the raster.
    #[inline]
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let at = self.offset(x, y);
        [
            self.data[at],
            self.data[at + 1],
            self.data[at + 2],
            self.data[at + 3],
        ]
    }

    /// Read the RGB part of one pixel
    #[inline]
    #[must_use]
    pub fn rgb(&self, x: u32, y: u32) -> Rgb {
        let [r, g, b, _] = self.pixel(x, y);
        Rgb::new(r, g, b)
    }

    /// Get raw row-major RGBA bytes
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Copy `tile` into this raster with its origin at `(offset_x, offset_y)`
    ///
    /// Rows are copied as slices; the caller guarantees the tile fits.
    pub(crate) fn blit(&mut self, tile: &Raster, offset_x: u32, offset_y: u32) {
        let row_bytes = tile.width as usize * 4;
        for y in 0..tile.height {
            let src = tile.offset(0, y);
            let dst = self.offset(offset_x, offset_y + y);
            self.data[dst..dst + row_bytes].copy_from_slice(&tile.data[src..src + row_bytes]);
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) outside {}x{} raster",
            self.width,
            self.height
        );
        (y as usize * self.width as usize + x as usize) * 4
    }
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgba_validates_length() {
        let err = Raster::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            RasterError::BufferSizeMismatch {
                expected: 16,
                got: 15
            }
        );
        assert!(Raster::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn from_rgba_rejects_zero_dimensions() {
        assert!(matches!(
            Raster::from_rgba(0, 3, Vec::new()),
            Err(RasterError::EmptyDimensions { .. })
        ));
    }

    #[test]
    fn channel_lookup_is_row_major() {
        let data: Vec<u8> = (0..24).collect();
        let raster = Raster::from_rgba(3, 2, data).unwrap();

        assert_eq!(raster.channel(0, 0, Channel::R), 0);
        assert_eq!(raster.channel(1, 0, Channel::G), 5);
        assert_eq!(raster.channel(0, 1, Channel::A), 15);
        assert_eq!(raster.pixel(2, 1), [20, 21, 22, 23]);
        assert_eq!(raster.rgb(2, 1), Rgb::new(20, 21, 22));
    }

    #[test]
    fn from_fn_visits_every_pixel() {
        let raster = Raster::from_fn(4, 3, |x, y| [x as u8, y as u8, 0, 255]);
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(raster.pixel(x, y), [x as u8, y as u8, 0, 255]);
            }
        }
    }

    #[test]
    fn blit_places_rows() {
        let mut target = Raster::blank(4, 4);
        let tile = Raster::filled(2, 2, [9, 9, 9, 255]);
        target.blit(&tile, 2, 1);

        assert_eq!(target.pixel(2, 1), [9, 9, 9, 255]);
        assert_eq!(target.pixel(3, 2), [9, 9, 9, 255]);
        assert_eq!(target.pixel(1, 1), [0, 0, 0, 0]);
        assert_eq!(target.pixel(2, 3), [0, 0, 0, 0]);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn out_of_range_read_panics() {
        let raster = Raster::filled(1, 1, [0; 4]);
        let _ = raster.channel(1, 0, Channel::R);
    }
}
