//! The fixed canvas palette
//!
//! Template authoring and the remote canvas share one 32 entry table. A
//! template pixel is drawable only if its RGB matches one entry exactly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into [`PALETTE`] as understood by the canvas API
pub type ColorIndex = u8;

/// An RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    /// Create new color from components
    #[inline]
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02X}{g:02X}{b:02X}")
    }
}

/// One palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    /// Index sent to the canvas API
    pub index: ColorIndex,
    /// Color painted for that index
    pub color: Rgb,
}

impl PaletteEntry {
    const fn new(index: ColorIndex, r: u8, g: u8, b: u8) -> Self {
        Self {
            index,
            color: Rgb::new(r, g, b),
        }
    }

    /// Get RGB components
    #[inline]
    #[must_use]
    pub const fn rgb(&self) -> [u8; 3] {
        self.color.0
    }
}

/// The canvas palette, ordered by color index
pub const PALETTE: [PaletteEntry; 32] = [
    PaletteEntry::new(0, 0x6D, 0x00, 0x1A),
    PaletteEntry::new(1, 0xBE, 0x00, 0x39),
    PaletteEntry::new(2, 0xFF, 0x45, 0x00),
    PaletteEntry::new(3, 0xFF, 0xA8, 0x00),
    PaletteEntry::new(4, 0xFF, 0xD6, 0x35),
    PaletteEntry::new(5, 0xFF, 0xF8, 0xB8),
    PaletteEntry::new(6, 0x00, 0xA3, 0x68),
    PaletteEntry::new(7, 0x00, 0xCC, 0x78),
    PaletteEntry::new(8, 0x7E, 0xED, 0x56),
    PaletteEntry::new(9, 0x00, 0x75, 0x6F),
    PaletteEntry::new(10, 0x00, 0x9E, 0xAA),
    PaletteEntry::new(11, 0x00, 0xCC, 0xC0),
    PaletteEntry::new(12, 0x24, 0x50, 0xA4),
    PaletteEntry::new(13, 0x36, 0x90, 0xEA),
    PaletteEntry::new(14, 0x51, 0xE9, 0xF4),
    PaletteEntry::new(15, 0x49, 0x3A, 0xC1),
    PaletteEntry::new(16, 0x6A, 0x5C, 0xFF),
    PaletteEntry::new(17, 0x94, 0xB3, 0xFF),
    PaletteEntry::new(18, 0x81, 0x1E, 0x9F),
    PaletteEntry::new(19, 0xB4, 0x4A, 0xC0),
    PaletteEntry::new(20, 0xE4, 0xAB, 0xFF),
    PaletteEntry::new(21, 0xDE, 0x10, 0x7F),
    PaletteEntry::new(22, 0xFF, 0x38, 0x81),
    PaletteEntry::new(23, 0xFF, 0x99, 0xAA),
    PaletteEntry::new(24, 0x6D, 0x48, 0x2F),
    PaletteEntry::new(25, 0x9C, 0x69, 0x26),
    PaletteEntry::new(26, 0xFF, 0xB4, 0x70),
    PaletteEntry::new(27, 0x00, 0x00, 0x00),
    PaletteEntry::new(28, 0x51, 0x52, 0x52),
    PaletteEntry::new(29, 0x89, 0x8D, 0x90),
    PaletteEntry::new(30, 0xD4, 0xD7, 0xD9),
    PaletteEntry::new(31, 0xFF, 0xFF, 0xFF),
];

/// Look up the color index for an exact RGB match
#[must_use]
pub fn lookup(color: Rgb) -> Option<ColorIndex> {
    PALETTE
        .iter()
        .find(|entry| entry.color == color)
        .map(|entry| entry.index)
}

/// Get the color for an index
#[inline]
#[must_use]
pub fn color_of(index: ColorIndex) -> Option<Rgb> {
    PALETTE.get(usize::from(index)).map(|entry| entry.color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_match_positions() {
        for (i, entry) in PALETTE.iter().enumerate() {
            assert_eq!(usize::from(entry.index), i);
        }
    }

    #[test]
    fn colors_are_distinct() {
        for (i, a) in PALETTE.iter().enumerate() {
            for b in &PALETTE[i + 1..] {
                assert_ne!(a.color, b.color, "duplicate {}", a.color);
            }
        }
    }

    #[test]
    fn hex_display_is_uppercase() {
        assert_eq!(PALETTE[0].color.to_string(), "#6D001A");
        assert_eq!(PALETTE[31].color.to_string(), "#FFFFFF");
    }

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(lookup(Rgb::new(0xFF, 0x45, 0x00)), Some(2));
        assert_eq!(lookup(Rgb::new(0, 0, 0)), Some(27));
        assert_eq!(lookup(Rgb::new(1, 2, 3)), None);
    }

    #[test]
    fn color_of_out_of_range() {
        assert_eq!(color_of(27), Some(Rgb::new(0, 0, 0)));
        assert_eq!(color_of(32), None);
    }
}
