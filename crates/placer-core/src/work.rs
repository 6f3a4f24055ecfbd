//! Outstanding corrections partitioned by layer

use crate::palette::ColorIndex;
use serde::{Deserialize, Serialize};

/// Priority bucket derived from template alpha (`255 - alpha`)
pub type LayerNumber = u8;

/// One pixel whose canvas color differs from the template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Correction {
    /// Global x
    pub x: u32,
    /// Global y
    pub y: u32,
    /// Palette index the pixel should be painted with
    pub color_index: ColorIndex,
    /// Layer the pixel belongs to
    pub layer: LayerNumber,
}

/// Layered corrections produced by one diff
///
/// `layers()[l]` holds every mismatch of layer `l` in raster scan order.
/// Layers without mismatches keep their slot, so indices are layer numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Work {
    layers: Vec<Vec<Correction>>,
    skipped: usize,
}

impl Work {
    /// Create work with `layer_count` empty layers
    #[inline]
    #[must_use]
    pub fn with_layers(layer_count: usize) -> Self {
        Self {
            layers: vec![Vec::new(); layer_count],
            skipped: 0,
        }
    }

    /// Build work from explicit layers
    #[inline]
    #[must_use]
    pub fn from_layers(layers: Vec<Vec<Correction>>) -> Self {
        Self { layers, skipped: 0 }
    }

    pub(crate) fn push(&mut self, correction: Correction) {
        self.layers[usize::from(correction.layer)].push(correction);
    }

    pub(crate) fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    /// Get all layers, indexed by layer number
    #[inline]
    #[must_use]
    pub fn layers(&self) -> &[Vec<Correction>] {
        &self.layers
    }

    /// Get one layer
    #[inline]
    #[must_use]
    pub fn layer(&self, layer: LayerNumber) -> Option<&[Correction]> {
        self.layers.get(usize::from(layer)).map(Vec::as_slice)
    }

    /// Number of layer slots
    #[inline]
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total corrections across all layers
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// True when no layer holds a correction
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.layers.iter().all(Vec::is_empty)
    }

    /// Pixels dropped because their template color is not in the palette
    #[inline]
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Non-empty layers as `(layer, count)` pairs
    #[must_use]
    pub fn summary(&self) -> Vec<(usize, usize)> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, layer)| !layer.is_empty())
            .map(|(l, layer)| (l, layer.len()))
            .collect()
    }

    /// Iterate every correction, shallowest layer first
    pub fn iter(&self) -> impl Iterator<Item = &Correction> {
        self.layers.iter().flatten()
    }
}
