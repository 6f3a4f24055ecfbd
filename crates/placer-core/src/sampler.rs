//! Stage-biased placement sampler
//!
//! Layer `l` of `L` layers weighs `P^(L-1-l)` per correction, so each layer
//! is `P` times as likely per correction as the layer below it. Shallow
//! (opaque) layers therefore converge first while deeper layers keep a
//! nonzero share.
//!
//! Weights are `f64`. With the default base of 4 every weight is an exact
//! power of two up to 255 layers (`4^254 = 2^508`). Once shallow layers
//! outweigh a deep layer by more than 2^53 the deep layer is no longer
//! reachable by any draw; that saturation is the intended bias.

use crate::error::SampleError;
use crate::work::{Correction, Work};
use rand::Rng;

/// Default per-layer priority base
pub const DEFAULT_PRIORITY_BASE: f64 = 4.0;

/// Weighted sampler over layered work
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    priority_base: f64,
}

impl Sampler {
    /// Create sampler with a priority base
    ///
    /// Bases below 1 would invert the bias; they are raised to 1.
    #[inline]
    #[must_use]
    pub fn new(priority_base: f64) -> Self {
        Self {
            priority_base: priority_base.max(1.0),
        }
    }

    /// Get priority base
    #[inline]
    #[must_use]
    pub fn priority_base(&self) -> f64 {
        self.priority_base
    }

    /// Per-correction weight of `layer` among `layer_count` layers
    #[must_use]
    pub fn layer_weight(&self, layer: usize, layer_count: usize) -> f64 {
        let exponent = layer_count.saturating_sub(layer + 1);
        self.priority_base
            .powi(i32::try_from(exponent).unwrap_or(i32::MAX))
    }

    /// Sum of `count(l) * weight(l)` over every layer
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_weight(&self, work: &Work) -> f64 {
        let layer_count = work.layer_count();
        work.layers()
            .iter()
            .enumerate()
            .filter(|(_, layer)| !layer.is_empty())
            .map(|(l, layer)| layer.len() as f64 * self.layer_weight(l, layer_count))
            .sum()
    }

    /// Draw one correction using `rng`
    ///
    /// # Errors
    /// See [`Sampler::pick`].
    pub fn sample<'w, R: Rng + ?Sized>(
        &self,
        work: &'w Work,
        rng: &mut R,
    ) -> Result<&'w Correction, SampleError> {
        self.pick(work, rng.random::<f64>())
    }

    /// Select the correction addressed by a uniform draw `unit` in `[0, 1)`
    ///
    /// `unit` is scaled to the total weight; layers are walked from 0 and
    /// the index inside the chosen layer is `floor(residual / weight)`,
    /// clamped to the layer. Values outside `[0, 1)` are clamped.
    ///
    /// # Errors
    /// - `SampleError::NoWork` if every layer is empty
    /// - `SampleError::NonFiniteWeight` if the total weight overflows
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn pick<'w>(&self, work: &'w Work, unit: f64) -> Result<&'w Correction, SampleError> {
        if work.is_complete() {
            return Err(SampleError::NoWork);
        }

        let total = self.total_weight(work);
        if !total.is_finite() {
            return Err(SampleError::NonFiniteWeight(total));
        }

        let unit = if unit.is_finite() {
            unit.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut residual = unit * total;
        let layer_count = work.layer_count();

        for (l, layer) in work.layers().iter().enumerate() {
            if layer.is_empty() {
                continue;
            }
            let weight = self.layer_weight(l, layer_count);
            let mass = layer.len() as f64 * weight;
            if residual < mass {
                let index = ((residual / weight).floor() as usize).min(layer.len() - 1);
                return Ok(&layer[index]);
            }
            residual -= mass;
        }

        // Rounding walked past the last layer
        work.layers()
            .iter()
            .rev()
            .find_map(|layer| layer.last())
            .ok_or(SampleError::NoWork)
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY_BASE)
    }
}
