//! Template vs canvas diff engine
//!
//! Produces the layered [`Work`] for one cycle:
//! - alpha 0 template pixels are outside the drawable mask
//! - every other pixel lands in layer `255 - alpha`
//! - only pixels whose RGB differs from the canvas become corrections
//!
//! The layer vector is sized by a first pass over the alpha channel so the
//! second pass never grows it.

use crate::error::DiffError;
use crate::palette;
use crate::raster::{Channel, Raster};
use crate::work::{Correction, LayerNumber, Work};
use serde::{Deserialize, Serialize};

/// Behavior when a mismatching template pixel has no palette entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedColorPolicy {
    /// Fail the whole diff with `DiffError::PaletteLookup`
    #[default]
    Fail,
    /// Drop the pixel, log it and count it in `Work::skipped`
    Skip,
}

/// Diff configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    /// What to do with unmapped template colors
    pub on_unmapped: UnmappedColorPolicy,
}

impl DiffOptions {
    /// With unmapped color policy
    #[inline]
    #[must_use]
    pub fn with_unmapped(mut self, policy: UnmappedColorPolicy) -> Self {
        self.on_unmapped = policy;
        self
    }
}

/// Diff with default options (unmapped colors fail)
///
/// # Errors
/// See [`diff_with`].
pub fn diff(template: &Raster, canvas: &Raster) -> Result<Work, DiffError> {
    diff_with(template, canvas, DiffOptions::default())
}

/// Compare `template` against `canvas` and collect outstanding corrections
///
/// # Errors
/// - `DiffError::DomainMismatch` if the canvas is smaller than the template
/// - `DiffError::PaletteLookup` for an unmapped mismatching color under
///   `UnmappedColorPolicy::Fail`
pub fn diff_with(
    template: &Raster,
    canvas: &Raster,
    options: DiffOptions,
) -> Result<Work, DiffError> {
    if canvas.width() < template.width() || canvas.height() < template.height() {
        return Err(DiffError::DomainMismatch {
            template_width: template.width(),
            template_height: template.height(),
            canvas_width: canvas.width(),
            canvas_height: canvas.height(),
        });
    }

    let mut work = Work::with_layers(layer_count(template));
    if work.layer_count() == 0 {
        return Ok(work);
    }

    for y in 0..template.height() {
        for x in 0..template.width() {
            let alpha = template.channel(x, y, Channel::A);
            if alpha == 0 {
                continue;
            }

            let wanted = template.rgb(x, y);
            if wanted == canvas.rgb(x, y) {
                continue;
            }

            let layer: LayerNumber = 255 - alpha;
            match palette::lookup(wanted) {
                Some(color_index) => work.push(Correction {
                    x,
                    y,
                    color_index,
                    layer,
                }),
                None => match options.on_unmapped {
                    UnmappedColorPolicy::Fail => {
                        return Err(DiffError::PaletteLookup { x, y, color: wanted });
                    }
                    UnmappedColorPolicy::Skip => {
                        tracing::warn!(x, y, color = %wanted, "template color not in palette, skipping");
                        work.record_skipped();
                    }
                },
            }
        }
    }

    Ok(work)
}

/// `max(255 - alpha) + 1` over drawable pixels, or 0 if none
fn layer_count(template: &Raster) -> usize {
    template
        .as_bytes()
        .chunks_exact(4)
        .map(|px| px[3])
        .filter(|&alpha| alpha > 0)
        .min()
        .map_or(0, |min_alpha| usize::from(255 - min_alpha) + 1)
}
