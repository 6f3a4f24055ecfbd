//! Cycle controller
//!
//! One cycle loads the template and every canvas tile, diffs them, and
//! either reports the work complete or submits one sampled correction.
//! Cycles never overlap: [`CycleController::step`] waits out the cooldown,
//! idle interval or backoff before returning.

use crate::canvas_api::{CanvasApi, SubmitAck};
use crate::clock::Clock;
use crate::config::{Pause, PlacerConfig};
use crate::error::AgentError;
use crate::image_source::ImageSource;
use crate::token::TokenReader;
use placer_core::palette::color_of;
use placer_core::{
    assemble, diff_with, Correction, DiffOptions, PlacedTile, Raster, Sampler, TileAddress,
    TileLayout, Work,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;

/// Result of one successful cycle
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Canvas matches the template
    WorkComplete,
    /// One correction was submitted
    Submitted {
        /// The submitted correction
        correction: Correction,
        /// Tile address it was sent to
        address: TileAddress,
        /// Server acknowledgement
        ack: SubmitAck,
    },
}

/// One cycle plus the wait that followed it
#[derive(Debug)]
pub struct Step {
    /// What the cycle did
    pub outcome: Result<CycleOutcome, AgentError>,
    /// How long the controller waited afterwards
    pub waited: Duration,
}

/// Running counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Cycles started
    pub cycles: u64,
    /// Corrections submitted
    pub submissions: u64,
    /// Cycles that found nothing to do
    pub completions: u64,
    /// Cycles aborted by an error
    pub failures: u64,
    /// Outstanding corrections seen by the last successful diff
    pub last_outstanding: usize,
}

/// Waits applied after each kind of cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pauses {
    cooldown: Pause,
    idle: Pause,
    backoff: Pause,
}

/// Drives the placement loop
pub struct CycleController {
    template_url: String,
    layout: TileLayout,
    diff_options: DiffOptions,
    sampler: Sampler,
    pauses: Pauses,
    images: Arc<dyn ImageSource>,
    canvas: Arc<dyn CanvasApi>,
    token: TokenReader,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    stats: CycleStats,
}

impl std::fmt::Debug for CycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleController")
            .field("template_url", &self.template_url)
            .field("tiles", &self.layout.tiles.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl CycleController {
    /// Create controller from configuration and collaborators
    #[must_use]
    pub fn new(
        config: &PlacerConfig,
        images: Arc<dyn ImageSource>,
        canvas: Arc<dyn CanvasApi>,
        token: TokenReader,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            template_url: config.template_url.clone(),
            layout: config.layout.clone(),
            diff_options: config.diff_options(),
            sampler: config.sampler(),
            pauses: Pauses {
                cooldown: config.cooldown,
                idle: config.idle,
                backoff: config.backoff,
            },
            images,
            canvas,
            token,
            clock,
            rng: StdRng::from_os_rng(),
            stats: CycleStats::default(),
        }
    }

    /// Replace the random source (sampling and jitter)
    #[inline]
    #[must_use]
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Get running counters
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Run cycles forever
    pub async fn run(&mut self) {
        loop {
            self.step().await;
        }
    }

    /// Run one cycle and wait the interval its outcome calls for
    ///
    /// Errors are logged and turned into a backoff; they never propagate.
    pub async fn step(&mut self) -> Step {
        self.stats.cycles += 1;
        let outcome = self.run_cycle().await;

        let (pause, label) = match &outcome {
            Ok(CycleOutcome::Submitted { .. }) => {
                self.stats.submissions += 1;
                (self.pauses.cooldown, "until the next placement")
            }
            Ok(CycleOutcome::WorkComplete) => {
                self.stats.completions += 1;
                tracing::info!("work done, canvas matches the template");
                (self.pauses.idle, "before checking again")
            }
            Err(e) => {
                self.stats.failures += 1;
                tracing::error!(operation = e.operation(), error = %e, "cycle failed");
                if matches!(e, AgentError::Diff(d) if d.is_palette_lookup()) {
                    tracing::warn!("set unmapped_colors = \"skip\" to place the rest of the template");
                }
                (self.pauses.backoff, "before retrying")
            }
        };

        let waited = pause.draw(&mut self.rng);
        tracing::info!("waiting {}s {label}", waited.as_secs());
        self.clock.sleep(waited).await;

        Step { outcome, waited }
    }

    /// Run one cycle without waiting
    ///
    /// # Errors
    /// Any failure of fetching, diffing, sampling or submitting.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, AgentError> {
        tracing::info!(url = %self.template_url, "loading template");
        let template = self.images.fetch(&self.template_url).await?;

        tracing::info!("loading canvas");
        let canvas = self.load_canvas().await?;

        let work = diff_with(&template, &canvas, self.diff_options)?;
        self.stats.last_outstanding = work.outstanding();
        log_work(&work);

        if work.is_complete() {
            return Ok(CycleOutcome::WorkComplete);
        }

        let correction = *self.sampler.sample(&work, &mut self.rng)?;
        let address = self.layout.locate(correction.x, correction.y)?;
        tracing::info!(
            color = %color_of(correction.color_index).map_or_else(String::new, |c| c.to_string()),
            "attempting to place ({}, {}), part of stage {}",
            correction.x,
            correction.y,
            correction.layer
        );

        let token = self.token.current()?;
        let ack = self
            .canvas
            .submit_pixel(address, correction.color_index, &token)
            .await?;
        tracing::info!(
            next_available = ?ack.next_available,
            "placed ({}, {})",
            correction.x,
            correction.y
        );

        Ok(CycleOutcome::Submitted {
            correction,
            address,
            ack,
        })
    }

    /// Resolve, fetch and stitch every tile of the layout
    async fn load_canvas(&self) -> Result<Raster, AgentError> {
        let mut tiles = Vec::with_capacity(self.layout.tiles.len());
        for spec in &self.layout.tiles {
            let token = self.token.current()?;
            let url = self.canvas.resolve_tile_snapshot_url(&spec.tag, &token).await?;
            tracing::debug!(tag = %spec.tag, %url, "resolved tile snapshot");
            let raster = self.images.fetch(&url).await?;
            tiles.push(PlacedTile::new(raster, spec.offset_x, spec.offset_y));
        }
        Ok(assemble(&tiles)?)
    }
}

fn log_work(work: &Work) {
    if work.skipped() > 0 {
        tracing::warn!(skipped = work.skipped(), "template pixels with unmapped colors");
    }
    let summary = work.summary();
    if let Some(&(stage, count)) = summary.first() {
        tracing::info!(
            outstanding = work.outstanding(),
            stages = summary.len(),
            "{count} pixels left in stage {stage}"
        );
    }
    tracing::debug!(?summary, "outstanding pixels per stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas_api::MockCanvasApi;
    use crate::token::TokenCell;
    use async_trait::async_trait;
    use placer_core::{TileSpec, PALETTE};
    use std::collections::HashMap;

    struct MapImages(HashMap<String, Raster>);

    #[async_trait]
    impl ImageSource for MapImages {
        async fn fetch(&self, url: &str) -> Result<Raster, AgentError> {
            self.0
                .get(url)
                .cloned()
                .ok_or_else(|| AgentError::fetch(url, "404"))
        }
    }

    struct NoWait;

    #[async_trait]
    impl Clock for NoWait {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn rgba(index: usize) -> [u8; 4] {
        let [r, g, b] = PALETTE[index].rgb();
        [r, g, b, 255]
    }

    fn two_tile_config() -> PlacerConfig {
        PlacerConfig::default()
            .with_template_url("mem://template")
            .with_layout(TileLayout::new(
                2,
                2,
                vec![TileSpec::new("left", 0, 0), TileSpec::new("right", 2, 0)],
            ))
    }

    #[tokio::test]
    async fn submits_to_mapped_tile_with_current_token() {
        // only pixel (3, 1) differs: right tile, local (1, 1)
        let template = Raster::from_fn(4, 2, |x, y| if (x, y) == (3, 1) { rgba(2) } else { rgba(31) });
        let images = MapImages(HashMap::from([
            ("mem://template".to_string(), template),
            ("snap-left".to_string(), Raster::filled(2, 2, rgba(31))),
            ("snap-right".to_string(), Raster::filled(2, 2, rgba(31))),
        ]));

        let mut canvas = MockCanvasApi::new();
        canvas
            .expect_resolve_tile_snapshot_url()
            .times(2)
            .returning(|tag, token| {
                assert_eq!(token, "tok-1");
                Ok(format!("snap-{tag}"))
            });
        canvas
            .expect_submit_pixel()
            .times(1)
            .withf(|address, color, token| {
                *address
                    == TileAddress {
                        canvas_index: 1,
                        x: 1,
                        y: 1,
                    }
                    && *color == 2
                    && token == "tok-1"
            })
            .returning(|_, _, _| Ok(SubmitAck::default()));

        let cell = TokenCell::with_token("tok-1");
        let mut controller = CycleController::new(
            &two_tile_config(),
            Arc::new(images),
            Arc::new(canvas),
            cell.reader(),
            Arc::new(NoWait),
        )
        .with_rng(StdRng::seed_from_u64(1));

        let step = controller.step().await;
        let outcome = step.outcome.unwrap();
        assert!(matches!(
            outcome,
            CycleOutcome::Submitted { correction, .. } if (correction.x, correction.y) == (3, 1)
        ));
        assert!(step.waited >= Duration::from_secs(305));
        assert_eq!(controller.stats().submissions, 1);
        assert_eq!(controller.stats().last_outstanding, 1);
    }

    #[tokio::test]
    async fn missing_token_aborts_before_subscribing() {
        let mut canvas = MockCanvasApi::new();
        canvas.expect_resolve_tile_snapshot_url().never();
        canvas.expect_submit_pixel().never();

        let images = MapImages(HashMap::from([(
            "mem://template".to_string(),
            Raster::filled(4, 2, rgba(0)),
        )]));
        let cell = TokenCell::new();
        let mut controller = CycleController::new(
            &two_tile_config(),
            Arc::new(images),
            Arc::new(canvas),
            cell.reader(),
            Arc::new(NoWait),
        );

        let step = controller.step().await;
        assert!(matches!(step.outcome, Err(AgentError::Auth(_))));
        assert!(step.waited >= Duration::from_secs(30));
        assert!(step.waited < Duration::from_secs(35));
        assert_eq!(controller.stats().failures, 1);
    }
}
