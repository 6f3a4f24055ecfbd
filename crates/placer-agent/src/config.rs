//! Agent configuration
//!
//! Defaults carry the reference deployment values. A TOML file named by the
//! `PLACER_CONFIG` environment variable may override any subset of fields.

use crate::error::AgentError;
use placer_core::{DiffOptions, Sampler, TileLayout, UnmappedColorPolicy, DEFAULT_PRIORITY_BASE};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an optional TOML config file
pub const CONFIG_ENV_VAR: &str = "PLACER_CONFIG";

/// Placer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacerConfig {
    /// Template image URL
    pub template_url: String,
    /// Canvas tile layout
    pub layout: TileLayout,
    /// Per-layer priority base for the sampler
    pub priority_base: f64,
    /// Handling of template colors missing from the palette
    pub unmapped_colors: UnmappedColorPolicy,
    /// Wait after a submission attempt
    pub cooldown: Pause,
    /// Wait after a cycle found no outstanding work
    pub idle: Pause,
    /// Wait after a failed cycle
    pub backoff: Pause,
    /// Token refresh period in seconds
    pub token_refresh_secs: u64,
    /// Snapshot subscription handshake timeout in seconds
    pub subscription_timeout_secs: u64,
    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
    /// Remote endpoints and request identity
    pub endpoints: Endpoints,
}

impl PlacerConfig {
    /// With template URL
    #[inline]
    #[must_use]
    pub fn with_template_url(mut self, url: impl Into<String>) -> Self {
        self.template_url = url.into();
        self
    }

    /// With tile layout
    #[inline]
    #[must_use]
    pub fn with_layout(mut self, layout: TileLayout) -> Self {
        self.layout = layout;
        self
    }

    /// With unmapped color policy
    #[inline]
    #[must_use]
    pub fn with_unmapped_colors(mut self, policy: UnmappedColorPolicy) -> Self {
        self.unmapped_colors = policy;
        self
    }

    /// Parse TOML, filling missing fields with defaults
    ///
    /// # Errors
    /// - `AgentError::Config` on malformed TOML or invalid values
    pub fn from_toml_str(source: &str) -> Result<Self, AgentError> {
        let config: Self =
            toml::from_str(source).map_err(|e| AgentError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// - `AgentError::Config` if the file is unreadable or invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Load from `PLACER_CONFIG` if set, defaults otherwise
    ///
    /// # Errors
    /// - `AgentError::Config` if the named file is unreadable or invalid
    pub fn from_env() -> Result<Self, AgentError> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => {
                tracing::info!(path = %Path::new(&path).display(), "loading configuration");
                Self::load(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check values that would make the agent misbehave
    ///
    /// # Errors
    /// - `AgentError::Config` describing the first invalid field
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.layout.tiles.is_empty() {
            return Err(AgentError::Config("layout must contain at least one tile".into()));
        }
        if self.layout.tile_width == 0 || self.layout.tile_height == 0 {
            return Err(AgentError::Config("tile dimensions must be non-zero".into()));
        }
        if !self.priority_base.is_finite() || self.priority_base < 1.0 {
            return Err(AgentError::Config(format!(
                "priority_base must be a finite number >= 1, got {}",
                self.priority_base
            )));
        }
        if self.subscription_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(AgentError::Config("timeouts must be non-zero".into()));
        }
        if self.token_refresh_secs == 0 {
            return Err(AgentError::Config("token_refresh_secs must be non-zero".into()));
        }
        Ok(())
    }

    /// Sampler built from the priority base
    #[inline]
    #[must_use]
    pub fn sampler(&self) -> Sampler {
        Sampler::new(self.priority_base)
    }

    /// Diff options built from the unmapped color policy
    #[inline]
    #[must_use]
    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions::default().with_unmapped(self.unmapped_colors)
    }

    /// Token refresh period
    #[inline]
    #[must_use]
    pub fn token_refresh(&self) -> Duration {
        Duration::from_secs(self.token_refresh_secs)
    }

    /// Subscription handshake timeout
    #[inline]
    #[must_use]
    pub fn subscription_timeout(&self) -> Duration {
        Duration::from_secs(self.subscription_timeout_secs)
    }

    /// HTTP request timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            template_url: "https://lukemiles49.github.io/site-test/assets/template.png".into(),
            layout: TileLayout::reference(),
            priority_base: DEFAULT_PRIORITY_BASE,
            unmapped_colors: UnmappedColorPolicy::Fail,
            cooldown: Pause::new(Duration::from_secs(305), Duration::from_secs(5)),
            idle: Pause::new(Duration::from_secs(30), Duration::from_secs(5)),
            backoff: Pause::new(Duration::from_secs(30), Duration::from_secs(5)),
            token_refresh_secs: 30 * 60,
            subscription_timeout_secs: 5,
            request_timeout_secs: 30,
            endpoints: Endpoints::default(),
        }
    }
}

/// A wait of `base` plus uniform jitter in `[0, jitter)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pause {
    /// Fixed part in milliseconds
    pub base_ms: u64,
    /// Upper bound of the random part in milliseconds
    #[serde(default)]
    pub jitter_ms: u64,
}

impl Pause {
    /// Create new pause
    #[must_use]
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self {
            base_ms: u64::try_from(base.as_millis()).unwrap_or(u64::MAX),
            jitter_ms: u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Pause without jitter
    #[inline]
    #[must_use]
    pub fn fixed(base: Duration) -> Self {
        Self::new(base, Duration::ZERO)
    }

    /// Draw one concrete wait
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rng.random_range(0..self.jitter_ms)
        };
        Duration::from_millis(self.base_ms.saturating_add(jitter))
    }
}

/// Remote endpoints and the identity presented to them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Page whose body embeds the access token
    pub token_page: String,
    /// Websocket endpoint for snapshot subscriptions
    pub realtime_ws: String,
    /// HTTP endpoint for GraphQL mutations
    pub graphql_http: String,
    /// `Origin` header value
    pub origin: String,
    /// `Referer` header value for mutations
    pub referer: String,
    /// `User-Agent` header value
    pub user_agent: String,
    /// `apollographql-client-name` header value
    pub client_name: String,
    /// Subscription channel owner
    pub team_owner: String,
    /// Name of the session cookie sent to the token page
    pub session_cookie_name: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            token_page: "https://www.reddit.com/r/place/".into(),
            realtime_ws: "wss://gql-realtime-2.reddit.com/query".into(),
            graphql_http: "https://gql-realtime-2.reddit.com/query".into(),
            origin: "https://hot-potato.reddit.com".into(),
            referer: "https://hot-potato.reddit.com/".into(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:98.0) Gecko/20100101 Firefox/98.0"
                .into(),
            client_name: "mona-lisa".into(),
            team_owner: "AFD2022".into(),
            session_cookie_name: "reddit_session".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn defaults_match_reference_values() {
        let config = PlacerConfig::default();
        assert_eq!(config.layout, TileLayout::reference());
        assert_eq!(config.priority_base, 4.0);
        assert_eq!(config.cooldown, Pause { base_ms: 305_000, jitter_ms: 5_000 });
        assert_eq!(config.idle, Pause { base_ms: 30_000, jitter_ms: 5_000 });
        assert_eq!(config.backoff, config.idle);
        assert_eq!(config.token_refresh(), Duration::from_secs(1800));
        assert_eq!(config.subscription_timeout(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PlacerConfig::from_toml_str(
            r#"
            template_url = "https://example.com/t.png"
            unmapped_colors = "skip"

            [cooldown]
            base_ms = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.template_url, "https://example.com/t.png");
        assert_eq!(config.unmapped_colors, UnmappedColorPolicy::Skip);
        assert_eq!(config.cooldown, Pause::fixed(Duration::from_secs(1)));
        assert_eq!(config.idle, PlacerConfig::default().idle);
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn custom_layout_parses() {
        let config = PlacerConfig::from_toml_str(
            r#"
            [layout]
            tile_width = 500
            tile_height = 500
            tiles = [
                { tag = "a", offset_x = 0, offset_y = 0 },
                { tag = "b", offset_x = 500, offset_y = 0 },
            ]
            "#,
        )
        .unwrap();
        assert_eq!(config.layout.extent(), (1000, 500));
        assert_eq!(config.layout.locate(700, 10).unwrap().canvas_index, 1);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            PlacerConfig::from_toml_str("priority_base = 0.5"),
            Err(AgentError::Config(_))
        ));
        assert!(matches!(
            PlacerConfig::from_toml_str("subscription_timeout_secs = 0"),
            Err(AgentError::Config(_))
        ));
        assert!(matches!(
            PlacerConfig::from_toml_str("template_url = 5"),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("placer.toml");
        std::fs::write(&path, "token_refresh_secs = 60\n").unwrap();

        let config = PlacerConfig::load(&path).unwrap();
        assert_eq!(config.token_refresh(), Duration::from_secs(60));
        assert!(PlacerConfig::load(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn pause_draw_stays_in_range() {
        let pause = Pause::new(Duration::from_secs(30), Duration::from_secs(5));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let wait = pause.draw(&mut rng);
            assert!(wait >= Duration::from_secs(30));
            assert!(wait < Duration::from_secs(35));
        }
        assert_eq!(
            Pause::fixed(Duration::from_millis(10)).draw(&mut rng),
            Duration::from_millis(10)
        );
    }
}
