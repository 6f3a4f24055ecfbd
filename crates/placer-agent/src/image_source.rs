//! Raster retrieval
//!
//! Fetches an image over HTTP and decodes it into a [`Raster`].

use crate::config::PlacerConfig;
use crate::error::{AgentError, DecodeError};
use async_trait::async_trait;
use placer_core::Raster;

/// Something that turns an image URL into a raster
#[async_trait]
pub trait ImageSource: Send + Sync {
    /// Fetch and decode the image at `url`
    async fn fetch(&self, url: &str) -> Result<Raster, AgentError>;
}

/// Image source backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpImageSource {
    http: reqwest::Client,
}

impl HttpImageSource {
    /// Create new HTTP image source
    #[inline]
    #[must_use]
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Raster, AgentError> {
        tracing::debug!(url, "loading image");
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AgentError::fetch(url, e))?;
        let bytes = response.bytes().await.map_err(|e| AgentError::fetch(url, e))?;

        decode_rgba(&bytes).map_err(|e| AgentError::fetch(url, e))
    }
}

/// Decode an encoded image into an RGBA raster
///
/// # Errors
/// - `DecodeError::Image` if the bytes are not a supported image
/// - `DecodeError::Raster` for an image without pixels
pub fn decode_rgba(bytes: &[u8]) -> Result<Raster, DecodeError> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = image.dimensions();
    Ok(Raster::from_rgba(width, height, image.into_raw())?)
}

/// Build the shared HTTP client
///
/// Every request carries the configured user agent and is bounded by the
/// configured request timeout.
///
/// # Errors
/// - `AgentError::Config` if the client cannot be constructed
pub fn build_http_client(config: &PlacerConfig) -> Result<reqwest::Client, AgentError> {
    reqwest::Client::builder()
        .user_agent(config.endpoints.user_agent.clone())
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| AgentError::Config(format!("http client: {e}")))
}
