//! Error types for the placer agent
//!
//! Every failure a cycle can hit maps onto one variant:
//! - Image retrieval and decoding
//! - Token extraction and refresh
//! - Snapshot subscription timeouts and protocol violations
//! - Rejected pixel submissions
//! - Diff, assembly, addressing and sampling failures from the core

use placer_core::{AddressError, AssembleError, DiffError, RasterError, SampleError};

/// Main agent error type
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Image could not be fetched or decoded
    #[error("failed to fetch image {url}: {reason}")]
    Fetch {
        /// Requested URL
        url: String,
        /// What went wrong
        reason: String,
    },

    /// Token could not be obtained
    #[error("authorization failed: {0}")]
    Auth(String),

    /// A bounded network wait elapsed
    #[error("{operation} timed out after {duration_secs}s")]
    Timeout {
        /// Operation that was waiting
        operation: &'static str,
        /// Bound that elapsed
        duration_secs: u64,
    },

    /// Subscription returned an error or an unexpected shape
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Pixel mutation was rejected
    #[error("pixel submission failed: {0}")]
    Submit(String),

    /// Diff failed (includes unmapped palette colors)
    #[error("diff failed: {0}")]
    Diff(#[from] DiffError),

    /// Canvas assembly failed
    #[error("canvas assembly failed: {0}")]
    Assemble(#[from] AssembleError),

    /// Correction could not be mapped to a tile
    #[error("addressing failed: {0}")]
    Address(#[from] AddressError),

    /// Sampling failed
    #[error("sampling failed: {0}")]
    Sample(#[from] SampleError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Image decoding errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Bytes are not a supported image
    #[error("decode failed: {0}")]
    Image(#[from] image::ImageError),

    /// Decoded pixels do not form a valid raster
    #[error("decoded image is not a valid raster: {0}")]
    Raster(#[from] RasterError),
}

impl AgentError {
    /// Create fetch error
    #[inline]
    pub fn fetch(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Name of the cycle step that failed
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Fetch { .. } => "image fetch",
            Self::Auth(_) => "token refresh",
            Self::Timeout { operation, .. } => operation,
            Self::Protocol(_) => "snapshot subscription",
            Self::Submit(_) => "pixel submission",
            Self::Diff(_) => "diff",
            Self::Assemble(_) => "canvas assembly",
            Self::Address(_) => "tile addressing",
            Self::Sample(_) => "placement sampling",
            Self::Config(_) => "configuration",
        }
    }

    /// Check if error is retryable
    ///
    /// Everything a cycle can raise is retried after a backoff; only a bad
    /// configuration needs an operator.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use placer_core::Rgb;

    #[test]
    fn palette_lookup_surfaces_through_diff() {
        let err: AgentError = DiffError::PaletteLookup {
            x: 10,
            y: 20,
            color: Rgb::new(1, 2, 3),
        }
        .into();
        assert_eq!(err.operation(), "diff");
        assert!(err.to_string().contains("#010203"));
        assert!(err.is_retryable());
    }

    #[test]
    fn timeout_names_operation() {
        let err = AgentError::Timeout {
            operation: "tile snapshot subscription",
            duration_secs: 5,
        };
        assert_eq!(err.operation(), "tile snapshot subscription");
        assert_eq!(
            err.to_string(),
            "tile snapshot subscription timed out after 5s"
        );
    }

    #[test]
    fn config_is_not_retryable() {
        assert!(!AgentError::Config("bad".into()).is_retryable());
        assert!(AgentError::Submit("cooldown".into()).is_retryable());
        assert!(AgentError::fetch("http://x", "404").is_retryable());
    }
}
