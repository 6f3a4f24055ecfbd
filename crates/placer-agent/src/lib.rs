//! Placer Agent - keeps a shared canvas in line with a template
//!
//! Wires the pure diff/sample core to the outside world:
//! - Fetches the template and canvas tiles as rasters
//! - Resolves tile snapshots through the realtime subscription
//! - Submits one sampled correction per cycle
//! - Refreshes the authorization token in the background
//!
//! # Example
//!
//! ```rust,ignore
//! use placer_agent::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn example(session: &str) -> Result<(), AgentError> {
//! let config = PlacerConfig::from_env()?;
//! let http = build_http_client(&config)?;
//!
//! let provider = SessionTokenProvider::new(
//!     http.clone(),
//!     config.endpoints.token_page.clone(),
//!     &config.endpoints.session_cookie_name,
//!     session,
//! );
//! let refresher = TokenRefresher::new(Arc::new(provider), config.token_refresh());
//! refresher.refresh().await?;
//! let token = refresher.reader();
//! let _refresh_task = refresher.spawn();
//!
//! let mut controller = CycleController::new(
//!     &config,
//!     Arc::new(HttpImageSource::new(http.clone())),
//!     Arc::new(GqlCanvasClient::new(http, &config)),
//!     token,
//!     Arc::new(TokioClock),
//! );
//! controller.run().await;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod canvas_api;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod image_source;
pub mod protocol;
pub mod token;

// Re-exports for convenience
pub use canvas_api::{CanvasApi, GqlCanvasClient, SubmitAck};
pub use clock::{Clock, TokioClock};
pub use config::{Endpoints, Pause, PlacerConfig, CONFIG_ENV_VAR};
pub use controller::{CycleController, CycleOutcome, CycleStats, Step};
pub use error::{AgentError, DecodeError};
pub use image_source::{build_http_client, decode_rgba, HttpImageSource, ImageSource};
pub use token::{SessionTokenProvider, TokenCell, TokenReader, TokenRefresher, TokenSource};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running the placer agent
    pub use crate::{
        build_http_client, AgentError, CanvasApi, Clock, CycleController, CycleOutcome,
        GqlCanvasClient, HttpImageSource, ImageSource, PlacerConfig, SessionTokenProvider,
        TokenReader, TokenRefresher, TokioClock,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
