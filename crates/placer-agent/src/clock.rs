//! Injectable sleeping
//!
//! The cycle loop only ever waits through a [`Clock`], so tests can record
//! the requested waits instead of spending them.

use async_trait::async_trait;
use std::time::Duration;

/// Source of delays for the cycle loop
#[async_trait]
pub trait Clock: Send + Sync {
    /// Wait for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
