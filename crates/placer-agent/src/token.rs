//! Authorization token handling
//!
//! The token is single-writer state: a [`TokenRefresher`] owns the
//! [`TokenCell`] and is the only code that publishes into it, while the
//! cycle loop reads through cloned [`TokenReader`]s that always see the
//! latest published value.

use crate::error::AgentError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Marker preceding the token in the token page body
const ACCESS_TOKEN_MARKER: &str = "\"accessToken\":\"";

/// Writable side of the shared token
#[derive(Debug)]
pub struct TokenCell {
    tx: watch::Sender<Option<Arc<str>>>,
}

impl TokenCell {
    /// Create empty cell
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Create cell holding `token`
    #[must_use]
    pub fn with_token(token: impl Into<Arc<str>>) -> Self {
        let cell = Self::new();
        cell.publish(token);
        cell
    }

    /// Replace the current token
    pub fn publish(&self, token: impl Into<Arc<str>>) {
        self.tx.send_replace(Some(token.into()));
    }

    /// Create a reader observing this cell
    #[inline]
    #[must_use]
    pub fn reader(&self) -> TokenReader {
        TokenReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for TokenCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the shared token
#[derive(Debug, Clone)]
pub struct TokenReader {
    rx: watch::Receiver<Option<Arc<str>>>,
}

impl TokenReader {
    /// Get the latest token
    ///
    /// # Errors
    /// - `AgentError::Auth` if no token was ever published
    pub fn current(&self) -> Result<Arc<str>, AgentError> {
        self.rx
            .borrow()
            .clone()
            .ok_or_else(|| AgentError::Auth("no token has been obtained yet".into()))
    }
}

/// Something that can mint a fresh token
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Obtain a new token
    async fn fetch_token(&self) -> Result<String, AgentError>;
}

/// Token source that scrapes the token page using a session cookie
#[derive(Debug, Clone)]
pub struct SessionTokenProvider {
    http: reqwest::Client,
    page_url: String,
    cookie: String,
}

impl SessionTokenProvider {
    /// Create provider for `page_url` sending `cookie_name=session`
    #[must_use]
    pub fn new(
        http: reqwest::Client,
        page_url: impl Into<String>,
        cookie_name: &str,
        session: &str,
    ) -> Self {
        Self {
            http,
            page_url: page_url.into(),
            cookie: format!("{cookie_name}={session}"),
        }
    }
}

#[async_trait]
impl TokenSource for SessionTokenProvider {
    async fn fetch_token(&self) -> Result<String, AgentError> {
        let response = self
            .http
            .get(&self.page_url)
            .header(reqwest::header::COOKIE, &self.cookie)
            .send()
            .await
            .map_err(|e| AgentError::Auth(format!("token page request failed: {e}")))?;
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Auth(format!("token page unreadable: {e}")))?;

        extract_access_token(&body)
            .map(str::to_owned)
            .ok_or_else(|| AgentError::Auth("access token not found in page body".into()))
    }
}

/// Find the access token embedded in a page body
#[must_use]
pub fn extract_access_token(body: &str) -> Option<&str> {
    let (_, rest) = body.split_once(ACCESS_TOKEN_MARKER)?;
    let token = rest.split('"').next()?;
    (!token.is_empty()).then_some(token)
}

/// Periodically republishes a fresh token
pub struct TokenRefresher {
    source: Arc<dyn TokenSource>,
    cell: TokenCell,
    period: Duration,
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("period", &self.period)
            .finish_non_exhaustive()
    }
}

impl TokenRefresher {
    /// Create refresher publishing into a new cell
    #[must_use]
    pub fn new(source: Arc<dyn TokenSource>, period: Duration) -> Self {
        Self {
            source,
            cell: TokenCell::new(),
            period,
        }
    }

    /// Create a reader of the refreshed token
    #[inline]
    #[must_use]
    pub fn reader(&self) -> TokenReader {
        self.cell.reader()
    }

    /// Fetch and publish one token
    ///
    /// On failure the previously published token stays in place.
    ///
    /// # Errors
    /// - whatever the token source reports, usually `AgentError::Auth`
    pub async fn refresh(&self) -> Result<(), AgentError> {
        let token = self.source.fetch_token().await?;
        self.cell.publish(token);
        tracing::info!("authorization token refreshed");
        Ok(())
    }

    /// Refresh every period on a background task
    ///
    /// The first refresh happens one period from now; call
    /// [`TokenRefresher::refresh`] beforehand to prime the cell.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.period;
            let mut ticker = tokio::time::interval_at(start, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    tracing::warn!(error = %e, "token refresh failed, keeping previous token");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail_from: usize,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch_token(&self) -> Result<String, AgentError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.fail_from {
                Err(AgentError::Auth("refused".into()))
            } else {
                Ok(format!("token-{n}"))
            }
        }
    }

    fn counting(fail_from: usize) -> Arc<CountingSource> {
        Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            fail_from,
        })
    }

    #[test]
    fn extracts_token_from_page() {
        let body = r#"<script>{"user":{"session":{"accessToken":"abc.DEF-123","expires":1}}}</script>"#;
        assert_eq!(extract_access_token(body), Some("abc.DEF-123"));
    }

    #[test]
    fn missing_or_empty_token_is_none() {
        assert_eq!(extract_access_token("<html></html>"), None);
        assert_eq!(extract_access_token(r#"{"accessToken":""}"#), None);
    }

    #[test]
    fn empty_cell_reports_auth_error() {
        let cell = TokenCell::new();
        assert!(matches!(cell.reader().current(), Err(AgentError::Auth(_))));
    }

    #[test]
    fn readers_observe_latest_publish() {
        let cell = TokenCell::with_token("first");
        let a = cell.reader();
        let b = a.clone();
        cell.publish("second");
        assert_eq!(&*a.current().unwrap(), "second");
        assert_eq!(&*b.current().unwrap(), "second");
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_token() {
        let source = counting(2);
        let refresher = TokenRefresher::new(source, Duration::from_secs(60));
        let reader = refresher.reader();

        refresher.refresh().await.unwrap();
        assert!(refresher.refresh().await.is_err());
        assert_eq!(&*reader.current().unwrap(), "token-1");
    }

    #[tokio::test(start_paused = true)]
    async fn background_refresh_follows_period() {
        let source = counting(usize::MAX);
        let period = Duration::from_secs(30 * 60);
        let refresher = TokenRefresher::new(source.clone(), period);
        let reader = refresher.reader();
        refresher.refresh().await.unwrap();
        let handle = refresher.spawn();

        tokio::time::sleep(period / 2).await;
        assert_eq!(&*reader.current().unwrap(), "token-1");

        tokio::time::sleep(period * 2).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
        assert_eq!(&*reader.current().unwrap(), "token-3");

        handle.abort();
    }
}
