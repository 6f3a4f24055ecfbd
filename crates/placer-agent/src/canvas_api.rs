//! Remote canvas client
//!
//! Two operations:
//! - resolving the current snapshot URL of a tile through a websocket
//!   subscription, raced against a timeout
//! - painting one pixel through the GraphQL mutation endpoint

use crate::config::{Endpoints, PlacerConfig};
use crate::error::AgentError;
use crate::protocol::{ClientMessage, GraphqlResponse, ServerMessage, SetPixelRequest, WS_SUBPROTOCOL};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use placer_core::{ColorIndex, TileAddress};
use std::time::Duration;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{ORIGIN, SEC_WEBSOCKET_PROTOCOL, USER_AGENT};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;

pub use crate::protocol::SubmitAck;

/// Longest response excerpt carried into a submit error
const ERROR_BODY_LIMIT: usize = 200;

/// Operations the agent needs from the remote canvas
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CanvasApi: Send + Sync {
    /// Resolve a cache-busted URL of the tile's current snapshot
    async fn resolve_tile_snapshot_url(&self, tag: &str, token: &str) -> Result<String, AgentError>;

    /// Paint one pixel
    async fn submit_pixel(
        &self,
        address: TileAddress,
        color_index: ColorIndex,
        token: &str,
    ) -> Result<SubmitAck, AgentError>;
}

/// Canvas client speaking GraphQL over websocket and HTTP
#[derive(Debug, Clone)]
pub struct GqlCanvasClient {
    http: reqwest::Client,
    endpoints: Endpoints,
    subscription_timeout: Duration,
}

impl GqlCanvasClient {
    /// Create client from configuration
    #[must_use]
    pub fn new(http: reqwest::Client, config: &PlacerConfig) -> Self {
        Self {
            http,
            endpoints: config.endpoints.clone(),
            subscription_timeout: config.subscription_timeout(),
        }
    }

    /// Open the socket, subscribe, and wait for the first snapshot name
    async fn await_snapshot_name(&self, tag: &str, token: &str) -> Result<String, AgentError> {
        let mut request = self
            .endpoints
            .realtime_ws
            .as_str()
            .into_client_request()
            .map_err(|e| AgentError::Protocol(format!("invalid realtime endpoint: {e}")))?;
        let headers = request.headers_mut();
        headers.insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(WS_SUBPROTOCOL));
        headers.insert(ORIGIN, header_value(&self.endpoints.origin)?);
        headers.insert(USER_AGENT, header_value(&self.endpoints.user_agent)?);

        let (mut socket, _) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| AgentError::Protocol(format!("subscription connect failed: {e}")))?;

        let init = encode(&ClientMessage::connection_init(token))?;
        let start = encode(&ClientMessage::subscribe_tile(&self.endpoints.team_owner, tag))?;
        for frame in [init, start] {
            socket
                .send(Message::Text(frame.into()))
                .await
                .map_err(|e| AgentError::Protocol(format!("subscription send failed: {e}")))?;
        }

        let outcome = loop {
            let frame = match socket.next().await {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => {
                    break Err(AgentError::Protocol(
                        "subscription closed before a snapshot was announced".into(),
                    ));
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => break Err(AgentError::Protocol(format!("subscription error: {e}"))),
            };

            let message: ServerMessage = match serde_json::from_str(&frame) {
                Ok(message) => message,
                Err(e) => break Err(AgentError::Protocol(format!("malformed frame: {e}"))),
            };
            if message.is_connection_error() {
                break Err(AgentError::Protocol(format!("connection rejected: {frame}")));
            }
            if let Some(name) = message.snapshot_name() {
                break Ok(name.to_owned());
            }
            tracing::trace!(kind = %message.kind, "ignoring subscription frame");
        };

        if let Err(e) = socket.close(None).await {
            tracing::debug!(error = %e, "subscription close failed");
        }
        outcome
    }
}

#[async_trait]
impl CanvasApi for GqlCanvasClient {
    async fn resolve_tile_snapshot_url(&self, tag: &str, token: &str) -> Result<String, AgentError> {
        let handshake = self.await_snapshot_name(tag, token);
        match tokio::time::timeout(self.subscription_timeout, handshake).await {
            Ok(name) => name.map(|name| cache_busted(&name, rand::random())),
            Err(_) => Err(AgentError::Timeout {
                operation: "tile snapshot subscription",
                duration_secs: self.subscription_timeout.as_secs(),
            }),
        }
    }

    async fn submit_pixel(
        &self,
        address: TileAddress,
        color_index: ColorIndex,
        token: &str,
    ) -> Result<SubmitAck, AgentError> {
        let response = self
            .http
            .post(&self.endpoints.graphql_http)
            .bearer_auth(token)
            .header(reqwest::header::ORIGIN, &self.endpoints.origin)
            .header(reqwest::header::REFERER, &self.endpoints.referer)
            .header("apollographql-client-name", &self.endpoints.client_name)
            .json(&SetPixelRequest::new(address, color_index))
            .send()
            .await
            .map_err(|e| AgentError::Submit(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Submit(format!("response unreadable: {e}")))?;
        if !status.is_success() {
            return Err(AgentError::Submit(format!("HTTP {status}: {}", excerpt(&body))));
        }

        let parsed: GraphqlResponse = serde_json::from_str(&body)
            .map_err(|e| AgentError::Submit(format!("unexpected response: {e}")))?;
        if let Some(errors) = parsed.error_summary() {
            return Err(AgentError::Submit(errors));
        }
        Ok(parsed.submit_ack())
    }
}

/// Append a cache-busting query parameter to a snapshot URL
#[must_use]
pub fn cache_busted(url: &str, nonce: u64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}noCache={nonce}")
}

fn encode(message: &ClientMessage<'_>) -> Result<String, AgentError> {
    serde_json::to_string(message).map_err(|e| AgentError::Protocol(e.to_string()))
}

fn header_value(value: &str) -> Result<HeaderValue, AgentError> {
    HeaderValue::from_str(value)
        .map_err(|e| AgentError::Protocol(format!("invalid header value {value:?}: {e}")))
}

fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((end, _)) => &body[..end],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_bust_picks_separator() {
        assert_eq!(cache_busted("https://a/b.png", 7), "https://a/b.png?noCache=7");
        assert_eq!(cache_busted("https://a/b.png?v=1", 7), "https://a/b.png?v=1&noCache=7");
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(ERROR_BODY_LIMIT + 10);
        assert_eq!(excerpt(&long).chars().count(), ERROR_BODY_LIMIT);
        assert_eq!(excerpt("short"), "short");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_protocol_error() {
        // bind then release a port so nothing listens on it
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = PlacerConfig::default();
        config.endpoints.realtime_ws = format!("ws://{addr}/query");
        let client = GqlCanvasClient::new(reqwest::Client::new(), &config);

        let err = client.resolve_tile_snapshot_url("0", "tok").await.unwrap_err();
        assert!(
            matches!(err, AgentError::Protocol(_) | AgentError::Timeout { .. }),
            "{err}"
        );
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // accepts TCP but never completes the websocket handshake
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let mut config = PlacerConfig::default();
        config.endpoints.realtime_ws = format!("ws://{addr}/query");
        config.subscription_timeout_secs = 1;
        let client = GqlCanvasClient::new(reqwest::Client::new(), &config);

        let err = client.resolve_tile_snapshot_url("0", "tok").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout { duration_secs: 1, .. }), "{err}");
        server.abort();
    }
}
