//! Testing utilities for the canvas placer workspace
//!
//! Raster builders, in-memory stand-ins for every network collaborator, and
//! a one-shot local HTTP server for exercising the real clients.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use placer_agent::{AgentError, CanvasApi, Clock, ImageSource, SubmitAck};
use placer_core::{ColorIndex, Raster, TileAddress, PALETTE};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Opaque RGBA of a palette entry
pub fn palette_rgba(index: usize) -> [u8; 4] {
    let [r, g, b] = PALETTE[index].rgb();
    [r, g, b, 255]
}

/// RGBA of a palette entry at a given alpha
pub fn palette_rgba_alpha(index: usize, alpha: u8) -> [u8; 4] {
    let [r, g, b] = PALETTE[index].rgb();
    [r, g, b, alpha]
}

/// Opaque raster filled with one palette color
pub fn solid(width: u32, height: u32, index: usize) -> Raster {
    Raster::filled(width, height, palette_rgba(index))
}

/// URL the fake canvas hands out for a tile tag
pub fn snapshot_url(tag: &str) -> String {
    format!("mem://tile/{tag}")
}

/// Image source serving rasters from memory
#[derive(Debug, Default)]
pub struct MemoryImages {
    images: Mutex<HashMap<String, Raster>>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryImages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `raster` at `url`
    pub fn with(self, url: impl Into<String>, raster: Raster) -> Self {
        self.insert(url, raster);
        self
    }

    /// Replace the raster served at `url`
    pub fn insert(&self, url: impl Into<String>, raster: Raster) {
        self.images.lock().insert(url.into(), raster);
    }

    /// Stop serving `url`
    pub fn remove(&self, url: &str) {
        self.images.lock().remove(url);
    }

    /// URLs fetched so far, in order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait]
impl ImageSource for MemoryImages {
    async fn fetch(&self, url: &str) -> Result<Raster, AgentError> {
        self.fetched.lock().push(url.to_owned());
        self.images
            .lock()
            .get(url)
            .cloned()
            .ok_or_else(|| AgentError::fetch(url, "HTTP 404 Not Found"))
    }
}

/// One recorded pixel submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub address: TileAddress,
    pub color_index: ColorIndex,
    pub token: String,
}

/// Canvas API that records calls instead of talking to a server
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    submissions: Mutex<Vec<Submission>>,
    resolve_tokens: Mutex<Vec<String>>,
    reject_submissions: Mutex<Option<String>>,
    subscription_timeout: Mutex<bool>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every submission with `reason`
    pub fn reject_with(&self, reason: impl Into<String>) {
        *self.reject_submissions.lock() = Some(reason.into());
    }

    /// Make every snapshot subscription time out
    pub fn time_out_subscriptions(&self, enabled: bool) {
        *self.subscription_timeout.lock() = enabled;
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().clone()
    }

    /// Tokens presented to snapshot subscriptions
    pub fn resolve_tokens(&self) -> Vec<String> {
        self.resolve_tokens.lock().clone()
    }
}

#[async_trait]
impl CanvasApi for RecordingCanvas {
    async fn resolve_tile_snapshot_url(&self, tag: &str, token: &str) -> Result<String, AgentError> {
        self.resolve_tokens.lock().push(token.to_owned());
        if *self.subscription_timeout.lock() {
            return Err(AgentError::Timeout {
                operation: "tile snapshot subscription",
                duration_secs: 5,
            });
        }
        Ok(snapshot_url(tag))
    }

    async fn submit_pixel(
        &self,
        address: TileAddress,
        color_index: ColorIndex,
        token: &str,
    ) -> Result<SubmitAck, AgentError> {
        if let Some(reason) = self.reject_submissions.lock().clone() {
            return Err(AgentError::Submit(reason));
        }
        self.submissions.lock().push(Submission {
            address,
            color_index,
            token: token.to_owned(),
        });
        Ok(SubmitAck::default())
    }
}

/// Clock that records requested sleeps and returns immediately
#[derive(Debug, Default)]
pub struct ManualClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Sum of all requested sleeps
    pub fn elapsed(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// Serve exactly one canned HTTP response on a local port
///
/// Returns the base URL (`http://127.0.0.1:<port>`) and a handle resolving
/// to the raw request the client sent.
pub async fn serve_http_once(
    status: &str,
    content_type: &str,
    body: impl Into<Vec<u8>>,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    let head = format!("HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\n");
    let body = body.into();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept stub connection");
        let request = read_request(&mut socket).await;
        let response = format!(
            "{head}content-length: {}\r\nconnection: close\r\n\r\n",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write head");
        socket.write_all(&body).await.expect("write body");
        let _ = socket.shutdown().await;
        request
    });

    (format!("http://{addr}"), handle)
}

/// Read request head and body (by `content-length`)
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.expect("read request");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]);
            let length = head
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_helpers_agree() {
        assert_eq!(palette_rgba(27), [0, 0, 0, 255]);
        assert_eq!(palette_rgba_alpha(31, 7), [255, 255, 255, 7]);
        assert_eq!(solid(1, 1, 31).pixel(0, 0), [255, 255, 255, 255]);
    }
}
