//! Host-agnostic primitives the rest of the core is built on.
//!
//! `Platform` is the seam between this crate and its host: a native build
//! backs it with `tokio`/`reqwest`/`hmac`; a browser embedding would back
//! it with `fetch`, an indexed database and `window.crypto` instead. The
//! core never reaches for `tokio::fs` or `reqwest` directly outside of
//! [`native`] — every suspension point in the engine goes through this
//! trait.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

#[cfg(feature = "native")]
pub mod native;

/// An HTTP method, limited to what the Service's REST surface uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A request to be performed by [`Platform::fetch`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// The response to a [`Platform::fetch`] call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Transport-level failure from [`Platform::fetch`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("cancelled")]
    Cancelled,
}

/// Host primitives required by the core: network, time, identifiers and a
/// durable single-file write for the log storage backend.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Perform an HTTP request. Must be cancellable: dropping the future
    /// aborts the in-flight request without leaving side effects.
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;

    /// Suspend for `duration`. Must be cancellable.
    async fn sleep(&self, duration: Duration);

    /// Monotonic wall-clock milliseconds since the Unix epoch. Used for
    /// cache tiering and `_lastSyncedAt`/`_updatedAt` stamps.
    fn now_millis(&self) -> i64;

    /// Generate an opaque unique identifier (used where the Service does
    /// not assign one, e.g. idempotency keys on writes).
    fn new_uuid(&self) -> String;

    /// HMAC-SHA256 over `data` with `key`, hex-encoded. Used by hosts that
    /// need to sign requests; the core itself only calls this when a
    /// consumer's `ApiClient` customization asks for it.
    fn hmac_sha256_hex(&self, key: &[u8], data: &[u8]) -> String;

    /// Atomically write `contents` to `path`, replacing any existing file.
    /// Used by the log storage backend's metadata sidecar.
    async fn save_file(&self, path: &std::path::Path, contents: &[u8]) -> std::io::Result<()>;
}
