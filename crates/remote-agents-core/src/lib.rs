//! Core abstractions for the remote agent session client.
//!
//! This crate provides the fundamental building blocks shared by the
//! storage, engine and client-façade crates:
//! - The activity/session data model (`activity`, `session`).
//! - `Platform` — host-agnostic primitives (`fetch`, `sleep`, clock, uuid,
//!   hmac, file save), with a `native` implementation over tokio/reqwest.
//! - `ApiClient` — a thin, typed request layer over the Service REST API.
//! - `mapper` — translates the Service's presence-of-field REST payloads
//!   into the tagged activity/artifact variants.
//! - `tiering` — pure cache-freshness classification.
//! - `retry` — first-request eventual-consistency retry policy.
//! - `error` — the crate's error taxonomy.

pub mod activity;
pub mod api;
pub mod error;
pub mod mapper;
pub mod platform;
pub mod retry;
pub mod session;
pub mod tiering;

pub use activity::{Activity, ActivityType, Artifact, Originator};
pub use api::{ApiClient, ApiClientConfig, RestApiClient};
pub use error::{ApiError, CoreError, CoreResult};
pub use platform::Platform;
pub use session::{
    CachedSession, PullRequest, SessionId, SessionIndexEntry, SessionOutputs, SessionResource,
    SessionState, SourceContext,
};
pub use tiering::{determine_cache_tier, is_cache_valid, CacheTier};
