//! Session resources, the local cache wrapper, and index rows.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Session identifier, opaque to the core.
pub type SessionId = String;

/// Lifecycle state of a remote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Queued,
    Planning,
    InProgress,
    AwaitingPlanApproval,
    AwaitingUserFeedback,
    Completed,
    Failed,
}

impl SessionState {
    /// `true` for `completed`/`failed`, the two terminal states `result()`
    /// blocks on and the tiering rule in [`crate::tiering`] checks.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A source repository context a session runs against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceContext {
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub branch: Option<String>,
}

/// A pull request produced by a session, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub url: String,
    pub number: u64,
    pub title: String,
}

/// Outputs a session may have produced by the time it terminates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionOutputs {
    #[serde(default)]
    pub pull_request: Option<PullRequest>,
    #[serde(default)]
    pub extra: HashMap<String, Value>,
}

/// Summary of a remote session, as returned by `GET sessions/{sid}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResource {
    pub id: SessionId,
    pub name: String,
    pub create_time: String,
    pub update_time: String,
    pub state: SessionState,
    pub title: String,
    pub prompt: String,
    pub url: String,
    #[serde(default)]
    pub source_context: Option<SourceContext>,
    #[serde(default)]
    pub outputs: SessionOutputs,
}

/// A session resource plus the wall-clock time it was last fetched,
/// persisted by the session storage layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedSession {
    pub resource: SessionResource,
    /// Wall-clock milliseconds since epoch, per [`crate::platform::Platform::now_millis`].
    pub last_synced_at: i64,
}

/// Compact row for the session index, used for listing without loading
/// every session's full resource.
///
/// The index is an append-only log; the latest row per `id` wins (readers
/// coalesce by `updated_at`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionIndexEntry {
    pub id: SessionId,
    pub title: String,
    pub state: SessionState,
    pub create_time: String,
    #[serde(default)]
    pub source: Option<SourceContext>,
    pub updated_at: i64,
    #[serde(default)]
    pub activity_count: Option<u64>,
    #[serde(default)]
    pub activity_high_water_mark: Option<String>,
}

/// Coalesce a sequence of (possibly duplicate-by-id) index rows, keeping
/// the newest `updated_at` per `id`.
#[must_use]
pub fn coalesce_index(rows: impl IntoIterator<Item = SessionIndexEntry>) -> Vec<SessionIndexEntry> {
    let mut latest: HashMap<SessionId, SessionIndexEntry> = HashMap::new();
    for row in rows {
        match latest.get(&row.id) {
            Some(existing) if existing.updated_at >= row.updated_at => {}
            _ => {
                latest.insert(row.id.clone(), row);
            }
        }
    }
    let mut out: Vec<_> = latest.into_values().collect();
    out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    out
}
