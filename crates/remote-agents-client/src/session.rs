//! The session façade (spec.md §4.7): identity, cached metadata reads,
//! user-facing actions, and the `activities` sub-API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use remote_agents_core::api::PageRequest;
use remote_agents_core::mapper::map_activity_json;
use remote_agents_core::{
    is_cache_valid, Activity, ActivityType, ApiClient, CachedSession, CoreError, CoreResult,
    Originator, Platform, PullRequest, SessionId, SessionOutputs, SessionResource, SessionState,
};
use remote_agents_engine::{ActivityEngine, ActivityResult};
use remote_agents_storage::{ActivityStorage, SessionStore};

/// Parse an RFC-3339 timestamp to epoch milliseconds, falling back to
/// `fallback` on a malformed string rather than failing the whole facade
/// call over one bad timestamp.
pub(crate) fn parse_rfc3339_ms(s: &str, fallback: i64) -> i64 {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(fallback)
}

/// Drive `stream` until one polling interval passes with no new item,
/// returning the count of items observed. Used by both `Session::hydrate`
/// and `ActivitiesApi::hydrate`.
pub(crate) async fn hydrate_until_quiescent(
    mut stream: BoxStream<'static, ActivityResult>,
    polling_interval: Duration,
) -> CoreResult<u64> {
    let mut count = 0u64;
    loop {
        match tokio::time::timeout(polling_interval, stream.next()).await {
            Ok(Some(item)) => {
                item?;
                count += 1;
            }
            Ok(None) | Err(_) => return Ok(count),
        }
    }
}

/// `result()`'s return value: the session's terminal state and whatever it
/// produced.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub session_id: SessionId,
    pub state: SessionState,
    pub pull_request: Option<PullRequest>,
    pub outputs: SessionOutputs,
}

/// Aggregate view built by `Session::snapshot`: current metadata plus the
/// full local timeline and a few counts derived from it.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session: SessionResource,
    pub activity_counts: HashMap<&'static str, u64>,
    pub duration_ms: i64,
    pub timeline: Vec<Activity>,
    pub insights: SessionInsights,
}

/// Counts derived from a session's timeline, cheap to recompute from
/// `SessionSnapshot::timeline` alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionInsights {
    pub message_count: u64,
    pub plan_step_count: u64,
    pub file_change_count: u64,
    pub terminal: bool,
}

/// A single page of a direct, cache-bypassing activity fetch.
#[derive(Debug, Clone)]
pub struct ActivityListPage {
    pub activities: Vec<Activity>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListOptions {
    pub page_size: u32,
    pub page_token: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            page_token: None,
        }
    }
}

/// Read-only projection options for `ActivitiesApi::select`.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub originator_exclude: Vec<Originator>,
    pub limit: Option<usize>,
}

/// `activities` sub-API (spec.md §4.7): cache-first reads plus a
/// cache-bypassing `list` for tools that must see server truth.
pub struct ActivitiesApi {
    api: Arc<dyn ApiClient>,
    storage: Arc<dyn ActivityStorage>,
    engine: Arc<ActivityEngine>,
    session_id: SessionId,
    polling_interval: Duration,
}

impl ActivitiesApi {
    pub async fn get(&self, id: &str) -> CoreResult<Option<Activity>> {
        self.storage.get(id).await.map_err(CoreError::from)
    }

    pub async fn latest(&self) -> CoreResult<Option<Activity>> {
        self.storage.latest().await.map_err(CoreError::from)
    }

    /// Read-only projection over the local cache; never touches the
    /// network.
    pub async fn select(&self, opts: &SelectOptions) -> CoreResult<Vec<Activity>> {
        let mut activities = self.storage.scan().await.map_err(CoreError::from)?;
        activities.retain(|a| !opts.originator_exclude.contains(&a.originator));
        if let Some(limit) = opts.limit {
            activities.truncate(limit);
        }
        Ok(activities)
    }

    /// Same catch-up as `Session::hydrate`, returning only the count.
    pub async fn hydrate(&self) -> CoreResult<u64> {
        hydrate_until_quiescent(self.engine.updates(), self.polling_interval).await
    }

    /// Paginated direct fetch, bypassing the local cache entirely.
    pub async fn list(&self, opts: ListOptions) -> CoreResult<ActivityListPage> {
        let page = self
            .api
            .list_activities(
                &self.session_id,
                PageRequest {
                    page_size: opts.page_size,
                    page_token: opts.page_token,
                },
            )
            .await
            .map_err(CoreError::from)?;
        let activities = page
            .activities
            .iter()
            .map(map_activity_json)
            .collect::<Result<Vec<_>, _>>()
            .map_err(CoreError::from)?;
        Ok(ActivityListPage {
            activities,
            next_page_token: page.next_page_token,
        })
    }
}

/// The session façade (spec.md §4.7).
pub struct Session {
    session_id: SessionId,
    api: Arc<dyn ApiClient>,
    platform: Arc<dyn Platform>,
    session_store: Arc<dyn SessionStore>,
    activity_store: Arc<dyn ActivityStorage>,
    engine: Arc<ActivityEngine>,
    polling_interval: Duration,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        session_id: SessionId,
        api: Arc<dyn ApiClient>,
        platform: Arc<dyn Platform>,
        session_store: Arc<dyn SessionStore>,
        activity_store: Arc<dyn ActivityStorage>,
        engine: Arc<ActivityEngine>,
        polling_interval: Duration,
    ) -> Self {
        Self {
            session_id,
            api,
            platform,
            session_store,
            activity_store,
            engine,
            polling_interval,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.session_id
    }

    #[must_use]
    pub fn activities(&self) -> ActivitiesApi {
        ActivitiesApi {
            api: self.api.clone(),
            storage: self.activity_store.clone(),
            engine: self.engine.clone(),
            session_id: self.session_id.clone(),
            polling_interval: self.polling_interval,
        }
    }

    #[must_use]
    pub fn history(&self) -> BoxStream<'static, ActivityResult> {
        self.engine.history()
    }

    #[must_use]
    pub fn updates(&self) -> BoxStream<'static, ActivityResult> {
        self.engine.updates()
    }

    #[must_use]
    pub fn stream(&self) -> BoxStream<'static, ActivityResult> {
        self.engine.stream()
    }

    /// `GET` the session resource through the cache-tiering rule: a hit
    /// served from the warm or frozen tier skips the network entirely.
    pub async fn info(&self) -> CoreResult<SessionResource> {
        let now_ms = self.platform.now_millis();
        if let Some(cached) = self
            .session_store
            .get(&self.session_id)
            .await
            .map_err(CoreError::from)?
        {
            let create_ms = parse_rfc3339_ms(&cached.resource.create_time, now_ms);
            if is_cache_valid(&cached, create_ms, now_ms) {
                return Ok(cached.resource);
            }
        }

        let resource = self.api.get_session(&self.session_id).await?;
        self.session_store
            .upsert(CachedSession {
                resource: resource.clone(),
                last_synced_at: now_ms,
            })
            .await
            .map_err(CoreError::from)?;
        Ok(resource)
    }

    /// Drains `history()` plus current `info()` into a single aggregate.
    pub async fn snapshot(&self) -> CoreResult<SessionSnapshot> {
        let session = self.info().await?;
        let now_ms = self.platform.now_millis();

        let mut history = self.history();
        let mut timeline = Vec::new();
        while let Some(item) = history.next().await {
            timeline.push(item?);
        }

        let mut activity_counts: HashMap<&'static str, u64> = HashMap::new();
        let mut insights = SessionInsights {
            terminal: session.state.is_terminal(),
            ..SessionInsights::default()
        };
        for activity in &timeline {
            *activity_counts.entry(activity.activity_type.tag()).or_insert(0) += 1;
            match &activity.activity_type {
                ActivityType::AgentMessaged { .. } | ActivityType::UserMessaged { .. } => {
                    insights.message_count += 1;
                }
                ActivityType::PlanGenerated { plan } => {
                    insights.plan_step_count += plan.steps.len() as u64;
                }
                _ => {}
            }
            insights.file_change_count += activity
                .artifacts
                .iter()
                .filter(|artifact| matches!(artifact, remote_agents_core::Artifact::ChangeSet { .. }))
                .count() as u64;
        }

        let create_ms = parse_rfc3339_ms(&session.create_time, now_ms);
        let end_ms = timeline
            .last()
            .map_or(now_ms, |a| parse_rfc3339_ms(&a.create_time, now_ms));
        let duration_ms = (end_ms - create_ms).max(0);

        Ok(SessionSnapshot {
            session,
            activity_counts,
            duration_ms,
            timeline,
            insights,
        })
    }

    /// Runs `updates()` implicitly until network quiescence for one
    /// polling interval; returns the count of newly persisted activities.
    pub async fn hydrate(&self) -> CoreResult<u64> {
        hydrate_until_quiescent(self.engine.updates(), self.polling_interval).await
    }

    /// Blocks until the session's `state` is terminal.
    ///
    /// # Errors
    /// `CoreError::AutomatedSessionFailed` if the terminal state is
    /// `failed`.
    pub async fn result(&self) -> CoreResult<SessionResult> {
        loop {
            let session = self.info().await?;
            if session.state.is_terminal() {
                if session.state == SessionState::Failed {
                    let reason = session
                        .outputs
                        .extra
                        .get("reason")
                        .and_then(|v| v.as_str())
                        .map(String::from);
                    return Err(CoreError::AutomatedSessionFailed { reason });
                }
                return Ok(SessionResult {
                    session_id: self.session_id.clone(),
                    state: session.state,
                    pull_request: session.outputs.pull_request.clone(),
                    outputs: session.outputs,
                });
            }
            self.platform.sleep(self.polling_interval).await;
        }
    }

    pub async fn message(&self, text: &str) -> CoreResult<()> {
        self.api
            .send_message(&self.session_id, text)
            .await
            .map_err(CoreError::from)
    }

    /// Rejects with `InvalidStateError` unless the session is currently
    /// `awaitingPlanApproval`.
    pub async fn approve_plan(&self, plan_id: &str) -> CoreResult<()> {
        let session = self.info().await?;
        if session.state != SessionState::AwaitingPlanApproval {
            return Err(CoreError::InvalidState(format!(
                "session {} is not awaiting plan approval",
                self.session_id
            )));
        }
        self.api
            .approve_plan(&self.session_id, plan_id)
            .await
            .map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_parses_known_instant() {
        let ms = parse_rfc3339_ms("2026-01-01T00:00:00Z", 0);
        assert_eq!(ms, 1_767_225_600_000);
    }

    #[test]
    fn rfc3339_falls_back_on_garbage() {
        assert_eq!(parse_rfc3339_ms("not-a-time", 42), 42);
    }
}
