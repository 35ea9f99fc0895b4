//! The activity streaming engine: `history`, `updates` and `stream` over a
//! single session.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, BoxStream};
use futures::StreamExt;
use remote_agents_core::api::PageRequest;
use remote_agents_core::mapper::map_activity_json;
use remote_agents_core::retry::with_first_request_retry;
use remote_agents_core::{Activity, ApiClient, CoreError, CoreResult, Originator, Platform, SessionId};
use remote_agents_storage::ActivityStorage;

use crate::cursor::Cursor;

const PAGE_SIZE: u32 = 50;

/// Item type every producer yields: a mapped, persisted, filtered
/// [`Activity`], or the error that stopped the stream.
pub type ActivityResult = CoreResult<Activity>;

/// Streams a single session's activities against its API client and local
/// storage.
///
/// Cheap to clone-construct per call: `history`/`updates`/`stream` each
/// take `&self` and return an owned, `'static` stream so callers can drop
/// the engine itself once the stream is spawned.
pub struct ActivityEngine {
    api: Arc<dyn ApiClient>,
    platform: Arc<dyn Platform>,
    storage: Arc<dyn ActivityStorage>,
    session_id: SessionId,
    originator_exclude: Vec<Originator>,
    polling_interval: Duration,
}

impl ActivityEngine {
    #[must_use]
    pub fn new(
        api: Arc<dyn ApiClient>,
        platform: Arc<dyn Platform>,
        storage: Arc<dyn ActivityStorage>,
        session_id: SessionId,
        originator_exclude: Vec<Originator>,
        polling_interval: Duration,
    ) -> Self {
        Self {
            api,
            platform,
            storage,
            session_id,
            originator_exclude,
            polling_interval,
        }
    }

    /// Replays the local store, in insertion order, to exhaustion, then
    /// ends.
    #[must_use]
    pub fn history(&self) -> BoxStream<'static, ActivityResult> {
        let storage = self.storage.clone();
        let exclude = self.originator_exclude.clone();
        stream::once(async move { storage.scan().await.map_err(CoreError::from) })
            .flat_map(move |result| {
                let exclude = exclude.clone();
                match result {
                    Ok(activities) => stream::iter(
                        activities
                            .into_iter()
                            .filter(move |a| !exclude.contains(&a.originator))
                            .map(Ok::<Activity, CoreError>)
                            .collect::<Vec<_>>(),
                    )
                    .boxed(),
                    Err(e) => stream::iter(vec![Err::<Activity, CoreError>(e)]).boxed(),
                }
            })
            .boxed()
    }

    /// Yields only activities strictly newer than the local high-water
    /// mark at call time, indefinitely, by polling the API. Never ends on
    /// its own; callers stop it by dropping the stream.
    #[must_use]
    pub fn updates(&self) -> BoxStream<'static, ActivityResult> {
        let storage = self.storage.clone();
        let engine = self.poll_parts();
        stream::once(async move { storage.scan().await.map_err(CoreError::from) })
            .flat_map(move |result| match result {
                Ok(activities) => {
                    // Advance over the full scan, not just latest(): sibling
                    // activities sharing latest()'s createTime would
                    // otherwise be missing from seen_ids_at_last_time and
                    // re-yielded on the first poll.
                    let mut cursor = Cursor::new();
                    for activity in &activities {
                        cursor.advance(activity);
                    }
                    stream::unfold(PollState::new(engine.clone(), cursor), poll_step).boxed()
                }
                Err(e) => stream::iter(vec![Err::<Activity, CoreError>(e)]).boxed(),
            })
            .boxed()
    }

    /// `history()` concatenated with `updates()`: one continuous,
    /// monotonically-increasing feed, with the same dedup bookkeeping
    /// carried from replay into the live phase.
    #[must_use]
    pub fn stream(&self) -> BoxStream<'static, ActivityResult> {
        let storage = self.storage.clone();
        let exclude = self.originator_exclude.clone();
        let engine = self.poll_parts();
        stream::once(async move { storage.scan().await.map_err(CoreError::from) })
            .flat_map(move |result| {
                let exclude = exclude.clone();
                let engine = engine.clone();
                match result {
                    Ok(activities) => {
                        let mut cursor = Cursor::new();
                        let mut to_yield = VecDeque::with_capacity(activities.len());
                        for activity in activities {
                            cursor.advance(&activity);
                            if !exclude.contains(&activity.originator) {
                                to_yield.push_back(activity);
                            }
                        }
                        let replay =
                            stream::iter(to_yield.into_iter().map(Ok::<Activity, CoreError>));
                        let live = stream::unfold(PollState::new(engine, cursor), poll_step);
                        replay.chain(live).boxed()
                    }
                    Err(e) => stream::iter(vec![Err::<Activity, CoreError>(e)]).boxed(),
                }
            })
            .boxed()
    }

    fn poll_parts(&self) -> PollParts {
        PollParts {
            api: self.api.clone(),
            platform: self.platform.clone(),
            storage: self.storage.clone(),
            session_id: self.session_id.clone(),
            originator_exclude: self.originator_exclude.clone(),
            polling_interval: self.polling_interval,
        }
    }
}

#[derive(Clone)]
struct PollParts {
    api: Arc<dyn ApiClient>,
    platform: Arc<dyn Platform>,
    storage: Arc<dyn ActivityStorage>,
    session_id: SessionId,
    originator_exclude: Vec<Originator>,
    polling_interval: Duration,
}

struct PollState {
    parts: PollParts,
    cursor: Cursor,
    page_token: Option<String>,
    is_first_call: bool,
    pending: VecDeque<Activity>,
}

impl PollState {
    fn new(parts: PollParts, cursor: Cursor) -> Self {
        Self {
            parts,
            cursor,
            page_token: None,
            is_first_call: true,
            pending: VecDeque::new(),
        }
    }
}

/// One step of [`futures::stream::unfold`]: fetches, maps, dedups and
/// persists pages until at least one activity is ready to yield, then
/// returns it with the id still queued for the next call.
async fn poll_step(mut state: PollState) -> Option<(ActivityResult, PollState)> {
    loop {
        if let Some(activity) = state.pending.pop_front() {
            return Some((Ok(activity), state));
        }

        let page_request = PageRequest {
            page_size: PAGE_SIZE,
            page_token: state.page_token.clone(),
        };

        let page_result = if state.is_first_call {
            let api = state.parts.api.clone();
            let session_id = state.parts.session_id.clone();
            with_first_request_retry(state.parts.platform.as_ref(), move || {
                let api = api.clone();
                let session_id = session_id.clone();
                let request = page_request.clone();
                async move { api.list_activities(&session_id, request).await }
            })
            .await
        } else {
            state
                .parts
                .api
                .list_activities(&state.parts.session_id, page_request)
                .await
        };
        state.is_first_call = false;

        let page = match page_result {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(session_id = %state.parts.session_id, error = %e, "activity list request failed");
                return Some((Err(CoreError::from(e)), state));
            }
        };

        for raw in &page.activities {
            let activity = match map_activity_json(raw) {
                Ok(a) => a,
                Err(e) => return Some((Err(CoreError::from(e)), state)),
            };
            if state.cursor.should_drop(&activity) {
                tracing::debug!(id = %activity.id, create_time = %activity.create_time, "dropping already-seen activity");
                continue;
            }
            if let Err(e) = state.parts.storage.append(activity.clone()).await {
                return Some((Err(CoreError::from(e)), state));
            }
            state.cursor.advance(&activity);
            if !state.parts.originator_exclude.contains(&activity.originator) {
                state.pending.push_back(activity);
            }
        }

        if let Some(token) = page.next_page_token {
            state.page_token = Some(token);
            continue;
        }
        state.page_token = None;

        if state.pending.is_empty() {
            state.parts.platform.sleep(state.parts.polling_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use futures::StreamExt;
    use remote_agents_core::api::{ActivityPage, CreateSessionRequest, SessionPage};
    use remote_agents_core::platform::native::NativePlatform;
    use remote_agents_core::{ApiError, ActivityType, SessionResource, SourceContext};
    use remote_agents_storage::{ActivityStorage as _, MemoryActivityStorage};
    use serde_json::json;

    use super::*;

    /// Scripted [`ApiClient`]: each call to `list_activities` pops the next
    /// page from a fixed queue, repeating the last entry once exhausted (so
    /// the "poll again, nothing new" tail of a scenario doesn't panic).
    struct ScriptedApiClient {
        pages: StdMutex<VecDeque<Result<ActivityPage, ApiError>>>,
        last: StdMutex<Option<Result<ActivityPage, ApiError>>>,
    }

    impl ScriptedApiClient {
        fn new(pages: Vec<Result<ActivityPage, ApiError>>) -> Self {
            Self {
                pages: StdMutex::new(pages.into_iter().collect()),
                last: StdMutex::new(None),
            }
        }
    }

    fn clone_result(r: &Result<ActivityPage, ApiError>) -> Result<ActivityPage, ApiError> {
        match r {
            Ok(p) => Ok(ActivityPage {
                activities: p.activities.clone(),
                next_page_token: p.next_page_token.clone(),
            }),
            Err(e) => Err(match e {
                ApiError::NotFound(m) => ApiError::NotFound(m.clone()),
                ApiError::Authentication(m) => ApiError::Authentication(m.clone()),
                ApiError::RateLimit(m) => ApiError::RateLimit(m.clone()),
                ApiError::Network(m) => ApiError::Network(m.clone()),
                ApiError::Decode(m) => ApiError::Decode(m.clone()),
                ApiError::Status { status, body } => ApiError::Status {
                    status: *status,
                    body: body.clone(),
                },
            }),
        }
    }

    #[async_trait]
    impl ApiClient for ScriptedApiClient {
        async fn get_session(&self, _session_id: &str) -> Result<SessionResource, ApiError> {
            unimplemented!("not used by the engine")
        }

        async fn list_activities(
            &self,
            _session_id: &str,
            _page: PageRequest,
        ) -> Result<ActivityPage, ApiError> {
            let mut pages = self.pages.lock().unwrap();
            if let Some(next) = pages.pop_front() {
                *self.last.lock().unwrap() = Some(clone_result(&next));
                return next;
            }
            let last = self.last.lock().unwrap();
            match last.as_ref() {
                Some(r) => clone_result(r),
                None => Ok(ActivityPage {
                    activities: vec![],
                    next_page_token: None,
                }),
            }
        }

        async fn create_session(
            &self,
            _req: &CreateSessionRequest,
        ) -> Result<SessionResource, ApiError> {
            unimplemented!("not used by the engine")
        }

        async fn send_message(&self, _session_id: &str, _text: &str) -> Result<(), ApiError> {
            unimplemented!("not used by the engine")
        }

        async fn approve_plan(&self, _session_id: &str, _plan_id: &str) -> Result<(), ApiError> {
            unimplemented!("not used by the engine")
        }

        async fn list_sessions(&self, _page: PageRequest) -> Result<SessionPage, ApiError> {
            unimplemented!("not used by the engine")
        }

        async fn list_sources(&self) -> Result<Vec<SourceContext>, ApiError> {
            unimplemented!("not used by the engine")
        }

        async fn get_source(&self, _owner: &str, _repo: &str) -> Result<SourceContext, ApiError> {
            unimplemented!("not used by the engine")
        }
    }

    fn raw_activity(id: &str, create_time: &str) -> serde_json::Value {
        json!({
            "name": format!("sessions/s1/activities/{id}"),
            "createTime": create_time,
            "agentMessaged": { "message": id },
        })
    }

    fn activity(id: &str, create_time: &str) -> Activity {
        Activity {
            id: id.into(),
            create_time: create_time.into(),
            originator: Originator::Agent,
            activity_type: ActivityType::AgentMessaged { message: id.into() },
            artifacts: vec![],
        }
    }

    fn make_engine(
        api: ScriptedApiClient,
        storage: Arc<dyn ActivityStorage>,
    ) -> ActivityEngine {
        ActivityEngine::new(
            Arc::new(api),
            Arc::new(NativePlatform::new()),
            storage,
            "s1".to_string(),
            vec![],
            Duration::from_millis(1),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn s1_pagination_yields_all_activities_once() {
        let api = ScriptedApiClient::new(vec![
            Ok(ActivityPage {
                activities: vec![raw_activity("a1", "t1"), raw_activity("a2", "t2")],
                next_page_token: Some("page2".into()),
            }),
            Ok(ActivityPage {
                activities: vec![raw_activity("a3", "t3")],
                next_page_token: None,
            }),
        ]);
        let storage: Arc<dyn ActivityStorage> = Arc::new(MemoryActivityStorage::new());
        let engine = make_engine(api, storage.clone());

        let first_three: Vec<_> = engine.stream().take(3).collect().await;
        let ids: Vec<_> = first_three
            .into_iter()
            .map(|r| r.unwrap().id)
            .collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);

        let scanned = storage.scan().await.unwrap();
        assert_eq!(
            scanned.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(),
            vec!["a1", "a2", "a3"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn s2_first_request_404_then_success_recovers() {
        let api = ScriptedApiClient::new(vec![
            Err(ApiError::NotFound("not yet".into())),
            Err(ApiError::NotFound("not yet".into())),
            Ok(ActivityPage {
                activities: vec![raw_activity("a1", "t1")],
                next_page_token: None,
            }),
        ]);
        let storage: Arc<dyn ActivityStorage> = Arc::new(MemoryActivityStorage::new());
        let engine = make_engine(api, storage);

        let first = engine.updates().next().await.unwrap().unwrap();
        assert_eq!(first.id, "a1");
    }

    #[tokio::test(start_paused = true)]
    async fn s3_dedup_across_page_boundary() {
        let api = ScriptedApiClient::new(vec![
            Ok(ActivityPage {
                activities: vec![raw_activity("a1", "t0"), raw_activity("x", "t1")],
                next_page_token: Some("page2".into()),
            }),
            Ok(ActivityPage {
                activities: vec![raw_activity("x", "t1"), raw_activity("y", "t1")],
                next_page_token: None,
            }),
        ]);
        let storage: Arc<dyn ActivityStorage> = Arc::new(MemoryActivityStorage::new());
        let engine = make_engine(api, storage);

        let yielded: Vec<_> = engine
            .stream()
            .take(3)
            .map(|r| r.unwrap().id)
            .collect()
            .await;
        assert_eq!(yielded, vec!["a1", "x", "y"]);
    }

    #[tokio::test(start_paused = true)]
    async fn s4_replay_then_live() {
        let storage: Arc<dyn ActivityStorage> = Arc::new(MemoryActivityStorage::new());
        storage.append(activity("a1", "t1")).await.unwrap();
        storage.append(activity("a2", "t2")).await.unwrap();

        let api = ScriptedApiClient::new(vec![Ok(ActivityPage {
            activities: vec![raw_activity("a3", "t3")],
            next_page_token: None,
        })]);
        let engine = make_engine(api, storage);

        let yielded: Vec<_> = engine
            .stream()
            .take(3)
            .map(|r| r.unwrap().id)
            .collect()
            .await;
        assert_eq!(yielded, vec!["a1", "a2", "a3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn history_matches_scan_order_exactly() {
        let storage: Arc<dyn ActivityStorage> = Arc::new(MemoryActivityStorage::new());
        storage.append(activity("a1", "t1")).await.unwrap();
        storage.append(activity("a2", "t2")).await.unwrap();
        let api = ScriptedApiClient::new(vec![]);
        let engine = make_engine(api, storage.clone());

        let history: Vec<_> = engine.history().map(|r| r.unwrap().id).collect().await;
        let scanned: Vec<_> = storage.scan().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(history, scanned);
    }

    #[tokio::test(start_paused = true)]
    async fn originator_exclude_filters_yielded_activities_but_still_persists() {
        let storage: Arc<dyn ActivityStorage> = Arc::new(MemoryActivityStorage::new());
        let api = ScriptedApiClient::new(vec![Ok(ActivityPage {
            activities: vec![raw_activity("a1", "t1")],
            next_page_token: None,
        })]);
        let engine = ActivityEngine::new(
            Arc::new(api),
            Arc::new(NativePlatform::new()),
            storage.clone(),
            "s1".to_string(),
            vec![Originator::Agent],
            Duration::from_millis(1),
        );

        let mut updates = engine.updates();
        let next = tokio::time::timeout(Duration::from_millis(50), updates.next()).await;
        assert!(next.is_err(), "excluded originator must not be yielded");
        assert!(storage.get("a1").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn updates_seeds_dedup_from_every_stored_activity_at_the_latest_time() {
        let storage: Arc<dyn ActivityStorage> = Arc::new(MemoryActivityStorage::new());
        storage.append(activity("a1", "t1")).await.unwrap();
        storage.append(activity("a2", "t1")).await.unwrap();
        // `latest()` only reports "a2"; if `updates()` seeded its cursor
        // from that alone, "a2" re-served on the first poll would slip
        // past the dedup check.
        let api = ScriptedApiClient::new(vec![Ok(ActivityPage {
            activities: vec![raw_activity("a2", "t1"), raw_activity("a3", "t2")],
            next_page_token: None,
        })]);
        let engine = make_engine(api, storage);

        let first = engine.updates().next().await.unwrap().unwrap();
        assert_eq!(first.id, "a3");
    }
}
