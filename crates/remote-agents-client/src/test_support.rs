//! Shared test doubles for the façade test modules.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use remote_agents_core::api::{ActivityPage, CreateSessionRequest, PageRequest, SessionPage};
use remote_agents_core::platform::{FetchError, HttpRequest, HttpResponse, Platform};
use remote_agents_core::{ApiClient, ApiError, SessionOutputs, SessionResource, SessionState, SourceContext};

/// A controllable clock/sleeper: `sleep` uses real `tokio::time` (so it
/// composes with `start_paused = true`) while `now_millis` is an
/// independently steppable counter, so cache-tiering tests don't need to
/// wait out real wall-clock windows.
pub(crate) struct FakePlatform {
    now_ms: AtomicI64,
}

impl FakePlatform {
    pub(crate) fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    pub(crate) fn set(&self, ms: i64) {
        self.now_ms.store(ms, Ordering::SeqCst);
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn fetch(&self, _request: HttpRequest) -> Result<HttpResponse, FetchError> {
        unreachable!("tests drive a mock ApiClient directly, not the HTTP transport")
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn new_uuid(&self) -> String {
        "test-uuid".to_string()
    }

    fn hmac_sha256_hex(&self, _key: &[u8], _data: &[u8]) -> String {
        String::new()
    }

    async fn save_file(&self, _path: &Path, _contents: &[u8]) -> std::io::Result<()> {
        Ok(())
    }
}

/// A scripted [`ApiClient`]: each method pops its next queued response,
/// panicking if the test didn't configure enough of them. Tests that don't
/// exercise a given method never touch its queue.
#[derive(Default)]
pub(crate) struct MockApiClient {
    pub get_session: Mutex<VecDeque<Result<SessionResource, ApiError>>>,
    pub list_activities: Mutex<VecDeque<Result<ActivityPage, ApiError>>>,
    pub create_session: Mutex<VecDeque<Result<SessionResource, ApiError>>>,
    pub list_sessions: Mutex<VecDeque<Result<SessionPage, ApiError>>>,
    pub list_sources: Mutex<VecDeque<Result<Vec<SourceContext>, ApiError>>>,
    pub get_source: Mutex<VecDeque<Result<SourceContext, ApiError>>>,
    pub sent_messages: Mutex<Vec<(String, String)>>,
    pub approved_plans: Mutex<Vec<(String, String)>>,
}

fn pop<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>, what: &str) -> Result<T, ApiError> {
    queue
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .pop_front()
        .unwrap_or_else(|| panic!("MockApiClient: no more {what} responses configured"))
}

#[async_trait]
impl ApiClient for MockApiClient {
    async fn get_session(&self, _session_id: &str) -> Result<SessionResource, ApiError> {
        pop(&self.get_session, "get_session")
    }

    async fn list_activities(
        &self,
        _session_id: &str,
        _page: PageRequest,
    ) -> Result<ActivityPage, ApiError> {
        pop(&self.list_activities, "list_activities")
    }

    async fn create_session(&self, _req: &CreateSessionRequest) -> Result<SessionResource, ApiError> {
        pop(&self.create_session, "create_session")
    }

    async fn send_message(&self, session_id: &str, text: &str) -> Result<(), ApiError> {
        self.sent_messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((session_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn approve_plan(&self, session_id: &str, plan_id: &str) -> Result<(), ApiError> {
        self.approved_plans
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((session_id.to_string(), plan_id.to_string()));
        Ok(())
    }

    async fn list_sessions(&self, _page: PageRequest) -> Result<SessionPage, ApiError> {
        pop(&self.list_sessions, "list_sessions")
    }

    async fn list_sources(&self) -> Result<Vec<SourceContext>, ApiError> {
        pop(&self.list_sources, "list_sources")
    }

    async fn get_source(&self, _owner: &str, _repo: &str) -> Result<SourceContext, ApiError> {
        pop(&self.get_source, "get_source")
    }
}

pub(crate) fn session_resource(id: &str, state: SessionState, create_time: &str) -> SessionResource {
    SessionResource {
        id: id.to_string(),
        name: format!("sessions/{id}"),
        create_time: create_time.to_string(),
        update_time: create_time.to_string(),
        state,
        title: "title".to_string(),
        prompt: "prompt".to_string(),
        url: format!("https://example/{id}"),
        source_context: None,
        outputs: SessionOutputs::default(),
    }
}
