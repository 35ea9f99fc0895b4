//! Minimal walkthrough of the session client, wired against a scripted
//! `ApiClient` rather than a live Service so it runs anywhere without
//! credentials.
//!
//! Run with: cargo run -p cli-demo

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use remote_agents_client::{Client, ClientConfig, CreateSessionRequest};
use remote_agents_core::api::{ActivityPage, CreateSessionRequest as CoreCreateSessionRequest, PageRequest, SessionPage};
use remote_agents_core::{ApiClient, ApiError, SessionOutputs, SessionResource, SessionState, SourceContext};
use remote_agents_storage::MemoryStorageFactory;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// A scripted `ApiClient` standing in for the Service: `get_session`
/// advances a new session through queued/in-progress/completed on
/// successive calls, and `list_activities` hands out a fixed replay once.
struct ScriptedService {
    call_count: AtomicU64,
    activities_served: Mutex<bool>,
}

impl ScriptedService {
    fn new() -> Self {
        Self {
            call_count: AtomicU64::new(0),
            activities_served: Mutex::new(false),
        }
    }
}

#[async_trait]
impl ApiClient for ScriptedService {
    async fn create_session(
        &self,
        req: &CoreCreateSessionRequest,
    ) -> Result<SessionResource, ApiError> {
        Ok(SessionResource {
            id: "demo-session-1".to_string(),
            name: "sessions/demo-session-1".to_string(),
            create_time: "2026-07-27T00:00:00Z".to_string(),
            update_time: "2026-07-27T00:00:00Z".to_string(),
            state: SessionState::Queued,
            title: req.prompt.clone(),
            prompt: req.prompt.clone(),
            url: "https://example.invalid/sessions/demo-session-1".to_string(),
            source_context: req.source_context.clone(),
            outputs: SessionOutputs::default(),
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionResource, ApiError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst);
        let state = match call {
            0 => SessionState::Queued,
            1 => SessionState::InProgress,
            _ => SessionState::Completed,
        };
        Ok(SessionResource {
            id: session_id.to_string(),
            name: format!("sessions/{session_id}"),
            create_time: "2026-07-27T00:00:00Z".to_string(),
            update_time: "2026-07-27T00:00:00Z".to_string(),
            state,
            title: "fix the flaky upload test".to_string(),
            prompt: "fix the flaky upload test".to_string(),
            url: format!("https://example.invalid/sessions/{session_id}"),
            source_context: Some(SourceContext {
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
                branch: None,
            }),
            outputs: SessionOutputs::default(),
        })
    }

    async fn list_activities(
        &self,
        _session_id: &str,
        _page: PageRequest,
    ) -> Result<ActivityPage, ApiError> {
        let mut served = self.activities_served.lock().unwrap();
        if *served {
            return Ok(ActivityPage {
                activities: Vec::new(),
                next_page_token: None,
            });
        }
        *served = true;
        Ok(ActivityPage {
            activities: vec![
                serde_json::json!({
                    "name": "sessions/demo-session-1/activities/act-1",
                    "createTime": "2026-07-27T00:00:01Z",
                    "originator": "agent",
                    "agentMessaged": { "message": "looking at the failing test" },
                }),
                serde_json::json!({
                    "name": "sessions/demo-session-1/activities/act-2",
                    "createTime": "2026-07-27T00:00:02Z",
                    "originator": "agent",
                    "progressUpdated": {
                        "title": "ran the test suite",
                        "description": "ran the test suite locally",
                    },
                }),
            ],
            next_page_token: None,
        })
    }

    async fn send_message(&self, _session_id: &str, _text: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn approve_plan(&self, _session_id: &str, _plan_id: &str) -> Result<(), ApiError> {
        Ok(())
    }

    async fn list_sessions(&self, _page: PageRequest) -> Result<SessionPage, ApiError> {
        Ok(SessionPage {
            sessions: vec![],
            next_page_token: None,
        })
    }

    async fn list_sources(&self) -> Result<Vec<SourceContext>, ApiError> {
        Ok(vec![SourceContext {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            branch: None,
        }])
    }

    async fn get_source(&self, owner: &str, repo: &str) -> Result<SourceContext, ApiError> {
        Ok(SourceContext {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: None,
        })
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = ClientConfig::new("demo-key");
    config.polling_interval_ms = 50;

    let client = Client::with_components(
        config,
        Arc::new(MemoryStorageFactory::new()),
        Arc::new(ScriptedService::new()),
        Arc::new(remote_agents_core::platform::native::NativePlatform::new()),
    )
    .expect("demo-key is non-empty");

    println!("creating a session...");
    let handle = client
        .run(&CreateSessionRequest {
            prompt: "fix the flaky upload test".to_string(),
            source_context: Some(SourceContext {
                owner: "acme".to_string(),
                repo: "widgets".to_string(),
                branch: None,
            }),
            title: None,
        })
        .await
        .expect("create_session should succeed against the scripted service");
    println!("session created: {}", handle.session_id());

    println!("hydrating activities (catching up until the feed goes quiet)...");
    let session = handle.session();
    let hydrated = session
        .hydrate()
        .await
        .expect("hydrate should succeed against the scripted service");
    println!("  {hydrated} activit(y/ies) caught up");
    for activity in session
        .activities()
        .select(&remote_agents_client::SelectOptions::default())
        .await
        .expect("select reads the local cache only")
    {
        println!("  activity {}: {:?}", activity.id, activity.activity_type);
    }

    println!("waiting for a terminal result...");
    match handle.result().await {
        Ok(result) => println!("session finished: {:?}", result.state),
        Err(e) => println!("session failed: {e}"),
    }

    println!("syncing session metadata...");
    let report = client
        .sync(remote_agents_client::SyncOptions::metadata())
        .await
        .expect("sync should succeed");
    println!(
        "sync complete: {} session(s), {} activit(y/ies)",
        report.sessions_synced, report.activities_synced
    );
}
