//! The client façade (spec.md §4.8): session lookup/creation, `run`, `sync`
//! and source discovery.

use std::sync::Arc;
use std::time::Duration;

use remote_agents_core::api::CreateSessionRequest;
use remote_agents_core::platform::native::NativePlatform;
use remote_agents_core::{
    ApiClient, ApiError, CachedSession, CoreError, CoreResult, Platform, RestApiClient, SessionId,
    SourceContext,
};
use remote_agents_engine::ActivityEngine;
use remote_agents_storage::{SessionStore, StorageFactory};

use crate::config::ClientConfig;
use crate::run::RunHandle;
use crate::session::Session;
use crate::sync::{SyncOptions, SyncReport};

/// Entry point: builds and owns the shared `ApiClient`/`Platform`/storage
/// factory that every `Session` façade it hands out is built on top of.
pub struct Client {
    api: Arc<dyn ApiClient>,
    platform: Arc<dyn Platform>,
    storage: Arc<dyn StorageFactory>,
    config: ClientConfig,
}

impl Client {
    /// Builds a client over the native (tokio + reqwest) platform.
    ///
    /// # Errors
    /// `CoreError::MissingApiKey` if `config.api_key` is empty.
    pub fn new(config: ClientConfig, storage: Arc<dyn StorageFactory>) -> CoreResult<Self> {
        config.validate()?;
        let platform: Arc<dyn Platform> = Arc::new(NativePlatform::new());
        let api: Arc<dyn ApiClient> =
            Arc::new(RestApiClient::new(platform.clone(), config.api_client_config()));
        Ok(Self {
            api,
            platform,
            storage,
            config,
        })
    }

    /// Builds a client over caller-supplied `ApiClient`/`Platform`
    /// implementations, for tests and non-native hosts.
    ///
    /// # Errors
    /// `CoreError::MissingApiKey` if `config.api_key` is empty.
    pub fn with_components(
        config: ClientConfig,
        storage: Arc<dyn StorageFactory>,
        api: Arc<dyn ApiClient>,
        platform: Arc<dyn Platform>,
    ) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            api,
            platform,
            storage,
            config,
        })
    }

    /// A façade over an already-known session, hydrating metadata lazily:
    /// no network call happens until the façade's methods are called.
    #[must_use]
    pub fn session(&self, session_id: impl Into<SessionId>) -> Session {
        self.build_session(session_id.into())
    }

    /// Creates a session via the API, persists it, and returns its façade.
    pub async fn create_session(&self, req: &CreateSessionRequest) -> CoreResult<Session> {
        let resource = self.api.create_session(req).await.map_err(CoreError::from)?;
        let session_id = resource.id.clone();
        self.storage
            .session_store()
            .upsert(CachedSession {
                resource,
                last_synced_at: self.platform.now_millis(),
            })
            .await
            .map_err(CoreError::from)?;
        Ok(self.build_session(session_id))
    }

    /// Creates a session and returns a handle that is simultaneously a
    /// one-shot producer of the final outcome and an iterable live stream.
    pub async fn run(&self, req: &CreateSessionRequest) -> CoreResult<RunHandle> {
        let session = self.create_session(req).await?;
        Ok(RunHandle::new(session))
    }

    /// Incremental metadata/activity catch-up across remote sessions.
    pub async fn sync(&self, opts: SyncOptions) -> CoreResult<SyncReport> {
        crate::sync::run_sync(self, opts).await
    }

    /// Uncached passthrough over the source-repository listing endpoint.
    pub async fn sources(&self) -> CoreResult<Vec<SourceContext>> {
        self.api.list_sources().await.map_err(CoreError::from)
    }

    /// Uncached passthrough over a single source repository lookup.
    ///
    /// # Errors
    /// `CoreError::SourceNotFound` if the Service returns 404.
    pub async fn source(&self, owner: &str, repo: &str) -> CoreResult<SourceContext> {
        self.api.get_source(owner, repo).await.map_err(|e| match e {
            ApiError::NotFound(msg) => CoreError::SourceNotFound(format!("{owner}/{repo}: {msg}")),
            other => CoreError::from(other),
        })
    }

    pub(crate) fn api_client(&self) -> Arc<dyn ApiClient> {
        self.api.clone()
    }

    pub(crate) fn platform(&self) -> Arc<dyn Platform> {
        self.platform.clone()
    }

    pub(crate) fn session_store(&self) -> Arc<dyn SessionStore> {
        self.storage.session_store()
    }

    pub(crate) fn polling_interval(&self) -> Duration {
        self.config.polling_interval()
    }

    fn build_session(&self, session_id: SessionId) -> Session {
        let activity_store = self.storage.activity_store(&session_id);
        let engine = Arc::new(ActivityEngine::new(
            self.api.clone(),
            self.platform.clone(),
            activity_store.clone(),
            session_id.clone(),
            self.config.originator_exclude.clone(),
            self.config.polling_interval(),
        ));
        Session::new(
            session_id,
            self.api.clone(),
            self.platform.clone(),
            self.storage.session_store(),
            activity_store,
            engine,
            self.config.polling_interval(),
        )
    }
}
