//! A thin request layer over the Service's REST surface: auth header
//! injection, typed error classification, JSON decoding.
//!
//! The actual transport (TCP, TLS, the browser `fetch` call) is out of
//! scope here and lives behind [`crate::platform::Platform::fetch`]; this
//! module only knows how to turn a `Platform` into a typed `ApiClient`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::platform::{FetchError, HttpMethod, HttpRequest, Platform};
use crate::session::{SessionResource, SourceContext};

const DEFAULT_BASE_URL: &str = "https://api.example.com/v1alpha";

/// Opaque pagination cursor plus the page size to request.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub page_size: u32,
    pub page_token: Option<String>,
}

impl PageRequest {
    #[must_use]
    pub fn first(page_size: u32) -> Self {
        Self {
            page_size,
            page_token: None,
        }
    }
}

/// A page of raw (un-mapped) activity records; mapping into
/// [`crate::activity::Activity`] is [`crate::mapper`]'s job, kept separate
/// so the API layer never needs to know the tagged-variant shape.
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityPage {
    #[serde(default)]
    pub activities: Vec<Value>,
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}

/// A page of session resources, as returned by session listing.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionPage {
    #[serde(default)]
    pub sessions: Vec<SessionResource>,
    #[serde(rename = "nextPageToken", default)]
    pub next_page_token: Option<String>,
}

/// Request body for `POST sessions`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_context: Option<SourceContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// The contract the streaming engine and façades are built against.
///
/// Out of scope per spec.md §1: the literal transport/auth-header/JSON
/// decode *implementation* details are free to vary by host; this trait is
/// the abstraction they must honor. [`RestApiClient`] is the one concrete
/// implementation this crate ships, built on [`crate::platform::Platform`].
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get_session(&self, session_id: &str) -> Result<SessionResource, ApiError>;
    async fn list_activities(
        &self,
        session_id: &str,
        page: PageRequest,
    ) -> Result<ActivityPage, ApiError>;
    async fn create_session(&self, req: &CreateSessionRequest) -> Result<SessionResource, ApiError>;
    async fn send_message(&self, session_id: &str, text: &str) -> Result<(), ApiError>;
    async fn approve_plan(&self, session_id: &str, plan_id: &str) -> Result<(), ApiError>;
    async fn list_sessions(&self, page: PageRequest) -> Result<SessionPage, ApiError>;
    async fn list_sources(&self) -> Result<Vec<SourceContext>, ApiError>;
    async fn get_source(&self, owner: &str, repo: &str) -> Result<SourceContext, ApiError>;
}

/// Configuration for [`RestApiClient`].
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl ApiClientConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_millis(30_000),
            user_agent: "remote-agents-client/0.1".to_string(),
        }
    }
}

/// The default [`ApiClient`], built over any [`Platform`].
pub struct RestApiClient {
    platform: Arc<dyn Platform>,
    config: ApiClientConfig,
}

impl RestApiClient {
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>, config: ApiClientConfig) -> Self {
        Self { platform, config }
    }

    fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.config.api_key),
        );
        headers.insert("User-Agent".to_string(), self.config.user_agent.clone());
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, ApiError> {
        let request = HttpRequest {
            method,
            url: self.url(path),
            headers: self.headers(),
            body,
            timeout: self.config.request_timeout,
        };

        let response = self.platform.fetch(request).await.map_err(|e| match e {
            FetchError::Timeout => ApiError::Network("request timed out".into()),
            FetchError::Transport(msg) => ApiError::Network(msg),
            FetchError::Cancelled => ApiError::Network("request cancelled".into()),
        })?;

        classify_status(response.status, &response.body)?;
        Ok(response.body)
    }

    async fn decode<T: for<'de> Deserialize<'de>>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, ApiError> {
        let bytes = self.request(method, path, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn classify_status(status: u16, body: &[u8]) -> Result<(), ApiError> {
    if (200..300).contains(&status) {
        return Ok(());
    }
    let text = String::from_utf8_lossy(body).to_string();
    Err(match status {
        401 | 403 => ApiError::Authentication(text),
        404 => ApiError::NotFound(text),
        429 => ApiError::RateLimit(text),
        other => ApiError::Status {
            status: other,
            body: text,
        },
    })
}

#[async_trait]
impl ApiClient for RestApiClient {
    async fn get_session(&self, session_id: &str) -> Result<SessionResource, ApiError> {
        self.decode(HttpMethod::Get, &format!("sessions/{session_id}"), None)
            .await
    }

    async fn list_activities(
        &self,
        session_id: &str,
        page: PageRequest,
    ) -> Result<ActivityPage, ApiError> {
        let mut path = format!(
            "sessions/{session_id}/activities?pageSize={}",
            page.page_size
        );
        if let Some(token) = page.page_token {
            path.push_str(&format!("&pageToken={token}"));
        }
        self.decode(HttpMethod::Get, &path, None).await
    }

    async fn create_session(&self, req: &CreateSessionRequest) -> Result<SessionResource, ApiError> {
        let body = serde_json::to_vec(req).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.decode(HttpMethod::Post, "sessions", Some(body)).await
    }

    async fn send_message(&self, session_id: &str, text: &str) -> Result<(), ApiError> {
        let body = serde_json::to_vec(&serde_json::json!({ "message": text }))
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request(
            HttpMethod::Post,
            &format!("sessions/{session_id}:sendMessage"),
            Some(body),
        )
        .await?;
        Ok(())
    }

    async fn approve_plan(&self, session_id: &str, plan_id: &str) -> Result<(), ApiError> {
        let body = serde_json::to_vec(&serde_json::json!({ "planId": plan_id }))
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        self.request(
            HttpMethod::Post,
            &format!("sessions/{session_id}:approvePlan"),
            Some(body),
        )
        .await?;
        Ok(())
    }

    async fn list_sessions(&self, page: PageRequest) -> Result<SessionPage, ApiError> {
        let mut path = format!("sessions?pageSize={}", page.page_size);
        if let Some(token) = page.page_token {
            path.push_str(&format!("&pageToken={token}"));
        }
        self.decode(HttpMethod::Get, &path, None).await
    }

    async fn list_sources(&self) -> Result<Vec<SourceContext>, ApiError> {
        self.decode(HttpMethod::Get, "sources", None).await
    }

    async fn get_source(&self, owner: &str, repo: &str) -> Result<SourceContext, ApiError> {
        self.decode(HttpMethod::Get, &format!("sources/github/{owner}/{repo}"), None)
            .await
    }
}
