//! Client configuration: the one place an ambient API key, base URL or
//! cache root is allowed to come from the process environment.

use std::path::PathBuf;
use std::time::Duration;

use remote_agents_core::{ApiClientConfig, CoreError, Originator};

const DEFAULT_POLLING_INTERVAL_MS: u64 = 2_000;
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
const API_KEY_ENV_VAR: &str = "REMOTE_AGENTS_API_KEY";

/// Construction-time configuration for [`crate::Client`].
///
/// Mirrors the Service's own defaults: `base_url` defaults to the v1alpha
/// root baked into [`ApiClientConfig`], `polling_interval_ms` to 2,000,
/// `request_timeout_ms` to 30,000, `cache_root` to the current working
/// directory.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub polling_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub cache_root: PathBuf,
    pub originator_exclude: Vec<Originator>,
    pub user_agent: String,
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            polling_interval_ms: DEFAULT_POLLING_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            cache_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            originator_exclude: Vec::new(),
            user_agent: "remote-agents-client/0.1".to_string(),
        }
    }

    /// Resolve `api_key` from [`API_KEY_ENV_VAR`] rather than a literal, for
    /// hosts that build the process-wide default client from the
    /// environment (spec.md §9's "process-wide defaults are a host-owned
    /// singleton" hint — the core itself stays constructible without any
    /// ambient state, this is just a convenience constructor).
    pub fn from_env() -> Result<Self, CoreError> {
        let api_key = std::env::var(API_KEY_ENV_VAR).map_err(|_| CoreError::MissingApiKey)?;
        Ok(Self::new(api_key))
    }

    pub(crate) fn validate(&self) -> Result<(), CoreError> {
        if self.api_key.trim().is_empty() {
            return Err(CoreError::MissingApiKey);
        }
        Ok(())
    }

    pub(crate) fn api_client_config(&self) -> ApiClientConfig {
        let mut config = ApiClientConfig::new(self.api_key.clone());
        if let Some(base_url) = &self.base_url {
            config.base_url.clone_from(base_url);
        }
        config.request_timeout = Duration::from_millis(self.request_timeout_ms);
        config.user_agent.clone_from(&self.user_agent);
        config
    }

    pub(crate) fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_empty_api_key() {
        let config = ClientConfig::new("");
        assert!(matches!(config.validate(), Err(CoreError::MissingApiKey)));
    }

    #[test]
    fn validate_accepts_nonempty_api_key() {
        let config = ClientConfig::new("sk-test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn api_client_config_carries_base_url_override() {
        let mut config = ClientConfig::new("sk-test");
        config.base_url = Some("https://custom.example/v1".into());
        assert_eq!(config.api_client_config().base_url, "https://custom.example/v1");
    }
}
