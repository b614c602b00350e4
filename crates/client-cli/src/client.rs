//! `ApiClient` wires the transport, cache, session, and per-resource
//! surfaces together from a loaded `Config`. One client per process; every
//! surface shares the same cache and cookie jar.

use crate::admin::AdminApi;
use crate::ai::AiApi;
use crate::cache::QueryCache;
use crate::config::{Config, DismissalMode};
use crate::http::{HttpClient, DEFAULT_TIMEOUT};
use crate::notify::{Notifier, TerminalNotifier};
use crate::providers::ProvidersApi;
use crate::session::AuthState;
use crate::suggestions::{LocalStore, ServerStore, SuggestionStore, Suggestions};
use crate::todos::TodosApi;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

pub struct ApiClient {
    pub http: Arc<HttpClient>,
    pub cache: Arc<QueryCache>,
    pub notifier: Arc<dyn Notifier>,
    pub auth: Arc<AuthState>,
    pub todos: TodosApi,
    pub providers: ProvidersApi,
    pub admin: AdminApi,
    pub ai: AiApi,
    pub suggestions: Suggestions,
}

impl ApiClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_notifier(config, Arc::new(TerminalNotifier))
    }

    pub fn with_notifier(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let base = config
            .api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL);
        let timeout = config
            .api
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        let http = Arc::new(HttpClient::new(base, timeout)?);
        let cache = Arc::new(QueryCache::new());

        let store: Arc<dyn SuggestionStore> = match config.suggestions.dismissals {
            DismissalMode::Server => Arc::new(ServerStore::new(http.clone())),
            DismissalMode::Local => Arc::new(LocalStore::new(
                http.clone(),
                Config::dismissed_path()?,
            )),
        };

        let auth = Arc::new(AuthState::new(http.clone(), notifier.clone()));
        Ok(Self {
            todos: TodosApi::new(http.clone(), cache.clone()),
            providers: ProvidersApi::new(http.clone(), cache.clone()),
            admin: AdminApi::new(http.clone(), cache.clone()),
            ai: AiApi::new(http.clone()),
            suggestions: Suggestions::new(store, cache.clone()),
            auth,
            notifier,
            http,
            cache,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;

    #[test]
    fn test_defaults_apply_when_config_is_empty() {
        let client = ApiClient::from_config(&Config::default()).unwrap();
        assert_eq!(client.http.base_url().as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = Config {
            api: ApiConfig {
                base_url: Some("not a url".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(ApiClient::from_config(&config).is_err());
    }
}
