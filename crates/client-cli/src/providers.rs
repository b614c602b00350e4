//! Provider integrations (`/me/providers`): read-mostly with a 60s stale
//! window; disconnect/toggle invalidate the single cached list.

use crate::cache::{QueryCache, QueryKey};
use crate::error::ApiError;
use crate::http::HttpClient;
use serde::{Deserialize, Serialize};
use shared::Provider;
use std::sync::Arc;
use std::time::Duration;

pub const PROVIDERS_KEY: &str = "providers";

const STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ListResponse {
    providers: Vec<Provider>,
}

#[derive(Debug, Deserialize)]
struct OneResponse {
    provider: Option<Provider>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleRequest {
    ingest_enabled: bool,
}

#[derive(Clone)]
pub struct ProvidersApi {
    http: Arc<HttpClient>,
    cache: Arc<QueryCache>,
}

impl ProvidersApi {
    pub fn new(http: Arc<HttpClient>, cache: Arc<QueryCache>) -> Self {
        Self { http, cache }
    }

    pub async fn list(&self) -> Result<Vec<Provider>, ApiError> {
        let http = self.http.clone();
        self.cache
            .get_or_fetch(QueryKey::root(PROVIDERS_KEY), Some(STALE_AFTER), move || async move {
                let res: ListResponse = http.get("/me/providers").await?;
                Ok(res.providers)
            })
            .await
    }

    pub async fn disconnect(&self, provider: &str) -> Result<Option<Provider>, ApiError> {
        let res: OneResponse = self
            .http
            .post_empty(&format!("/me/providers/{provider}/disconnect"))
            .await?;
        self.cache.invalidate(&QueryKey::root(PROVIDERS_KEY));
        Ok(res.provider)
    }

    pub async fn toggle_ingest(
        &self,
        provider: &str,
        ingest_enabled: bool,
    ) -> Result<Option<Provider>, ApiError> {
        let res: OneResponse = self
            .http
            .post(
                &format!("/me/providers/{provider}/toggle"),
                &ToggleRequest { ingest_enabled },
            )
            .await?;
        self.cache.invalidate(&QueryKey::root(PROVIDERS_KEY));
        Ok(res.provider)
    }
}
