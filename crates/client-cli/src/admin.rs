//! Admin projections: paginated reads keyed by limit/offset (and role
//! filter), plus the one admin mutation — a user role/enabled patch with an
//! optimistic pending-overlay merged over cached rows at read time.

use crate::cache::{QueryCache, QueryKey};
use crate::error::ApiError;
use crate::http::HttpClient;
use serde::Deserialize;
use shared::{AdminEvent, AdminIntegration, AdminSummary, AdminUser, AdminUserPatch, Page};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ADMIN_KEY: &str = "admin";

const SUMMARY_STALE_AFTER: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    #[allow(dead_code)]
    success: bool,
}

fn users_key(limit: i64, offset: i64, role: Option<&str>) -> QueryKey {
    QueryKey::new([
        ADMIN_KEY.to_string(),
        "users".to_string(),
        role.unwrap_or("all").to_string(),
        limit.to_string(),
        offset.to_string(),
    ])
}

fn page_key(resource: &str, limit: i64, offset: i64) -> QueryKey {
    QueryKey::new([
        ADMIN_KEY.to_string(),
        resource.to_string(),
        limit.to_string(),
        offset.to_string(),
    ])
}

#[derive(Clone)]
pub struct AdminApi {
    http: Arc<HttpClient>,
    cache: Arc<QueryCache>,
    /// Patches whose PATCH request has not settled yet, merged over server
    /// rows when a page is read. Cleared unconditionally on settle.
    pending: Arc<Mutex<HashMap<i64, AdminUserPatch>>>,
}

impl AdminApi {
    pub fn new(http: Arc<HttpClient>, cache: Arc<QueryCache>) -> Self {
        Self {
            http,
            cache,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn summary(&self) -> Result<AdminSummary, ApiError> {
        let http = self.http.clone();
        self.cache
            .get_or_fetch(
                QueryKey::new([ADMIN_KEY, "summary"]),
                Some(SUMMARY_STALE_AFTER),
                move || async move { http.get("/admin/summary").await },
            )
            .await
    }

    /// One page of users; each page is its own cache entry, so paging is
    /// just a different key. Pending patches are overlaid on the result.
    pub async fn users(
        &self,
        limit: i64,
        offset: i64,
        role: Option<&str>,
    ) -> Result<Page<AdminUser>, ApiError> {
        let http = self.http.clone();
        let params = vec![
            ("limit", Some(limit.to_string())),
            ("offset", Some(offset.to_string())),
            ("role", role.map(str::to_string)),
        ];
        let mut page: Page<AdminUser> = self
            .cache
            .get_or_fetch(users_key(limit, offset, role), None, move || async move {
                http.get_with("/admin/users", &params).await
            })
            .await?;

        let pending = self.pending.lock().unwrap();
        if !pending.is_empty() {
            for user in &mut page.items {
                if let Some(patch) = pending.get(&user.id) {
                    patch.apply(user);
                }
            }
        }
        Ok(page)
    }

    /// Optimistic update: the patch is visible through `users()` the moment
    /// the request starts, reverts if the request fails, and the page caches
    /// are invalidated (refetch reconciles) only on success.
    pub async fn update_user(&self, id: i64, patch: AdminUserPatch) -> Result<(), ApiError> {
        if patch.is_empty() {
            return Err(ApiError::validation("patch", "nothing to update"));
        }
        self.pending.lock().unwrap().insert(id, patch.clone());

        let result = self
            .http
            .patch::<SuccessResponse, _>(&format!("/admin/users/{id}"), &patch)
            .await;

        self.pending.lock().unwrap().remove(&id);
        match result {
            Ok(_) => {
                self.cache
                    .invalidate_prefix(&QueryKey::new([ADMIN_KEY, "users"]));
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub async fn events(&self, limit: i64, offset: i64) -> Result<Page<AdminEvent>, ApiError> {
        let http = self.http.clone();
        let params = vec![
            ("limit", Some(limit.to_string())),
            ("offset", Some(offset.to_string())),
        ];
        self.cache
            .get_or_fetch(page_key("events", limit, offset), None, move || async move {
                http.get_with("/admin/events", &params).await
            })
            .await
    }

    pub async fn integrations(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Page<AdminIntegration>, ApiError> {
        let http = self.http.clone();
        let params = vec![
            ("limit", Some(limit.to_string())),
            ("offset", Some(offset.to_string())),
        ];
        self.cache
            .get_or_fetch(
                page_key("integrations", limit, offset),
                None,
                move || async move { http.get_with("/admin/integrations", &params).await },
            )
            .await
    }
}
