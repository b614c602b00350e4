//! AI-suggestion lifecycle: list/refresh plus the accept/dismiss overlay.
//!
//! Dismissal state has lived in two places across revisions of the service:
//! client-local (a persisted id-set filtering every fetch) and
//! server-authoritative (dedicated endpoints). `SuggestionStore` is the
//! capability interface both satisfy; `Suggestions` layers the cache,
//! optimistic removal, bulk accounting, and polling on top of whichever
//! store is configured.

use crate::cache::{QueryCache, QueryKey};
use crate::error::ApiError;
use crate::http::HttpClient;
use crate::poller::SuggestionPoller;
use crate::todos::{TodosApi, TODOS_KEY};
use async_trait::async_trait;
use serde::Deserialize;
use shared::{AiSuggestion, Todo, TodoFilters, TodoInput};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub const SUGGESTIONS_KEY: &str = "ai-suggestions";

pub fn suggestions_key() -> QueryKey {
    QueryKey::root(SUGGESTIONS_KEY)
}

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    items: Vec<AiSuggestion>,
}

#[derive(Debug, Deserialize)]
struct ItemResponse {
    item: AiSuggestion,
}

/// Per-item accounting for bulk accept/dismiss. A failed item never aborts
/// the rest of the batch.
#[derive(Debug, Default)]
pub struct BulkOutcome {
    pub done: Vec<i64>,
    pub failed: Vec<(i64, String)>,
}

impl BulkOutcome {
    pub fn all_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// One aggregate line for the notifier, e.g. "Dismissed 2 of 3
    /// suggestions (1 failed)".
    pub fn summary(&self, verb: &str) -> String {
        let total = self.done.len() + self.failed.len();
        if self.failed.is_empty() {
            format!("{verb} {total} suggestion(s)")
        } else {
            format!(
                "{verb} {} of {total} suggestions ({} failed)",
                self.done.len(),
                self.failed.len()
            )
        }
    }
}

#[async_trait]
pub trait SuggestionStore: Send + Sync {
    async fn list(&self) -> Result<Vec<AiSuggestion>, ApiError>;
    /// Trigger server-side regeneration and return the new list.
    async fn refresh(&self) -> Result<Vec<AiSuggestion>, ApiError>;
    async fn accept(&self, id: i64) -> Result<AiSuggestion, ApiError>;
    async fn dismiss(&self, id: i64) -> Result<(), ApiError>;
    async fn bulk_dismiss(&self, ids: &[i64]) -> BulkOutcome;
}

// ============================================================================
// Server-authoritative store
// ============================================================================

/// Dismissals live on the server (`/ai/suggestions/:id/dismiss` and the
/// bulk `/ai/suggestions/dismiss`); nothing is persisted locally.
pub struct ServerStore {
    http: Arc<HttpClient>,
}

impl ServerStore {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    async fn dismiss_per_item(&self, ids: &[i64]) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for &id in ids {
            match self.dismiss(id).await {
                Ok(()) => outcome.done.push(id),
                Err(err) => outcome.failed.push((id, err.to_string())),
            }
        }
        outcome
    }
}

#[async_trait]
impl SuggestionStore for ServerStore {
    async fn list(&self) -> Result<Vec<AiSuggestion>, ApiError> {
        let res: ItemsResponse = self.http.get("/ai/suggestions").await?;
        Ok(res.items)
    }

    async fn refresh(&self) -> Result<Vec<AiSuggestion>, ApiError> {
        let res: ItemsResponse = self.http.post_empty("/ai/suggestions/refresh").await?;
        Ok(res.items)
    }

    async fn accept(&self, id: i64) -> Result<AiSuggestion, ApiError> {
        let res: ItemResponse = self
            .http
            .post_empty(&format!("/ai/suggestions/{id}/accept"))
            .await?;
        Ok(res.item)
    }

    async fn dismiss(&self, id: i64) -> Result<(), ApiError> {
        let _: serde_json::Value = self
            .http
            .post_empty(&format!("/ai/suggestions/{id}/dismiss"))
            .await?;
        Ok(())
    }

    /// Try the bulk endpoint first; if the whole batch is rejected, fall
    /// back to sequential per-item dismissal so one bad id cannot sink the
    /// rest.
    async fn bulk_dismiss(&self, ids: &[i64]) -> BulkOutcome {
        let body = serde_json::json!({ "ids": ids });
        match self
            .http
            .post::<serde_json::Value, _>("/ai/suggestions/dismiss", &body)
            .await
        {
            Ok(_) => BulkOutcome {
                done: ids.to_vec(),
                failed: Vec::new(),
            },
            Err(err) => {
                tracing::debug!(error = %err, "bulk dismiss rejected, retrying per item");
                self.dismiss_per_item(ids).await
            }
        }
    }
}

// ============================================================================
// Client-local store
// ============================================================================

/// Dismissed ids are kept in a JSON file and filter every fetch result, so
/// a dismissal survives a restart without the server knowing about it.
/// Dismissal is optimistic: the id is added and saved first, and rolled
/// back if the save fails.
pub struct LocalStore {
    http: Arc<HttpClient>,
    path: PathBuf,
    dismissed: Mutex<HashSet<i64>>,
}

impl LocalStore {
    pub fn new(http: Arc<HttpClient>, path: PathBuf) -> Self {
        let dismissed = Mutex::new(load_dismissed(&path));
        Self {
            http,
            path,
            dismissed,
        }
    }

    pub fn dismissed_ids(&self) -> HashSet<i64> {
        self.dismissed.lock().unwrap().clone()
    }

    fn save(&self, ids: &HashSet<i64>) -> Result<(), ApiError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(ApiError::Storage)?;
        }
        let mut sorted: Vec<i64> = ids.iter().copied().collect();
        sorted.sort_unstable();
        let body = serde_json::to_string(&sorted).map_err(ApiError::Decode)?;
        std::fs::write(&self.path, body).map_err(ApiError::Storage)
    }

    fn filter(&self, list: Vec<AiSuggestion>) -> Vec<AiSuggestion> {
        let dismissed = self.dismissed.lock().unwrap();
        list.into_iter()
            .filter(|s| !dismissed.contains(&s.id))
            .collect()
    }
}

fn load_dismissed(path: &PathBuf) -> HashSet<i64> {
    // Unreadable or malformed state starts an empty set, same as a fresh
    // install.
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<Vec<i64>>(&raw).ok())
        .map(HashSet::from_iter)
        .unwrap_or_default()
}

#[async_trait]
impl SuggestionStore for LocalStore {
    async fn list(&self) -> Result<Vec<AiSuggestion>, ApiError> {
        let res: ItemsResponse = self.http.get("/ai/suggestions").await?;
        Ok(self.filter(res.items))
    }

    async fn refresh(&self) -> Result<Vec<AiSuggestion>, ApiError> {
        let res: ItemsResponse = self.http.post_empty("/ai/suggestions/refresh").await?;
        Ok(self.filter(res.items))
    }

    async fn accept(&self, id: i64) -> Result<AiSuggestion, ApiError> {
        let res: ItemResponse = self
            .http
            .post_empty(&format!("/ai/suggestions/{id}/accept"))
            .await?;
        Ok(res.item)
    }

    async fn dismiss(&self, id: i64) -> Result<(), ApiError> {
        let snapshot = {
            let mut dismissed = self.dismissed.lock().unwrap();
            dismissed.insert(id);
            dismissed.clone()
        };
        if let Err(err) = self.save(&snapshot) {
            // Roll back so the id reappears in the visible list.
            self.dismissed.lock().unwrap().remove(&id);
            return Err(err);
        }
        Ok(())
    }

    async fn bulk_dismiss(&self, ids: &[i64]) -> BulkOutcome {
        let snapshot = {
            let mut dismissed = self.dismissed.lock().unwrap();
            dismissed.extend(ids.iter().copied());
            dismissed.clone()
        };
        match self.save(&snapshot) {
            Ok(()) => BulkOutcome {
                done: ids.to_vec(),
                failed: Vec::new(),
            },
            Err(err) => {
                let mut dismissed = self.dismissed.lock().unwrap();
                for id in ids {
                    dismissed.remove(id);
                }
                let message = err.to_string();
                BulkOutcome {
                    done: Vec::new(),
                    failed: ids.iter().map(|&id| (id, message.clone())).collect(),
                }
            }
        }
    }
}

// ============================================================================
// Cached front
// ============================================================================

#[derive(Clone)]
pub struct Suggestions {
    store: Arc<dyn SuggestionStore>,
    cache: Arc<QueryCache>,
    poller: Arc<Mutex<Option<SuggestionPoller>>>,
}

impl Suggestions {
    pub fn new(store: Arc<dyn SuggestionStore>, cache: Arc<QueryCache>) -> Self {
        Self {
            store,
            cache,
            poller: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn list(&self) -> Result<Vec<AiSuggestion>, ApiError> {
        let store = self.store.clone();
        self.cache
            .get_or_fetch(suggestions_key(), None, move || async move {
                store.list().await
            })
            .await
    }

    /// Regenerate server-side and replace the cached list with the result.
    pub async fn refresh(&self) -> Result<Vec<AiSuggestion>, ApiError> {
        let list = self.store.refresh().await?;
        self.cache.set_value(&suggestions_key(), &list);
        Ok(list)
    }

    /// Accept: terminal state. The id is removed from the cached list in
    /// place; no refetch.
    pub async fn accept(&self, id: i64) -> Result<AiSuggestion, ApiError> {
        let suggestion = self.store.accept(id).await?;
        self.remove_cached(&[id]);
        Ok(suggestion)
    }

    /// Dismiss: terminal state. Removal happens only after the store call
    /// succeeds, so a failed dismiss leaves the id visible.
    pub async fn dismiss(&self, id: i64) -> Result<(), ApiError> {
        self.store.dismiss(id).await?;
        self.remove_cached(&[id]);
        Ok(())
    }

    /// Convert a suggestion into a todo, then mark it accepted
    /// (best-effort) and drop it from the visible list. The todos cache is
    /// invalidated wholesale since any partition may now include the new
    /// item.
    pub async fn add_to_todos(
        &self,
        todos: &TodosApi,
        suggestion: &AiSuggestion,
        active_filters: &TodoFilters,
    ) -> Result<Todo, ApiError> {
        let input = TodoInput {
            title: Some(suggestion.title.clone()),
            description: Some(suggestion.detail.clone().unwrap_or_default()),
            ..Default::default()
        };
        let todo = todos.create(&input, active_filters).await?;
        if let Err(err) = self.store.accept(suggestion.id).await {
            tracing::debug!(id = suggestion.id, error = %err, "accept after add failed");
        }
        self.remove_cached(&[suggestion.id]);
        self.cache.invalidate_prefix(&QueryKey::root(TODOS_KEY));
        Ok(todo)
    }

    /// Add every visible suggestion, sequentially; failures are collected
    /// per item and never abort the batch.
    pub async fn add_all(
        &self,
        todos: &TodosApi,
        active_filters: &TodoFilters,
    ) -> Result<BulkOutcome, ApiError> {
        let list = self.list().await?;
        let mut outcome = BulkOutcome::default();
        for suggestion in &list {
            match self.add_to_todos(todos, suggestion, active_filters).await {
                Ok(_) => outcome.done.push(suggestion.id),
                Err(err) => outcome.failed.push((suggestion.id, err.to_string())),
            }
        }
        Ok(outcome)
    }

    /// Dismiss a batch; exactly the ids that succeeded disappear from the
    /// visible list.
    pub async fn dismiss_all(&self, ids: &[i64]) -> BulkOutcome {
        let outcome = self.store.bulk_dismiss(ids).await;
        self.remove_cached(&outcome.done);
        outcome
    }

    /// Cached snapshot without touching the network.
    pub fn cached(&self) -> Option<Vec<AiSuggestion>> {
        self.cache.peek(&suggestions_key())
    }

    /// One poll tick: fetch fresh (bypassing the cache), overwrite the
    /// cached list, and report whether suggestions are present. Fetch
    /// errors keep the previous snapshot.
    pub async fn poll_once(&self) -> bool {
        match self.store.list().await {
            Ok(list) => {
                let has = !list.is_empty();
                self.cache.set_value(&suggestions_key(), &list);
                has
            }
            Err(err) => {
                tracing::warn!(error = %err, "suggestion poll failed");
                self.cached().map_or(false, |list| !list.is_empty())
            }
        }
    }

    /// Start (or restart) polling. The single slot guarantees at most one
    /// live timer: replacing the previous poller aborts it.
    pub fn start_polling(&self, visibility: watch::Receiver<bool>) {
        let initial_has = self.cached().map_or(false, |list| !list.is_empty());
        let this = self.clone();
        let poller = SuggestionPoller::spawn(visibility, initial_has, move || {
            let this = this.clone();
            async move { this.poll_once().await }
        });
        *self.poller.lock().unwrap() = Some(poller);
    }

    pub fn stop_polling(&self) {
        self.poller.lock().unwrap().take();
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .lock()
            .unwrap()
            .as_ref()
            .map_or(false, SuggestionPoller::is_running)
    }

    fn remove_cached(&self, ids: &[i64]) {
        if ids.is_empty() {
            return;
        }
        self.cache
            .update_list::<AiSuggestion, _>(&suggestions_key(), |list| {
                list.into_iter()
                    .filter(|s| !ids.contains(&s.id))
                    .collect()
            });
    }
}
