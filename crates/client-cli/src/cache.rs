//! Keyed query cache: the only shared mutable resource in the client.
//!
//! Entries are partitioned by `QueryKey` (resource name + parameters) and
//! only ever change through the documented operations here: fetch-through,
//! invalidation (exact or by prefix), direct overwrite after a mutation
//! that returns fresh data, and in-place list edits for optimistic removal.
//! Callers treat returned values as read-only snapshots.

use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Ordered key segments, e.g. `["todos", <canonical filters>]` or
/// `["admin", "users", "all", "20", "0"]`. Prefix matching backs
/// `invalidate_prefix`, mirroring how list invalidations cover every
/// parameterized variant of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn root(name: &str) -> Self {
        Self(vec![name.to_string()])
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.len() >= prefix.0.len() && self.0[..prefix.0.len()] == prefix.0[..]
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

struct Entry {
    value: serde_json::Value,
    fetched_at: Instant,
    stale_after: Option<Duration>,
}

impl Entry {
    fn is_fresh(&self) -> bool {
        self.stale_after
            .map_or(true, |window| self.fetched_at.elapsed() < window)
    }
}

#[derive(Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Entry>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch-through read: a fresh cached entry is returned without touching
    /// the network; otherwise `fetch` runs and its result is stored under
    /// `key`. The lock is never held across the fetch await.
    pub async fn get_or_fetch<T, F, Fut>(
        &self,
        key: QueryKey,
        stale_after: Option<Duration>,
        fetch: F,
    ) -> Result<T, ApiError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        if let Some(value) = self.lookup(&key) {
            if let Ok(cached) = serde_json::from_value(value) {
                tracing::trace!(%key, "cache hit");
                return Ok(cached);
            }
            // A cached value that no longer decodes is treated as a miss.
            self.invalidate(&key);
        }
        let fresh = fetch().await?;
        self.store(&key, &fresh, stale_after);
        Ok(fresh)
    }

    /// Overwrite an entry with data a mutation already returned, e.g. the
    /// regenerated suggestion list.
    pub fn set_value<T: Serialize>(&self, key: &QueryKey, value: &T) {
        self.store(key, value, None);
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Drop every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) {
        self.entries
            .lock()
            .unwrap()
            .retain(|key, _| !key.starts_with(prefix));
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Edit a cached list in place (optimistic removal of accepted or
    /// dismissed items) without changing its freshness. Missing or
    /// undecodable entries are left alone.
    pub fn update_list<T, F>(&self, key: &QueryKey, edit: F)
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Vec<T>) -> Vec<T>,
    {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            if let Ok(list) = serde_json::from_value::<Vec<T>>(entry.value.clone()) {
                match serde_json::to_value(edit(list)) {
                    Ok(value) => entry.value = value,
                    Err(e) => tracing::warn!(%key, error = %e, "dropping unencodable cache edit"),
                }
            }
        }
    }

    /// Snapshot of a cached value, whether fresh or stale. Used for
    /// rendering decisions (e.g. the poller's interval choice), never for
    /// writes.
    pub fn peek<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .and_then(|entry| serde_json::from_value(entry.value.clone()).ok())
    }

    fn lookup(&self, key: &QueryKey) -> Option<serde_json::Value> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(key)
            .filter(|entry| entry.is_fresh())
            .map(|entry| entry.value.clone())
    }

    fn store<T: Serialize>(&self, key: &QueryKey, value: &T, stale_after: Option<Duration>) {
        match serde_json::to_value(value) {
            Ok(value) => {
                self.entries.lock().unwrap().insert(
                    key.clone(),
                    Entry {
                        value,
                        fetched_at: Instant::now(),
                        stale_after,
                    },
                );
            }
            Err(e) => tracing::warn!(%key, error = %e, "value not cacheable, skipping"),
        }
    }
}
