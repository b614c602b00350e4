//! Todo CRUD over the cache: list results are partitioned per filter set,
//! and a mutation invalidates only the partition the caller is looking at.

use crate::cache::{QueryCache, QueryKey};
use crate::error::ApiError;
use crate::http::HttpClient;
use serde::Deserialize;
use shared::{Todo, TodoFilters, TodoInput};
use std::sync::Arc;

pub const TODOS_KEY: &str = "todos";

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    items: Vec<Todo>,
}

#[derive(Debug, Deserialize)]
struct ItemResponse {
    item: Todo,
}

/// Cache key for one filter combination. Filters serialize with absent
/// fields skipped, so the canonical JSON is stable per combination.
pub fn todos_key(filters: &TodoFilters) -> QueryKey {
    let canonical = serde_json::to_string(filters).unwrap_or_else(|_| "{}".to_string());
    QueryKey::new([TODOS_KEY.to_string(), canonical])
}

#[derive(Clone)]
pub struct TodosApi {
    http: Arc<HttpClient>,
    cache: Arc<QueryCache>,
}

impl TodosApi {
    pub fn new(http: Arc<HttpClient>, cache: Arc<QueryCache>) -> Self {
        Self { http, cache }
    }

    pub async fn list(&self, filters: &TodoFilters) -> Result<Vec<Todo>, ApiError> {
        let http = self.http.clone();
        let params = query_params(filters);
        self.cache
            .get_or_fetch(todos_key(filters), None, move || async move {
                let res: ItemsResponse = http.get_with("/api/todos", &params).await?;
                Ok(res.items)
            })
            .await
    }

    /// Create a todo and invalidate the list partition the caller is
    /// viewing. Other filter partitions keep their snapshots.
    pub async fn create(
        &self,
        input: &TodoInput,
        active_filters: &TodoFilters,
    ) -> Result<Todo, ApiError> {
        if input.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err(ApiError::validation("title", "must not be empty"));
        }
        let res: ItemResponse = self.http.post("/api/todos", input).await?;
        self.cache.invalidate(&todos_key(active_filters));
        Ok(res.item)
    }

    /// Partial update; absent `TodoInput` fields are left untouched server-side.
    pub async fn update(
        &self,
        id: i64,
        input: &TodoInput,
        active_filters: &TodoFilters,
    ) -> Result<Todo, ApiError> {
        let res: ItemResponse = self
            .http
            .patch(&format!("/api/todos/{id}"), input)
            .await?;
        self.cache.invalidate(&todos_key(active_filters));
        Ok(res.item)
    }

    pub async fn delete(&self, id: i64, active_filters: &TodoFilters) -> Result<(), ApiError> {
        self.http.delete(&format!("/api/todos/{id}")).await?;
        self.cache.invalidate(&todos_key(active_filters));
        Ok(())
    }
}

fn query_params(filters: &TodoFilters) -> Vec<(&'static str, Option<String>)> {
    vec![
        ("status", filters.status.map(|s| s.to_string())),
        ("priority", filters.priority.map(|p| p.to_string())),
        ("q", filters.q.clone()),
        ("dueFrom", filters.due_from.map(|d| d.to_string())),
        ("dueTo", filters.due_to.map(|d| d.to_string())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::DEFAULT_TIMEOUT;
    use serde_json::json;
    use shared::{TodoPriority, TodoStatus};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn api(server: &MockServer) -> TodosApi {
        TodosApi::new(
            Arc::new(HttpClient::new(&server.uri(), DEFAULT_TIMEOUT).unwrap()),
            Arc::new(QueryCache::new()),
        )
    }

    fn todo_json(id: i64, title: &str, status: &str) -> serde_json::Value {
        json!({
            "id": id,
            "userId": 1,
            "title": title,
            "status": status,
            "priority": "normal",
            "createdAt": "2026-08-20T10:00:00Z",
            "updatedAt": "2026-08-20T10:00:00Z"
        })
    }

    #[tokio::test]
    async fn list_sends_only_present_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .and(query_param("status", "done"))
            .and(query_param("q", "milk"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [todo_json(1, "Buy milk", "done")]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let filters = TodoFilters {
            status: Some(TodoStatus::Done),
            q: Some("milk".to_string()),
            ..Default::default()
        };
        let todos = api(&server).list(&filters).await.unwrap();
        assert_eq!(todos.len(), 1);
        assert_eq!(todos[0].title, "Buy milk");
    }

    #[tokio::test]
    async fn repeated_list_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api(&server);
        let filters = TodoFilters::default();
        api.list(&filters).await.unwrap();
        api.list(&filters).await.unwrap();
    }

    #[tokio::test]
    async fn create_invalidates_only_active_filter_partition() {
        let server = MockServer::start().await;
        // Unfiltered list: first empty, then containing the new todo.
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .up_to_n_times(2) // both partitions primed once each
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/todos"))
            .and(body_json(
                json!({"title": "Buy milk", "status": "pending", "priority": "normal"}),
            ))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"item": todo_json(7, "Buy milk", "pending")})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [todo_json(7, "Buy milk", "pending")]})),
            )
            .mount(&server)
            .await;

        let api = api(&server);
        let all = TodoFilters::default();
        let done = TodoFilters {
            status: Some(TodoStatus::Done),
            ..Default::default()
        };

        // Prime both partitions.
        assert!(api.list(&all).await.unwrap().is_empty());
        assert!(api.list(&done).await.unwrap().is_empty());

        let input = TodoInput {
            title: Some("Buy milk".to_string()),
            status: Some(TodoStatus::Pending),
            priority: Some(TodoPriority::Normal),
            ..Default::default()
        };
        api.create(&input, &all).await.unwrap();

        // Active partition refetches and sees the new todo; the other
        // partition still returns its cached snapshot.
        let refetched = api.list(&all).await.unwrap();
        assert_eq!(refetched.iter().map(|t| t.id).collect::<Vec<_>>(), vec![7]);
        assert!(api.list(&done).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_reflects_after_invalidation_refetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [todo_json(5, "Task", "pending")]})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/todos/5"))
            .and(body_json(json!({"status": "done"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"item": todo_json(5, "Task", "done")})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [todo_json(5, "Task", "done")]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = api(&server);
        let filters = TodoFilters::default();
        assert_eq!(api.list(&filters).await.unwrap()[0].status, TodoStatus::Pending);

        let patch = TodoInput {
            status: Some(TodoStatus::Done),
            ..Default::default()
        };
        api.update(5, &patch, &filters).await.unwrap();

        assert_eq!(api.list(&filters).await.unwrap()[0].status, TodoStatus::Done);
    }

    #[tokio::test]
    async fn create_rejects_empty_title_without_network() {
        let server = MockServer::start().await;
        // No POST mock mounted: a network call would fail the test via 404.
        let api = api(&server);
        let err = api
            .create(&TodoInput::default(), &TodoFilters::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }

    #[tokio::test]
    async fn delete_invalidates_partition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"items": [todo_json(5, "Task", "pending")]})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/todos/5"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let api = api(&server);
        let filters = TodoFilters::default();
        assert_eq!(api.list(&filters).await.unwrap().len(), 1);
        api.delete(5, &filters).await.unwrap();
        assert!(api.list(&filters).await.unwrap().is_empty());
    }
}
