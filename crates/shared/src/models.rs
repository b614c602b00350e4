use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Session
// ============================================================================

/// The authenticated user, as returned by `GET /auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some("admin")
    }
}

// ============================================================================
// Todos
// ============================================================================

/// Server-side todo status. The richer three-valued UI vocabulary maps onto
/// this via `mapping`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    Pending,
    Done,
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoStatus::Pending => write!(f, "pending"),
            TodoStatus::Done => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("unknown {kind}: {value}")]
pub struct ParseVocabError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for TodoStatus {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TodoStatus::Pending),
            "done" => Ok(TodoStatus::Done),
            other => Err(ParseVocabError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl fmt::Display for TodoPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TodoPriority::Low => write!(f, "low"),
            TodoPriority::Normal => write!(f, "normal"),
            TodoPriority::High => write!(f, "high"),
        }
    }
}

impl FromStr for TodoPriority {
    type Err = ParseVocabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TodoPriority::Low),
            "normal" => Ok(TodoPriority::Normal),
            "high" => Ok(TodoPriority::High),
            other => Err(ParseVocabError {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// A user-owned task record. The server is the source of truth; the client
/// only ever holds cached copies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create/update payload. All fields except `title` are optional so the same
/// shape serves `POST` (create) and `PATCH` (partial update); absent fields
/// are omitted from the JSON body entirely.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodoInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TodoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TodoPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

/// List query parameters. Each distinct combination partitions the todo
/// cache; empty/absent values are dropped from the query string.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TodoFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TodoStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TodoPriority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_to: Option<NaiveDate>,
}

impl TodoFilters {
    pub fn is_empty(&self) -> bool {
        self == &TodoFilters::default()
    }
}

// ============================================================================
// AI suggestions
// ============================================================================

/// A server-generated candidate task derived from external content (e.g. an
/// ingested email), awaiting accept or dismiss.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub source_message_ids: Vec<String>,
    #[serde(default)]
    pub confidence: f64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Provider integrations
// ============================================================================

/// A linked external account feeding the suggestion pipeline. Read-mostly:
/// mutated only through disconnect/toggle, never created client-side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub provider: String,
    pub display_name: String,
    pub linked: bool,
    pub ingest_enabled: bool,
    #[serde(default)]
    pub last_linked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sync_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

// ============================================================================
// Admin projections
// ============================================================================

/// Paginated list envelope used by all `/admin/*` list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub total_users: i64,
    pub active_users_24h: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub provider_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_active_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outlook_account_email: Option<String>,
    #[serde(default)]
    pub outlook_tenant_id: Option<String>,
    #[serde(default)]
    pub suggestions_generated: Option<i64>,
    #[serde(default)]
    pub suggestions_accepted: Option<i64>,
    #[serde(default)]
    pub tokens_generation: Option<i64>,
    #[serde(default)]
    pub tokens_embedding: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminEvent {
    pub id: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminIntegration {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub gmail_linked: bool,
    pub gmail_ingest_enabled: bool,
    #[serde(default)]
    pub gmail_last_linked_at: Option<DateTime<Utc>>,
    pub outlook_linked: bool,
    pub outlook_ingest_enabled: bool,
    #[serde(default)]
    pub outlook_last_linked_at: Option<DateTime<Utc>>,
}

/// Partial patch for `PATCH /admin/users/:id`. Doubles as the pending
/// optimistic overlay merged over cached rows while the request is in flight.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
}

impl AdminUserPatch {
    pub fn is_empty(&self) -> bool {
        self.role.is_none() && self.is_enabled.is_none()
    }

    /// Merge this patch over a server row (optimistic overlay at read time).
    pub fn apply(&self, user: &mut AdminUser) {
        if let Some(role) = &self.role {
            user.role = Some(role.clone());
        }
        if let Some(enabled) = self.is_enabled {
            user.is_enabled = Some(enabled);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_deserialization() {
        let json = r#"{"id":1,"email":"a@b.com","name":"Alice","role":"admin"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.email, "a@b.com");
        assert!(user.is_admin());

        let json = r#"{"id":2,"email":"c@d.com"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.name, None);
        assert!(!user.is_admin());
    }

    #[test]
    fn test_todo_deserialization() {
        let json = r#"{
            "id": 5,
            "userId": 1,
            "title": "Buy milk",
            "description": null,
            "status": "pending",
            "priority": "normal",
            "dueDate": "2026-09-01",
            "createdAt": "2026-08-20T10:00:00Z",
            "updatedAt": "2026-08-20T10:00:00Z"
        }"#;
        let todo: Todo = serde_json::from_str(json).unwrap();
        assert_eq!(todo.id, 5);
        assert_eq!(todo.user_id, 1);
        assert_eq!(todo.status, TodoStatus::Pending);
        assert_eq!(todo.priority, TodoPriority::Normal);
        assert_eq!(
            todo.due_date,
            Some(NaiveDate::from_ymd_opt(2026, 9, 1).unwrap())
        );
    }

    #[test]
    fn test_todo_input_skips_absent_fields() {
        let input = TodoInput {
            status: Some(TodoStatus::Done),
            ..Default::default()
        };
        let json = serde_json::to_string(&input).unwrap();
        assert_eq!(json, r#"{"status":"done"}"#);
    }

    #[test]
    fn test_todo_filters_serialization() {
        let filters = TodoFilters {
            status: Some(TodoStatus::Done),
            q: Some("milk".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&filters).unwrap();
        assert_eq!(json, r#"{"status":"done","q":"milk"}"#);

        assert!(TodoFilters::default().is_empty());
        assert!(!filters.is_empty());
        assert_eq!(serde_json::to_string(&TodoFilters::default()).unwrap(), "{}");
    }

    #[test]
    fn test_status_priority_round_trip() {
        for status in [TodoStatus::Pending, TodoStatus::Done] {
            let parsed: TodoStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        for priority in [TodoPriority::Low, TodoPriority::Normal, TodoPriority::High] {
            let parsed: TodoPriority = priority.to_string().parse().unwrap();
            assert_eq!(parsed, priority);
        }
        assert!("urgent".parse::<TodoPriority>().is_err());
    }

    #[test]
    fn test_suggestion_deserialization() {
        let json = r#"{
            "id": 9,
            "title": "Reply to invoice email",
            "detail": "From accounting, due Friday",
            "sourceMessageIds": ["m1", "m2"],
            "confidence": 0.82,
            "status": "active",
            "createdAt": "2026-08-20T10:00:00Z",
            "updatedAt": "2026-08-20T10:00:00Z"
        }"#;
        let s: AiSuggestion = serde_json::from_str(json).unwrap();
        assert_eq!(s.id, 9);
        assert_eq!(s.source_message_ids, vec!["m1", "m2"]);
        assert!((s.confidence - 0.82).abs() < 1e-9);
        assert!(s.metadata.is_none());
    }

    #[test]
    fn test_page_deserialization() {
        let json = r#"{"items":[{"id":3,"email":"x@y.com"}],"total":41,"limit":20,"offset":20}"#;
        let page: Page<AdminUser> = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total, 41);
        assert_eq!(page.offset, 20);
    }

    #[test]
    fn test_admin_user_patch() {
        let patch = AdminUserPatch {
            is_enabled: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"isEnabled":false}"#);

        let mut user: AdminUser =
            serde_json::from_str(r#"{"id":3,"email":"x@y.com","role":"user","isEnabled":true}"#)
                .unwrap();
        patch.apply(&mut user);
        assert_eq!(user.is_enabled, Some(false));
        assert_eq!(user.role.as_deref(), Some("user"));
    }

    #[test]
    fn test_provider_deserialization() {
        let json = r#"{
            "provider": "gmail",
            "displayName": "Gmail",
            "linked": true,
            "ingestEnabled": false,
            "lastLinkedAt": "2026-08-01T00:00:00Z"
        }"#;
        let p: Provider = serde_json::from_str(json).unwrap();
        assert_eq!(p.provider, "gmail");
        assert!(p.linked);
        assert!(!p.ingest_enabled);
        assert!(p.last_sync_at.is_none());
    }

    #[test]
    fn test_admin_event_type_field() {
        let json = r#"{"id":1,"type":"login","userId":7}"#;
        let e: AdminEvent = serde_json::from_str(json).unwrap();
        assert_eq!(e.event_type, "login");
        assert_eq!(e.user_id, Some(7));
    }
}
