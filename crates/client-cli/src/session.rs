//! Shared session state and the guards that gate protected surfaces.
//!
//! One `AuthState` is created at startup and injected wherever session
//! decisions are made; it is never ambient global state. A failure streak
//! produces exactly one "session expired" notification, re-armed by the
//! next successful refresh.

use crate::error::ApiError;
use crate::http::HttpClient;
use crate::notify::{Notifier, Severity};
use serde::Deserialize;
use shared::User;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

const SESSION_EXPIRED_MSG: &str = "Session expired. Please sign in again.";

/// Reactive session snapshot. While `loading` is true no decision may be
/// made on `user`; `user == None && !loading` means unauthenticated.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    user: User,
}

pub struct AuthState {
    http: Arc<HttpClient>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<Session>,
    /// Set once the first refresh has settled; guards refresh lazily until
    /// then so they never decide on a session that was simply never loaded.
    loaded: AtomicBool,
    /// One notification per failure streak.
    notified: AtomicBool,
}

impl AuthState {
    pub fn new(http: Arc<HttpClient>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            http,
            notifier,
            state: Mutex::new(Session::default()),
            loaded: AtomicBool::new(false),
            notified: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.lock().unwrap().clone()
    }

    /// Re-fetch the current user. On failure the user is cleared and the
    /// message recorded; the "session expired" notification fires at most
    /// once until a refresh succeeds again.
    pub async fn refresh(&self) {
        self.state.lock().unwrap().loading = true;

        let result = self.http.get::<MeResponse>("/auth/me").await;

        let mut state = self.state.lock().unwrap();
        match result {
            Ok(res) => {
                tracing::debug!(user_id = res.user.id, "session refreshed");
                state.user = Some(res.user);
                state.error = None;
                self.notified.store(false, Ordering::SeqCst);
            }
            Err(err) => {
                tracing::debug!(error = %err, "session refresh failed");
                state.user = None;
                state.error = Some(err.to_string());
                if !self.notified.swap(true, Ordering::SeqCst) {
                    self.notifier.notify(SESSION_EXPIRED_MSG, Severity::Warning);
                }
            }
        }
        state.loading = false;
        drop(state);
        self.loaded.store(true, Ordering::SeqCst);
    }

    /// Where the browser would navigate to start the OAuth dance. A side
    /// effect for the caller (open/print), not a fetch.
    pub fn login_url(&self) -> String {
        self.oauth_url("/auth/google")
    }

    pub fn outlook_login_url(&self) -> String {
        self.oauth_url("/auth/outlook/start")
    }

    fn oauth_url(&self, path: &str) -> String {
        self.http
            .url(path, &[])
            .map(|url| url.to_string())
            .unwrap_or_else(|_| format!("{}{}", self.http.base_url(), path.trim_start_matches('/')))
    }

    /// Best-effort server logout (its error is swallowed), then local
    /// teardown and a notification.
    pub async fn logout(&self) {
        if let Err(err) = self.http.post_empty::<serde_json::Value>("/auth/logout").await {
            tracing::debug!(error = %err, "logout call failed, clearing session anyway");
        }
        let mut state = self.state.lock().unwrap();
        state.user = None;
        state.error = None;
        drop(state);
        self.notifier.notify("Signed out", Severity::Info);
    }

    /// Gate for protected surfaces: refreshes lazily on first use, then
    /// requires an authenticated user.
    pub async fn require_user(&self) -> Result<User, ApiError> {
        if !self.loaded.load(Ordering::SeqCst) {
            self.refresh().await;
        }
        self.snapshot().user.ok_or(ApiError::Unauthenticated)
    }

    /// Gate for the admin surface: authenticated and `role == "admin"`.
    pub async fn require_admin(&self) -> Result<User, ApiError> {
        let user = self.require_user().await?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(ApiError::Forbidden)
        }
    }
}
