//! HTTP transport: absolute URLs from a configured base, per-request
//! timeout, cookie-carried session, and an at-most-once refresh-and-retry
//! on 401 before the caller ever sees the failure.

use crate::error::ApiError;
use reqwest::{header, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const REFRESH_PATH: &str = "/auth/refresh";

#[derive(Debug, Clone)]
pub struct HttpClient {
    base: Url,
    timeout: Duration,
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base =
            Url::parse(base_url).map_err(|e| ApiError::Url(format!("{base_url}: {e}")))?;
        let inner = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(ApiError::Transport)?;
        Ok(Self {
            base,
            timeout,
            inner,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve a relative path against the base, appending only the query
    /// params that actually have a value.
    pub fn url(&self, path: &str, params: &[(&str, Option<String>)]) -> Result<Url, ApiError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| ApiError::Url(format!("{path}: {e}")))?;
        let present: Vec<(&str, String)> = params
            .iter()
            .filter_map(|(key, value)| {
                value
                    .as_ref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (*key, v.clone()))
            })
            .collect();
        if !present.is_empty() {
            url.query_pairs_mut().extend_pairs(present);
        }
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn get_with<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, Option<String>)],
    ) -> Result<T, ApiError> {
        let url = self.url(path, params)?;
        self.request_url::<T, ()>(Method::GET, url, None, true).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::POST, path, None).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PATCH, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.request::<(), ()>(Method::DELETE, path, None).await
    }

    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.url(path, &[])?;
        self.request_url(method, url, body, true).await
    }

    /// Core request path. On a 401 with `retry_on_401`, issues one silent
    /// refresh (its own failure ignored) and retries the original request
    /// exactly once with the retry budget exhausted.
    pub async fn request_url<T, B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        retry_on_401: bool,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut res = self.send(method.clone(), url.clone(), body).await?;

        if res.status() == StatusCode::UNAUTHORIZED && retry_on_401 {
            tracing::debug!(%url, "got 401, refreshing session before retry");
            let refresh_url = self.url(REFRESH_PATH, &[])?;
            let _ = self.send::<()>(Method::POST, refresh_url, None).await;
            res = self.send(method, url, body).await?;
        }

        let status = res.status();
        if !status.is_success() {
            return Err(error_from_response(res).await);
        }
        if status == StatusCode::NO_CONTENT {
            return serde_json::from_value(serde_json::Value::Null).map_err(ApiError::Decode);
        }
        res.json::<T>().await.map_err(ApiError::from_reqwest)
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        tracing::trace!(%method, %url, "api request");
        let mut req = self
            .inner
            .request(method, url)
            .timeout(self.timeout)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            req = req.json(body);
        }
        req.send().await.map_err(ApiError::from_reqwest)
    }
}

/// Normalize a non-2xx response into a typed error: prefer the nested
/// `error.message`/`error.code` shape, then a top-level `message`, then a
/// generic string. Non-JSON bodies land in both message and data as text.
async fn error_from_response(res: Response) -> ApiError {
    let status = res.status().as_u16();
    let is_json = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v.contains("application/json"));

    let mut message = String::new();
    let mut code = None;
    let data;
    if is_json {
        match res.json::<serde_json::Value>().await {
            Ok(value) => {
                if let Some(err) = value.get("error").filter(|v| v.is_object()) {
                    if let Some(m) = err.get("message").and_then(|m| m.as_str()) {
                        message = m.to_string();
                    }
                    code = err
                        .get("code")
                        .and_then(|c| c.as_str())
                        .map(str::to_string);
                }
                if message.is_empty() {
                    if let Some(m) = value.get("message") {
                        message = m.as_str().map_or_else(|| m.to_string(), str::to_string);
                    }
                }
                data = Some(value);
            }
            Err(_) => data = None,
        }
    } else {
        let text = res.text().await.unwrap_or_default();
        message = text.clone();
        data = Some(serde_json::Value::String(text));
    }
    if message.is_empty() {
        message = format!("Request failed: {status}");
    }
    ApiError::Http {
        status,
        message,
        code,
        data,
    }
}
