//! Text rewrite endpoint (`POST /ai/rephrase`). Suggestions live in
//! `suggestions`; this is the only other AI surface the client touches.

use crate::error::ApiError;
use crate::http::HttpClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct RephraseRequest<'a> {
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct RephraseResponse {
    rephrased: String,
}

#[derive(Clone)]
pub struct AiApi {
    http: Arc<HttpClient>,
}

impl AiApi {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub async fn rephrase(&self, description: &str) -> Result<String, ApiError> {
        if description.trim().is_empty() {
            return Err(ApiError::validation("description", "must not be empty"));
        }
        let res: RephraseResponse = self
            .http
            .post("/ai/rephrase", &RephraseRequest { description })
            .await?;
        Ok(res.rephrased)
    }
}
