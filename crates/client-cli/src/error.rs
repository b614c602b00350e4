use thiserror::Error;

/// Error taxonomy for every call that touches the API.
///
/// `Transport` propagates the underlying network failure unmodified;
/// `Timeout` is a locally-cancelled request normalized to an HTTP-like 408;
/// `Http` is any non-2xx response with whatever the server said about it;
/// `Validation` never reaches the network. `Unauthenticated`/`Forbidden`
/// come from the session guards, not the wire.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        code: Option<String>,
        data: Option<serde_json::Value>,
    },

    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Transport(reqwest::Error),

    #[error("invalid request URL: {0}")]
    Url(String),

    #[error("failed to decode response body: {0}")]
    Decode(serde_json::Error),

    #[error("local state: {0}")]
    Storage(std::io::Error),

    #[error("not signed in")]
    Unauthenticated,

    #[error("admin access required")]
    Forbidden,

    #[error("{field}: {message}")]
    Validation { field: String, message: String },
}

impl ApiError {
    /// HTTP-like status for errors that carry one. Timeouts report 408.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Timeout => Some(408),
            ApiError::Unauthenticated => Some(401),
            ApiError::Forbidden => Some(403),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Http { code, .. } => code.as_deref(),
            ApiError::Timeout => Some("TIMEOUT"),
            _ => None,
        }
    }

    /// Normalize a reqwest failure: local timeout cancellation becomes
    /// `Timeout`, anything else stays a transport error.
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Transport(err)
        }
    }

    pub(crate) fn validation(field: &str, message: &str) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_reports_408_and_code() {
        let err = ApiError::Timeout;
        assert_eq!(err.status(), Some(408));
        assert_eq!(err.code(), Some("TIMEOUT"));
    }

    #[test]
    fn test_http_error_carries_server_details() {
        let err = ApiError::Http {
            status: 422,
            message: "title is required".to_string(),
            code: Some("VALIDATION".to_string()),
            data: None,
        };
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.code(), Some("VALIDATION"));
        assert_eq!(err.to_string(), "title is required");
    }

    #[test]
    fn test_validation_has_no_status() {
        let err = ApiError::validation("title", "must not be empty");
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "title: must not be empty");
    }
}
