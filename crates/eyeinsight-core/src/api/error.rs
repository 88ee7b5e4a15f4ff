use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// 401 from the server, with its `{message}` if one was sent
    #[error("Unauthorized{}", message_suffix(.0))]
    Unauthorized(Option<String>),

    #[error("Access denied{}", message_suffix(.0))]
    AccessDenied(Option<String>),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Non-2xx with a structured `{message}` body
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Scan ids are a single path segment of letters, digits, `-` or `_`
    #[error("Invalid scan id: {0:?}")]
    InvalidScanId(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default()
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull `message` out of a JSON error body, if there is one.
    fn structured_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::structured_message(body);
        match (status.as_u16(), message) {
            (401, message) => ApiError::Unauthorized(message),
            (403, message) => ApiError::AccessDenied(message),
            (429, _) => ApiError::RateLimited,
            (404, None) => ApiError::NotFound(Self::truncate_body(body)),
            (code, Some(message)) => ApiError::Rejected { status: code, message },
            (500..=599, None) => ApiError::ServerError(Self::truncate_body(body)),
            (_, None) => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// The server-provided message, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(m) | ApiError::AccessDenied(m) => m.as_deref(),
            ApiError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_with_message() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid credentials"}"#);
        assert!(matches!(err, ApiError::Unauthorized(Some(ref m)) if m == "Invalid credentials"));
        assert_eq!(err.server_message(), Some("Invalid credentials"));

        let err = ApiError::from_status(StatusCode::CONFLICT, r#"{"message":"Email already registered"}"#);
        assert!(matches!(err, ApiError::Rejected { status: 409, .. }));
        assert_eq!(err.server_message(), Some("Email already registered"));
    }

    #[test]
    fn test_from_status_without_message() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(err, ApiError::ServerError(_)));
        assert_eq!(err.server_message(), None);

        let err = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert!(matches!(err, ApiError::AccessDenied(None)));

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message":"  "}"#);
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.ends_with(&format!("(truncated, {} total bytes)", long.len())));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }
}
