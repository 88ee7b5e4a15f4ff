use thiserror::Error;

use crate::api::ApiError;

/// Failures surfaced by session operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The server refused the email/password pair
    #[error("{0}")]
    InvalidCredentials(String),

    /// The token is malformed, expired or revoked
    #[error("Token validation failed")]
    ValidationFailed,

    /// Remote unreachable, or a non-2xx without a structured body
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The server answered with its own error message
    #[error("{0}")]
    ServerRejected(String),

    /// The token could not be written to durable storage
    #[error("Could not store session token: {0}")]
    Storage(String),
}

impl AuthError {
    /// Message suitable for the session's `Failed` reason, falling back when the
    /// server did not supply one.
    pub fn reason_or(&self, fallback: &str) -> String {
        match self {
            AuthError::InvalidCredentials(m) | AuthError::ServerRejected(m) => m.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Map a failure from `/login` or `/signup`
    pub fn from_credential_failure(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(message) => AuthError::InvalidCredentials(
                message.unwrap_or_else(|| "Invalid credentials".to_string()),
            ),
            ApiError::AccessDenied(Some(message)) | ApiError::Rejected { message, .. } => {
                AuthError::ServerRejected(message)
            }
            other => AuthError::NetworkError(other.to_string()),
        }
    }

    /// Map a failure from `/validate-token`
    pub fn from_validation_failure(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized(_) | ApiError::AccessDenied(_) | ApiError::InvalidResponse(_) => {
                AuthError::ValidationFailed
            }
            ApiError::Rejected { message, .. } => AuthError::ServerRejected(message),
            other => AuthError::NetworkError(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_failure_mapping() {
        let err = AuthError::from_credential_failure(ApiError::Unauthorized(Some("Invalid credentials".into())));
        assert_eq!(err, AuthError::InvalidCredentials("Invalid credentials".into()));
        assert_eq!(err.reason_or("Login failed"), "Invalid credentials");

        let err = AuthError::from_credential_failure(ApiError::Unauthorized(None));
        assert_eq!(err.to_string(), "Invalid credentials");

        let err = AuthError::from_credential_failure(ApiError::Rejected {
            status: 409,
            message: "Email already registered".into(),
        });
        assert_eq!(err, AuthError::ServerRejected("Email already registered".into()));

        let err = AuthError::from_credential_failure(ApiError::ServerError("boom".into()));
        assert!(matches!(err, AuthError::NetworkError(_)));
        assert_eq!(err.reason_or("Signup failed"), "Signup failed");
    }

    #[test]
    fn test_validation_failure_mapping() {
        assert_eq!(
            AuthError::from_validation_failure(ApiError::AccessDenied(None)),
            AuthError::ValidationFailed
        );
        assert_eq!(
            AuthError::from_validation_failure(ApiError::InvalidResponse("bad".into())),
            AuthError::ValidationFailed
        );
        assert!(matches!(
            AuthError::from_validation_failure(ApiError::RateLimited),
            AuthError::NetworkError(_)
        ));
    }
}
