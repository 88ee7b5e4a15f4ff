//! API client for communicating with the EyeInsight REST API.
//!
//! This module provides the `ApiClient` struct for the credential endpoints
//! and for listing, fetching and uploading retinal scans.

use std::time::Duration;

use reqwest::{multipart, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{ScanListResponse, ScanRecord, SignupProfile, UploadResponse, User};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when neither config nor environment provide one
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000/api";

/// HTTP request timeout in seconds.
/// Scan uploads run inference server-side, so this stays generous.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) scan reads.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Body returned by `/signup`: the new account and its first token.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupResponse {
    pub user: User,
    pub token: String,
}

/// An image file ready to be posted to `/upload`.
#[derive(Debug, Clone)]
pub struct ScanUpload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// API client for the EyeInsight service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client rooted at `base_url`
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn require_token(&self) -> Result<&str, ApiError> {
        self.token
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized(Some("Not authenticated".to_string())))
    }

    // =========================================================================
    // Credential endpoints
    // =========================================================================

    /// Exchange credentials for a token
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        debug!(email = email, "Sending login request");
        let response = self
            .client
            .post(self.url("login"))
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let body: LoginResponse = Self::parse_json(response, "login").await?;
        Ok(body.token)
    }

    /// Register a new account. The response already includes the user record.
    pub async fn signup(&self, profile: &SignupProfile) -> Result<SignupResponse, ApiError> {
        debug!(email = %profile.email, username = %profile.username, "Sending signup request");
        let response = self
            .client
            .post(self.url("signup"))
            .json(profile)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, "signup").await
    }

    /// Confirm a token and fetch the account it belongs to
    pub async fn validate_token(&self, token: &str) -> Result<User, ApiError> {
        let response = self
            .client
            .get(self.url("validate-token"))
            .bearer_auth(token)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, "validate-token").await
    }

    // =========================================================================
    // Scan endpoints
    // =========================================================================

    /// Fetch the scan history of the authenticated user
    pub async fn fetch_scans(&self) -> Result<Vec<ScanRecord>, ApiError> {
        let resp: ScanListResponse = self.get("scans").await?;
        debug!(count = resp.scans.len(), "Fetched scans");
        Ok(resp.scans)
    }

    /// Fetch a single scan result
    pub async fn fetch_scan(&self, id: &str) -> Result<ScanRecord, ApiError> {
        if !is_path_segment(id) {
            return Err(ApiError::InvalidScanId(id.to_string()));
        }
        self.get(&format!("scans/{}", id)).await
    }

    /// Upload a retinal image; the server runs the prediction and returns the new scan
    pub async fn upload_scan(&self, upload: ScanUpload) -> Result<ScanRecord, ApiError> {
        let token = self.require_token()?;
        let size = upload.bytes.len();

        let part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)?;
        let form = multipart::Form::new().part("file", part);

        debug!(file = %upload.file_name, size = size, "Uploading scan");
        let response = self
            .client
            .post(self.url("upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let body: UploadResponse = Self::parse_json(response, "upload").await?;
        Ok(body.scan)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse {} response: {}", endpoint, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let token = self.require_token()?;
        let url = self.url(path);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self.client.get(&url).bearer_auth(token).send().await?;

            match Self::check_response(response).await {
                Ok(response) => return Self::parse_json(response, path).await,
                Err(ApiError::RateLimited) => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(url = %url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_path_segment(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&format!("{}/api/", server.uri())).expect("Failed to build client")
    }

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:5000/api/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.url("/login"), "http://localhost:5000/api/login");
        assert_eq!(client.url("scans/7"), "http://localhost:5000/api/scans/7");
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .and(body_json(serde_json::json!({"email": "a@x.com", "password": "secret1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "abc123"})))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server).await.login("a@x.com", "secret1").await.unwrap();
        assert_eq!(token, "abc123");
    }

    #[tokio::test]
    async fn test_login_rejected_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).await.login("a@x.com", "wrongpw").await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
        assert_eq!(err.server_message(), Some("Invalid credentials"));
    }

    #[tokio::test]
    async fn test_signup_returns_user_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/signup"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "user": {"id": 2, "username": "bob", "email": "b@x.com", "role": "user"},
                "token": "tok2"
            })))
            .mount(&server)
            .await;

        let profile = SignupProfile::new("bob", "b@x.com", "secret1");
        let resp = client_for(&server).await.signup(&profile).await.unwrap();
        assert_eq!(resp.token, "tok2");
        assert_eq!(resp.user.username, "bob");
        assert_eq!(resp.user.id, "2");
    }

    #[tokio::test]
    async fn test_validate_token_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/validate-token"))
            .and(header("authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1", "username": "alice", "email": "a@x.com", "role": "user"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/validate-token"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let user = client.validate_token("abc123").await.unwrap();
        assert_eq!(user.username, "alice");

        let err = client.validate_token("stale").await.unwrap_err();
        assert!(matches!(err, ApiError::AccessDenied(None)));
    }

    #[tokio::test]
    async fn test_fetch_scans_requires_token() {
        let server = MockServer::start().await;
        let err = client_for(&server).await.fetch_scans().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_fetch_scans_and_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/scans"))
            .and(header("authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "scans": [
                    {"id": 1, "datetime": "2025-05-10T14:30:00", "pred": "Normal", "confidence": 0.97, "imagepath": "a.png"},
                    {"id": 2, "datetime": "2025-05-11T09:00:00", "pred": "Glaucoma", "confidence": 0.81, "severity": "Mild", "imagepath": "b.png"}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/scans/2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 2, "prediction": "Glaucoma", "conf": 0.81, "severity": "Mild", "imagepath": "b.png"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await.with_token("abc123".to_string());
        let scans = client.fetch_scans().await.unwrap();
        assert_eq!(scans.len(), 2);
        assert_eq!(scans[1].prediction, "Glaucoma");

        let scan = client.fetch_scan("2").await.unwrap();
        assert_eq!(scan.confidence_percent(), 81);
    }

    #[tokio::test]
    async fn test_fetch_scan_rejects_ids_that_leave_the_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server).await.with_token("abc123".to_string());
        for id in ["../x", "2/../../upload", "a?b=1", "", "%2e%2e"] {
            let err = client.fetch_scan(id).await.unwrap_err();
            assert!(matches!(err, ApiError::InvalidScanId(ref got) if got == id));
        }
        assert!(is_path_segment("6f1c-77_a"));
    }

    #[tokio::test]
    async fn test_upload_scan() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .and(header("authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "scan": {"id": 9, "prediction": "Cataract", "confidence": 0.66, "imagepath": "uploads/9.png"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let upload = ScanUpload {
            file_name: "eye.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        };
        let client = client_for(&server).await.with_token("abc123".to_string());
        let scan = client.upload_scan(upload).await.unwrap();
        assert_eq!(scan.id, "9");
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/validate-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.validate_token("abc123").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
