//! REST API client module for the EyeInsight screening service.
//!
//! This module provides the `ApiClient` for the authentication endpoints
//! (`/login`, `/signup`, `/validate-token`) and the scan endpoints
//! (`/scans`, `/scans/{id}`, `/upload`).
//!
//! Authenticated endpoints take the session token as a bearer credential.

pub mod client;
pub mod error;

pub use client::{ApiClient, ScanUpload, SignupResponse, DEFAULT_BASE_URL};
pub use error::ApiError;
