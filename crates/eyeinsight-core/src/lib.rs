//! Core library for the EyeInsight retinal screening client.
//!
//! The heart of it is the session lifecycle: `auth::SessionStore` owns the
//! token and the authentication state, and `routing` gates protected surfaces
//! on that state and turns its transitions into navigation.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod routing;
pub mod utils;
pub mod validation;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, Session, SessionStatus, SessionStore};
pub use config::Config;
pub use routing::{GuardDecision, Navigator, Route};
