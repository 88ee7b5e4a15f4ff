//! Authentication module: the session lifecycle and its persisted token.
//!
//! This module provides:
//! - `SessionStore`: single authority for the session state and its transitions
//! - `AuthApi`: the remote credential endpoints the store talks to
//! - `TokenStore`: durable storage for the session token (file, keychain, memory)
//!
//! The store is an explicit object owned by the application root. Views hold a
//! handle to it and watch its snapshots; nothing else mutates the session.

pub mod error;
pub mod session;
pub mod store;
pub mod token_store;

pub use error::AuthError;
pub use session::{Session, SessionEvent, SessionStatus};
pub use store::{AuthApi, SessionStore};
pub use token_store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, StorageError, TokenStore};
