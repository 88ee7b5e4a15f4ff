use serde::Serialize;

use crate::models::User;

/// Where the session stands. An `Authenticated` status is the only place a
/// confirmed user lives, so "user present iff authenticated" holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Startup check has not run yet
    Idle,
    /// Startup check, login or signup in flight
    Validating,
    Authenticated(User),
    Anonymous,
    /// Most recent login/signup failed; carries the reason shown to the user
    Failed(String),
}

impl SessionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionStatus::Idle | SessionStatus::Validating)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated(_))
    }
}

/// What last happened to the session. Navigation keys off this, not off the
/// status alone: a restored session stays put, a fresh login goes to the landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    Created,
    ValidationStarted,
    /// Startup check confirmed the persisted token
    Restored,
    /// Startup found no token, or the remote rejected it
    StartupAnonymous,
    LoggedIn,
    SignedUp,
    AttemptFailed,
    LoggedOut,
}

/// Snapshot published to subscribers after every settled transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub status: SessionStatus,
    pub event: SessionEvent,
    /// Incremented on every published change
    pub revision: u64,
}

impl Session {
    pub fn new() -> Self {
        Self {
            token: None,
            status: SessionStatus::Idle,
            event: SessionEvent::Created,
            revision: 0,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match &self.status {
            SessionStatus::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status.is_authenticated()
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
