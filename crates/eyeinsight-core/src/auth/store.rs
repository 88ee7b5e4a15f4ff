//! The session store: single authority over authentication state.
//!
//! Every transition is applied under one lock together with the token write,
//! then published on a `watch` channel. Overlapping operations resolve
//! last-writer-wins; a subscriber never observes a token from one call paired
//! with a user from another.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, SignupResponse};
use crate::models::{SignupProfile, User};

use super::{AuthError, Session, SessionEvent, SessionStatus, TokenStore};

/// Reason recorded when a login fails without a server message
const LOGIN_FALLBACK: &str = "Login failed";

/// Reason recorded when a signup fails without a server message
const SIGNUP_FALLBACK: &str = "Signup failed";

/// The remote credential endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token
    async fn login(&self, email: &str, password: &str) -> Result<String, AuthError>;

    /// Register; the response carries both the user and its token
    async fn signup(&self, profile: &SignupProfile) -> Result<SignupResponse, AuthError>;

    /// Confirm a token and return its user
    async fn validate_token(&self, token: &str) -> Result<User, AuthError>;
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        ApiClient::login(self, email, password)
            .await
            .map_err(AuthError::from_credential_failure)
    }

    async fn signup(&self, profile: &SignupProfile) -> Result<SignupResponse, AuthError> {
        ApiClient::signup(self, profile)
            .await
            .map_err(AuthError::from_credential_failure)
    }

    async fn validate_token(&self, token: &str) -> Result<User, AuthError> {
        ApiClient::validate_token(self, token)
            .await
            .map_err(AuthError::from_validation_failure)
    }
}

/// Committed state. `status` is never `Validating`; that is derived from `in_flight`.
struct State {
    token: Option<String>,
    status: SessionStatus,
    in_flight: bool,
}

pub struct SessionStore<A, T> {
    api: A,
    tokens: T,
    state: Mutex<State>,
    tx: watch::Sender<Session>,
}

impl<A: AuthApi, T: TokenStore> SessionStore<A, T> {
    pub fn new(api: A, tokens: T) -> Self {
        let (tx, _rx) = watch::channel(Session::new());
        Self {
            api,
            tokens,
            state: Mutex::new(State {
                token: None,
                status: SessionStatus::Idle,
                in_flight: false,
            }),
            tx,
        }
    }

    /// Receive a snapshot after every settled transition
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Current snapshot
    pub fn session(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.tx.borrow().status.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tx.borrow().token.clone()
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// One-shot check of the persisted token at startup. Never fails: any
    /// problem degrades to `Anonymous` with the persisted token removed.
    pub async fn validate_startup(&self) {
        let persisted = match self.tokens.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Could not read persisted token, starting anonymous");
                self.clear_persisted();
                None
            }
        };

        let Some(token) = persisted else {
            debug!("No persisted token");
            self.commit(SessionEvent::StartupAnonymous, |state| {
                state.token = None;
                state.status = SessionStatus::Anonymous;
            });
            return;
        };

        self.begin(false);
        match self.api.validate_token(&token).await {
            Ok(user) => {
                info!(user_id = %user.id, username = %user.username, "Session restored");
                self.commit(SessionEvent::Restored, |state| {
                    state.token = Some(token);
                    state.status = SessionStatus::Authenticated(user);
                });
            }
            Err(e) => {
                info!(error = %e, "Persisted token rejected, clearing session");
                self.commit(SessionEvent::StartupAnonymous, |state| {
                    self.clear_persisted();
                    state.token = None;
                    state.status = SessionStatus::Anonymous;
                });
            }
        }
    }

    /// Log in, then confirm the new token to obtain the user.
    ///
    /// On failure the session's token and user are left exactly as they were and
    /// the status records the reason, unless a user was already signed in.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        self.begin(true);

        let result = async {
            let token = self.api.login(email, password).await?;
            let user = self.api.validate_token(&token).await?;
            Ok::<_, AuthError>((user, token))
        }
        .await;

        self.finish(result, SessionEvent::LoggedIn, LOGIN_FALLBACK)
    }

    /// Register a new account. The server returns the user with the token, so
    /// no separate validation round trip is made.
    pub async fn signup(&self, profile: &SignupProfile) -> Result<User, AuthError> {
        self.begin(true);

        let result = self
            .api
            .signup(profile)
            .await
            .map(|resp| (resp.user, resp.token));

        self.finish(result, SessionEvent::SignedUp, SIGNUP_FALLBACK)
    }

    /// Drop the session. Cannot fail; storage errors are logged.
    pub fn logout(&self) {
        info!("Logging out");
        self.commit(SessionEvent::LoggedOut, |state| {
            self.clear_persisted();
            state.token = None;
            state.status = SessionStatus::Anonymous;
        });
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Mark a request in flight. A credential attempt also drops any previous
    /// failure reason.
    fn begin(&self, clear_failure: bool) {
        let mut state = self.lock();
        state.in_flight = true;
        if clear_failure && matches!(state.status, SessionStatus::Failed(_)) {
            state.status = SessionStatus::Anonymous;
        }
        self.publish(&state, SessionEvent::ValidationStarted);
    }

    /// Apply the outcome of a login or signup.
    fn finish(
        &self,
        result: Result<(User, String), AuthError>,
        event: SessionEvent,
        fallback: &str,
    ) -> Result<User, AuthError> {
        let outcome = result.and_then(|(user, token)| {
            self.try_commit(event, |state| {
                // Persist first: a failed write must leave the state untouched.
                self.tokens
                    .save(&token)
                    .map_err(|e| AuthError::Storage(e.to_string()))?;
                state.token = Some(token);
                state.status = SessionStatus::Authenticated(user.clone());
                Ok(user)
            })
        });

        match outcome {
            Ok(user) => {
                info!(user_id = %user.id, username = %user.username, ?event, "Authenticated");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, ?event, "Credential attempt failed");
                let reason = e.reason_or(fallback);
                self.commit(SessionEvent::AttemptFailed, |state| {
                    if !state.status.is_authenticated() {
                        state.status = SessionStatus::Failed(reason);
                    }
                });
                Err(e)
            }
        }
    }

    /// Apply a transition to the committed state and publish it.
    fn commit(&self, event: SessionEvent, apply: impl FnOnce(&mut State)) {
        let mut state = self.lock();
        apply(&mut state);
        state.in_flight = false;
        self.publish(&state, event);
    }

    /// Like `commit`, but `apply` may refuse. A refused transition publishes
    /// nothing and must not have touched the state.
    fn try_commit<R>(
        &self,
        event: SessionEvent,
        apply: impl FnOnce(&mut State) -> Result<R, AuthError>,
    ) -> Result<R, AuthError> {
        let mut state = self.lock();
        let value = apply(&mut state)?;
        state.in_flight = false;
        self.publish(&state, event);
        Ok(value)
    }

    fn publish(&self, state: &State, event: SessionEvent) {
        let status = if state.in_flight {
            SessionStatus::Validating
        } else {
            state.status.clone()
        };
        let token = state.token.clone();

        self.tx.send_modify(|session| {
            session.token = token;
            session.status = status;
            session.event = event;
            session.revision += 1;
        });
    }

    fn clear_persisted(&self) {
        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to clear persisted token");
        }
    }
}
