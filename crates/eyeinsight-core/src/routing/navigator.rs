//! Navigation effects of session transitions.
//!
//! The session store only publishes snapshots; this is where a fresh login
//! becomes "go to the dashboard" and a logout becomes "go to login".

use tracing::debug;

use crate::auth::{Session, SessionEvent, SessionStatus};

use super::guard::{resolve, GuardDecision};
use super::route::Route;

#[derive(Debug, Clone)]
pub struct Navigator {
    history: Vec<Route>,
    seen_revision: u64,
}

impl Navigator {
    pub fn new(initial: Route) -> Self {
        Self {
            history: vec![initial],
            seen_revision: 0,
        }
    }

    pub fn current(&self) -> &Route {
        // history is never empty
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[Route] {
        &self.history
    }

    /// Push a new entry
    pub fn push(&mut self, route: Route) {
        debug!(to = %route, "Navigate");
        self.history.push(route);
    }

    /// Swap out the current entry
    pub fn replace(&mut self, route: Route) {
        debug!(to = %route, "Navigate (replace)");
        let last = self.history.len() - 1;
        self.history[last] = route;
    }

    /// Go back one entry. Returns `None` at the start of history.
    pub fn back(&mut self) -> Option<&Route> {
        if self.history.len() > 1 {
            self.history.pop();
            Some(self.current())
        } else {
            None
        }
    }

    /// Open `route` and apply whatever the guard decides.
    pub fn open(&mut self, route: Route, status: &SessionStatus) -> GuardDecision {
        self.push(route);
        self.refresh(status)
    }

    /// Re-run the guard on the current entry, following any redirect.
    /// Call this when the session settles after a `Loading` decision.
    pub fn refresh(&mut self, status: &SessionStatus) -> GuardDecision {
        let decision = resolve(self.current(), status);
        if let GuardDecision::Redirect { to, replace } = &decision {
            if *replace {
                self.replace(to.clone());
            } else {
                self.push(to.clone());
            }
        }
        decision
    }

    /// React to a session snapshot. Returns the route navigated to, if any.
    /// Each revision is handled at most once.
    pub fn on_session(&mut self, session: &Session) -> Option<Route> {
        if session.revision <= self.seen_revision {
            return None;
        }
        self.seen_revision = session.revision;

        let target = match session.event {
            SessionEvent::LoggedIn | SessionEvent::SignedUp if session.is_authenticated() => {
                Route::LANDING
            }
            SessionEvent::LoggedOut => Route::Login,
            _ => return None,
        };
        self.push(target.clone());
        Some(target)
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn session(status: SessionStatus, event: SessionEvent, revision: u64) -> Session {
        let token = status.is_authenticated().then(|| "abc123".to_string());
        Session {
            token,
            status,
            event,
            revision,
        }
    }

    fn alice() -> SessionStatus {
        SessionStatus::Authenticated(User {
            id: "1".to_string(),
            username: "alice".to_string(),
            email: "a@x.com".to_string(),
            role: "user".to_string(),
        })
    }

    #[test]
    fn test_redirect_replaces_protected_entry() {
        let mut nav = Navigator::new(Route::Home);
        let decision = nav.open(Route::Reports, &SessionStatus::Anonymous);

        assert!(matches!(decision, GuardDecision::Redirect { replace: true, .. }));
        assert_eq!(nav.current(), &Route::Login);
        assert_eq!(nav.history(), &[Route::Home, Route::Login]);

        // Back goes to where the user came from, not into the protected route
        assert_eq!(nav.back(), Some(&Route::Home));
        assert_eq!(nav.back(), None);
    }

    #[test]
    fn test_loading_then_settle() {
        let mut nav = Navigator::new(Route::Home);
        assert_eq!(nav.open(Route::Upload, &SessionStatus::Validating), GuardDecision::Loading);
        assert_eq!(nav.current(), &Route::Upload);

        assert_eq!(nav.refresh(&alice()), GuardDecision::Render);
        assert_eq!(nav.current(), &Route::Upload);
    }

    #[test]
    fn test_signed_in_visit_to_login_lands_on_dashboard() {
        let mut nav = Navigator::new(Route::Home);
        assert_eq!(nav.open(Route::Login, &SessionStatus::Idle), GuardDecision::Loading);
        assert_eq!(nav.current(), &Route::Login);

        let decision = nav.refresh(&alice());
        assert!(matches!(decision, GuardDecision::Redirect { replace: true, .. }));
        assert_eq!(nav.history(), &[Route::Home, Route::Dashboard]);

        nav.open(Route::Signup, &alice());
        assert_eq!(nav.history(), &[Route::Home, Route::Dashboard, Route::Dashboard]);
    }

    #[test]
    fn test_login_and_logout_effects() {
        let mut nav = Navigator::new(Route::Login);

        let landed = nav.on_session(&session(alice(), SessionEvent::LoggedIn, 3));
        assert_eq!(landed, Some(Route::Dashboard));
        assert_eq!(nav.current(), &Route::Dashboard);

        // Same revision again is ignored
        assert_eq!(nav.on_session(&session(alice(), SessionEvent::LoggedIn, 3)), None);

        let out = nav.on_session(&session(SessionStatus::Anonymous, SessionEvent::LoggedOut, 4));
        assert_eq!(out, Some(Route::Login));
    }

    #[test]
    fn test_restore_and_failures_do_not_navigate() {
        let mut nav = Navigator::new(Route::Reports);
        assert_eq!(nav.on_session(&session(alice(), SessionEvent::Restored, 2)), None);
        assert_eq!(
            nav.on_session(&session(
                SessionStatus::Failed("Invalid credentials".into()),
                SessionEvent::AttemptFailed,
                3
            )),
            None
        );
        assert_eq!(
            nav.on_session(&session(SessionStatus::Validating, SessionEvent::ValidationStarted, 4)),
            None
        );
        assert_eq!(nav.current(), &Route::Reports);
    }
}
