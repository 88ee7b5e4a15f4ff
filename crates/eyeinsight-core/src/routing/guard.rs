use crate::auth::SessionStatus;

use super::route::{Access, Route};

/// What a view should do for a route given the current session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Show the loading placeholder and nothing else
    Loading,
    /// Show the requested content
    Render,
    /// Navigate elsewhere; `replace` swaps out the current history entry
    Redirect { to: Route, replace: bool },
}

/// Gate for protected content. A pure function of the session status.
pub fn guard(status: &SessionStatus) -> GuardDecision {
    match status {
        status if status.is_pending() => GuardDecision::Loading,
        SessionStatus::Authenticated(_) => GuardDecision::Render,
        _ => GuardDecision::Redirect {
            to: Route::Login,
            replace: true,
        },
    }
}

/// Gate for the login and signup pages: a signed-in visitor is sent on to
/// the landing page instead of seeing the form again.
pub fn auth_gate(status: &SessionStatus) -> GuardDecision {
    match status {
        status if status.is_pending() => GuardDecision::Loading,
        SessionStatus::Authenticated(_) => GuardDecision::Redirect {
            to: Route::LANDING,
            replace: true,
        },
        _ => GuardDecision::Render,
    }
}

/// Decide for any route by its access level.
pub fn resolve(route: &Route, status: &SessionStatus) -> GuardDecision {
    match route.access() {
        Access::Public => GuardDecision::Render,
        Access::Auth => auth_gate(status),
        Access::Protected => guard(status),
    }
}
