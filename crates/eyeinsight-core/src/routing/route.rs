use std::fmt;

/// Who may open a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Login and signup surfaces
    Auth,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Help,
    Login,
    Signup,
    Dashboard,
    Upload,
    /// Prediction result for one scan
    Result(String),
    Reports,
    NotFound,
}

impl Route {
    /// Where a successful login or signup lands
    pub const LANDING: Route = Route::Dashboard;

    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["help"] => Route::Help,
            ["login"] => Route::Login,
            ["signup"] => Route::Signup,
            ["dashboard"] => Route::Dashboard,
            ["upload"] => Route::Upload,
            ["result", id] => Route::Result(id.to_string()),
            ["reports"] => Route::Reports,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Help => "/help".to_string(),
            Route::Login => "/login".to_string(),
            Route::Signup => "/signup".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Upload => "/upload".to_string(),
            Route::Result(id) => format!("/result/{}", id),
            Route::Reports => "/reports".to_string(),
            Route::NotFound => "/404".to_string(),
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Route::Home | Route::Help | Route::NotFound => Access::Public,
            Route::Login | Route::Signup => Access::Auth,
            Route::Dashboard | Route::Upload | Route::Result(_) | Route::Reports => Access::Protected,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.access() == Access::Protected
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/login"), Route::Login);
        assert_eq!(Route::parse("/reports/"), Route::Reports);
        assert_eq!(Route::parse("/result/42?tab=details"), Route::Result("42".to_string()));
        assert_eq!(Route::parse("/result"), Route::NotFound);
        assert_eq!(Route::parse("/admin/users"), Route::NotFound);
    }

    #[test]
    fn test_paths_parse_back() {
        for route in [
            Route::Home,
            Route::Help,
            Route::Login,
            Route::Signup,
            Route::Dashboard,
            Route::Upload,
            Route::Result("abc".to_string()),
            Route::Reports,
        ] {
            assert_eq!(Route::parse(&route.path()), route);
        }
    }

    #[test]
    fn test_access() {
        assert_eq!(Route::Help.access(), Access::Public);
        assert_eq!(Route::Signup.access(), Access::Auth);
        assert!(Route::Result("1".to_string()).is_protected());
        assert!(!Route::NotFound.is_protected());
    }
}
