//! Portal routes and the navigation capability used by the error pipeline.

use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
    Dashboard,
    ProfileEdit,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Home,
        Route::Login,
        Route::Register,
        Route::ForgotPassword,
        Route::ResetPassword,
        Route::Dashboard,
        Route::ProfileEdit,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::ForgotPassword => "/forgot-password",
            Route::ResetPassword => "/reset-password",
            Route::Dashboard => "/dashboard",
            Route::ProfileEdit => "/profile/edit",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }

    pub fn requires_auth(self) -> bool {
        matches!(self, Route::Dashboard | Route::ProfileEdit)
    }

    /// Where a navigation to `self` actually lands.
    pub fn guard(self, authenticated: bool) -> Route {
        if self.requires_auth() && !authenticated {
            Route::Login
        } else {
            self
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
    fn current_path(&self) -> String;
}

/// Navigator that records every visited route.
#[derive(Debug)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new(start: Route) -> Self {
        Self {
            visited: Mutex::new(vec![start]),
        }
    }

    pub fn visited(&self) -> Vec<Route> {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn current(&self) -> Route {
        self.visited()
            .last()
            .copied()
            .unwrap_or(Route::Home)
    }
}

impl Default for RecordingNavigator {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!("Navigating to {}", route);
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(route);
    }

    fn current_path(&self) -> String {
        self.current().path().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_routes_redirect_guests_to_login() {
        assert_eq!(Route::Dashboard.guard(false), Route::Login);
        assert_eq!(Route::ProfileEdit.guard(false), Route::Login);
        assert_eq!(Route::Dashboard.guard(true), Route::Dashboard);
        assert_eq!(Route::Register.guard(false), Route::Register);
    }

    #[test]
    fn paths_round_trip() {
        for route in Route::ALL {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/nowhere"), None);
    }

    #[test]
    fn recording_navigator_tracks_current_route() {
        let navigator = RecordingNavigator::new(Route::Dashboard);
        navigator.navigate(Route::Login);

        assert_eq!(navigator.current_path(), "/login");
        assert_eq!(navigator.visited(), vec![Route::Dashboard, Route::Login]);
    }
}
