//! Screens, navigation history, and the session-driven redirect rules.
//!
//! Two rules move the user between screens when the session changes:
//!
//! - [`session_redirect`]: a signed-in user sitting on a pre-authentication
//!   screen (`/`, `/login`, `/signup`) is sent to `/dashboard`.
//! - [`protected_redirect`]: an anonymous user on a protected screen is sent
//!   to `/login`.
//!
//! Both replace the current history entry rather than pushing, so "back"
//! never returns to the screen that was redirected away from.

use std::fmt;

/// A top-level screen, addressed by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`, renders the dashboard.
    Home,
    /// `/dashboard`.
    Dashboard,
    /// `/about`.
    About,
    /// `/login`.
    Login,
    /// `/signup`.
    Signup,
    /// `/verify-email`.
    VerifyEmail,
    /// `/reset-password`.
    ResetPassword,
    /// Any other path.
    NotFound(String),
}

impl Route {
    /// Parses a path, ignoring any query string, fragment, or trailing slash.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Self::Home,
            "/dashboard" => Self::Dashboard,
            "/about" => Self::About,
            "/login" => Self::Login,
            "/signup" => Self::Signup,
            "/verify-email" => Self::VerifyEmail,
            "/reset-password" => Self::ResetPassword,
            _ => Self::NotFound(path.to_string()),
        }
    }

    /// Canonical path of this route.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Home => "/",
            Self::Dashboard => "/dashboard",
            Self::About => "/about",
            Self::Login => "/login",
            Self::Signup => "/signup",
            Self::VerifyEmail => "/verify-email",
            Self::ResetPassword => "/reset-password",
            Self::NotFound(path) => path,
        }
    }

    /// Screens a signed-in user is moved away from.
    #[must_use]
    pub const fn is_pre_auth(&self) -> bool {
        matches!(self, Self::Home | Self::Login | Self::Signup)
    }

    /// Screens that require a session.
    #[must_use]
    pub const fn is_protected(&self) -> bool {
        matches!(self, Self::Dashboard)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Something that can report and change the current screen.
pub trait Navigator {
    /// The screen currently shown.
    fn current(&self) -> &Route;

    /// Opens `route` as a new history entry.
    fn push(&mut self, route: Route);

    /// Swaps the current history entry for `route`.
    fn replace(&mut self, route: Route);
}

/// Browser-style navigation history.
///
/// Never empty: it starts with one entry and `back` keeps the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<Route>,
}

impl History {
    /// History with `start` as its only entry.
    #[must_use]
    pub fn new(start: Route) -> Self {
        Self {
            entries: vec![start],
        }
    }

    /// Goes back one entry. Returns `false` when already at the first.
    pub fn back(&mut self) -> bool {
        if self.entries.len() > 1 {
            self.entries.pop();
            true
        } else {
            false
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[Route] {
        &self.entries
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(Route::Home)
    }
}

impl Navigator for History {
    fn current(&self) -> &Route {
        static HOME: Route = Route::Home;
        self.entries.last().unwrap_or(&HOME)
    }

    fn push(&mut self, route: Route) {
        tracing::debug!(to = %route, "navigate");
        self.entries.push(route);
    }

    fn replace(&mut self, route: Route) {
        tracing::debug!(from = %self.current(), to = %route, "replace");
        if let Some(last) = self.entries.last_mut() {
            *last = route;
        }
    }
}

/// Where a session change should send the user, if anywhere.
///
/// Only a present session on a pre-authentication screen redirects, to
/// [`Route::Dashboard`]. Everything else stays put.
#[must_use]
pub fn session_redirect(has_session: bool, current: &Route) -> Option<Route> {
    (has_session && current.is_pre_auth()).then_some(Route::Dashboard)
}

/// Where the protected-page guard sends the user, if anywhere.
#[must_use]
pub fn protected_redirect(has_session: bool, current: &Route) -> Option<Route> {
    (!has_session && current.is_protected()).then_some(Route::Login)
}

/// Applies both redirect rules to `nav`, replacing the current entry.
///
/// Returns the route redirected to, if any.
pub fn apply_session_policy(nav: &mut impl Navigator, has_session: bool) -> Option<Route> {
    let target = session_redirect(has_session, nav.current())
        .or_else(|| protected_redirect(has_session, nav.current()))?;
    nav.replace(target.clone());
    Some(target)
}
