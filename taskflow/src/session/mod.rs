//! Client-side session state.
//!
//! [`AuthState`] follows the backend's session-change stream and reduces it
//! to two phases. The app re-runs the redirect rules in [`route`] after
//! every change; they are idempotent, so a token refresh while already on
//! the dashboard moves nothing.

pub mod route;

pub use route::{History, Navigator, Route, apply_session_policy};

use taskflow_proto::auth::{Session, UserId};

use crate::backend::SessionChange;

/// Whether a user is signed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    /// No session.
    #[default]
    Anonymous,
    /// A session is present.
    Authenticated,
}

/// Phase change caused by one session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Anonymous to authenticated.
    SignedIn,
    /// Authenticated to anonymous.
    SignedOut,
    /// Same phase as before (token refresh, user update, repeated sign-out).
    Unchanged,
}

/// The session as the UI knows it.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    session: Option<Session>,
}

impl AuthState {
    /// Starts anonymous.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        if self.session.is_some() {
            Phase::Authenticated
        } else {
            Phase::Anonymous
        }
    }

    /// Whether a session is present.
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// The current session.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Signed-in user's id.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.session.as_ref().map(Session::user_id)
    }

    /// Signed-in user's email, if the account has one.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.session.as_ref()?.user.email.as_deref()
    }

    /// Adopts the session carried by `change`.
    pub fn apply(&mut self, change: &SessionChange) -> Transition {
        let before = self.phase();
        self.session.clone_from(&change.session);
        let transition = match (before, self.phase()) {
            (Phase::Anonymous, Phase::Authenticated) => Transition::SignedIn,
            (Phase::Authenticated, Phase::Anonymous) => Transition::SignedOut,
            _ => Transition::Unchanged,
        };
        tracing::debug!(event = ?change.event, ?transition, "auth state updated");
        transition
    }
}
