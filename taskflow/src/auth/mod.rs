//! Account flows: sign in/up/out, email verification, password reset.
//!
//! Each flow talks to a [`Backend`] and reduces the result to [`Feedback`]:
//! a message for the user plus an optional [`Redirect`]. Redirects are
//! plain values; the app loop schedules them, so the flows stay testable
//! without timers.

pub mod forgot;
pub mod link;
pub mod reset;
pub mod verify;

use std::time::Duration;

use taskflow_proto::auth::Credentials;

pub use link::{LinkError, LinkParams};

use crate::backend::{Backend, SignUpOutcome};
use crate::session::Route;

/// How a [`Feedback`] message should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Neutral information.
    Info,
    /// The action succeeded.
    Success,
    /// The action failed.
    Error,
}

/// Navigation to perform once `after` has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Destination.
    pub to: Route,
    /// Delay before navigating; zero means right away.
    pub after: Duration,
}

impl Redirect {
    /// Navigates immediately.
    #[must_use]
    pub const fn now(to: Route) -> Self {
        Self {
            to,
            after: Duration::ZERO,
        }
    }

    /// Navigates after `secs` seconds.
    #[must_use]
    pub const fn after_secs(to: Route, secs: u64) -> Self {
        Self {
            to,
            after: Duration::from_secs(secs),
        }
    }
}

/// Result of an account flow, ready to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    /// Presentation.
    pub tone: Tone,
    /// Text for the user.
    pub message: String,
    /// Follow-up navigation.
    pub redirect: Option<Redirect>,
}

impl Feedback {
    /// An informational message.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            tone: Tone::Info,
            message: message.into(),
            redirect: None,
        }
    }

    /// A success message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            tone: Tone::Success,
            message: message.into(),
            redirect: None,
        }
    }

    /// An error message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            tone: Tone::Error,
            message: message.into(),
            redirect: None,
        }
    }

    /// Attaches a follow-up navigation.
    #[must_use]
    pub fn then(mut self, redirect: Redirect) -> Self {
        self.redirect = Some(redirect);
        self
    }

    /// Whether this reports a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.tone == Tone::Error
    }
}

/// Signs in with email and password.
///
/// The session-change stream triggers the dashboard redirect as well; the
/// explicit redirect here covers a sign-in started from a screen the
/// session rule does not handle.
pub async fn sign_in<B: Backend>(backend: &B, email: &str, password: &str) -> Feedback {
    let credentials = Credentials {
        email: email.trim().to_string(),
        password: password.to_string(),
    };
    match backend.sign_in(&credentials).await {
        Ok(_) => Feedback::success("Logged in successfully!").then(Redirect::now(Route::Dashboard)),
        Err(e) => {
            tracing::warn!(error = %e, "sign in failed");
            Feedback::error(e.to_string())
        }
    }
}

/// Creates an account.
///
/// With email confirmation enabled the user is sent to the login screen
/// and told to confirm first.
pub async fn sign_up<B: Backend>(backend: &B, email: &str, password: &str) -> Feedback {
    let credentials = Credentials {
        email: email.trim().to_string(),
        password: password.to_string(),
    };
    match backend.sign_up(&credentials).await {
        Ok(SignUpOutcome::SignedIn(_)) => {
            Feedback::success("Account created and signed in!").then(Redirect::now(Route::Dashboard))
        }
        Ok(SignUpOutcome::ConfirmationSent) => Feedback::info(
            "Account created! Please check your email to confirm your account, then you can sign in.",
        )
        .then(Redirect::now(Route::Login)),
        Err(e) => {
            tracing::warn!(error = %e, "sign up failed");
            Feedback::error(e.to_string())
        }
    }
}

/// Signs out and returns to the login screen.
pub async fn sign_out<B: Backend>(backend: &B) -> Feedback {
    if let Err(e) = backend.sign_out().await {
        tracing::warn!(error = %e, "sign out failed");
    }
    Feedback::info("Signed out").then(Redirect::now(Route::Login))
}
