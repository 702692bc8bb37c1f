//! Password reset: opening the emailed link and choosing a new password.

use super::{Feedback, LinkError, LinkParams, Redirect};
use crate::backend::{Backend, BackendError};
use crate::session::Route;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 6;

const INVALID_LINK_REDIRECT_SECS: u64 = 3;
const NO_SESSION_REDIRECT_SECS: u64 = 5;
const EXPIRED_SESSION_REDIRECT_SECS: u64 = 3;
const UPDATED_REDIRECT_SECS: u64 = 2;

/// Tokens carried by a password-reset link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryTokens {
    /// Short-lived access token.
    pub access_token: String,
    /// Refresh token for the recovery session.
    pub refresh_token: String,
}

/// Reads recovery tokens from a reset link, fragment first.
///
/// # Errors
///
/// Returns [`LinkError::MissingResetTokens`] unless both tokens are present
/// and `type` is `recovery`.
pub fn recovery_tokens(link: &LinkParams) -> Result<RecoveryTokens, LinkError> {
    match (
        link.param("access_token"),
        link.param("refresh_token"),
        link.param("type"),
    ) {
        (Some(access), Some(refresh), Some("recovery"))
            if !access.is_empty() && !refresh.is_empty() =>
        {
            Ok(RecoveryTokens {
                access_token: access.to_string(),
                refresh_token: refresh.to_string(),
            })
        }
        _ => Err(LinkError::MissingResetTokens),
    }
}

/// Local checks on a new password, run before any remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordError {
    /// Shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("Password must be at least 6 characters long.")]
    TooShort,
    /// Password and confirmation differ.
    #[error("Passwords do not match.")]
    Mismatch,
}

/// Validates a new password against its confirmation.
///
/// # Errors
///
/// Returns the first failing [`PasswordError`]; length is checked first.
pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if password != confirmation {
        return Err(PasswordError::Mismatch);
    }
    Ok(())
}

/// Prepares the reset screen.
///
/// With recovery tokens in the link, a recovery session is established
/// from them. Without tokens, an existing session is accepted as-is.
/// Returns `None` when the form is ready to use, or an error with a
/// delayed return to the login screen.
pub async fn open_reset_link<B: Backend>(backend: &B, link: Option<&LinkParams>) -> Option<Feedback> {
    if let Some(tokens) = link.and_then(|l| recovery_tokens(l).ok()) {
        return match backend
            .set_session(&tokens.access_token, &tokens.refresh_token)
            .await
        {
            Ok(_) => {
                tracing::info!("recovery session established");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "recovery link rejected");
                Some(
                    Feedback::error(
                        "Invalid or expired reset link. Please request a new password reset.",
                    )
                    .then(Redirect::after_secs(Route::Login, INVALID_LINK_REDIRECT_SECS)),
                )
            }
        };
    }

    if backend.session().is_some() {
        return None;
    }
    Some(
        Feedback::error(
            "No valid reset session found. Please request a new password reset and open the emailed link.",
        )
        .then(Redirect::after_secs(Route::Login, NO_SESSION_REDIRECT_SECS)),
    )
}

/// Maps a password-update error message to what the user is told.
#[must_use]
pub fn map_update_error(message: &str) -> Feedback {
    let lower = message.to_lowercase();
    if lower.contains("weak password") {
        Feedback::error("Password is too weak. Please choose a stronger password.")
    } else if lower.contains("session") {
        session_expired()
    } else {
        Feedback::error(message)
    }
}

fn session_expired() -> Feedback {
    Feedback::error("Your session has expired. Please request a new password reset.")
        .then(Redirect::after_secs(Route::Login, EXPIRED_SESSION_REDIRECT_SECS))
}

/// Validates and submits a new password.
pub async fn submit_new_password<B: Backend>(
    backend: &B,
    password: &str,
    confirmation: &str,
) -> Feedback {
    if let Err(e) = validate_new_password(password, confirmation) {
        return Feedback::error(e.to_string());
    }

    match backend.update_password(password).await {
        Ok(()) => Feedback::success("Password updated successfully!")
            .then(Redirect::after_secs(Route::Home, UPDATED_REDIRECT_SECS)),
        Err(BackendError::NoSession) => {
            tracing::warn!("password update without a session");
            session_expired()
        }
        Err(e) => {
            tracing::warn!(error = %e, "password update failed");
            map_update_error(&e.to_string())
        }
    }
}
