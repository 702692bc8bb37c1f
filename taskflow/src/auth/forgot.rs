//! "Forgot password" request.

use std::sync::LazyLock;

use regex::Regex;

use super::Feedback;
use crate::backend::Backend;
use crate::session::Route;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";
const INVALID_EMAIL: &str = "Please enter a valid email address.";

#[allow(clippy::expect_used)]
fn email_regex() -> &'static Regex {
    static RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"));
    &RE
}

/// Loose email shape check: `local@domain.tld` without whitespace.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Where the emailed reset link should land, given the app's public URL.
#[must_use]
pub fn reset_redirect_url(site_url: &str) -> String {
    format!(
        "{}{}",
        site_url.trim_end_matches('/'),
        Route::ResetPassword.path()
    )
}

/// Maps a reset-request error message to what the user is told.
#[must_use]
pub fn map_request_error(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("rate limit") {
        "Too many requests. Please wait a moment before trying again.".to_string()
    } else if lower.contains("not found") {
        "No account found with this email address.".to_string()
    } else if lower.contains("invalid email") {
        INVALID_EMAIL.to_string()
    } else {
        message.to_string()
    }
}

/// Sends a password-reset email to `email`.
pub async fn request_reset<B: Backend>(backend: &B, email: &str, site_url: &str) -> Feedback {
    let email = email.trim();
    if !is_valid_email(email) {
        return Feedback::error(INVALID_EMAIL);
    }

    let redirect_to = reset_redirect_url(site_url);
    match backend.request_password_reset(email, &redirect_to).await {
        Ok(()) => {
            tracing::info!(%redirect_to, "password reset email requested");
            Feedback::success("Password reset email sent! Check your inbox.")
        }
        Err(e) => {
            tracing::warn!(error = %e, "password reset request failed");
            Feedback::error(map_request_error(&e.to_string()))
        }
    }
}
