//! Sign-up email confirmation.

use super::{Feedback, LinkError, LinkParams, Redirect};
use crate::backend::Backend;
use crate::session::Route;

/// Seconds on the success screen before moving to the dashboard.
pub const VERIFIED_REDIRECT_SECS: u64 = 3;

/// Extracts the token hash from a verification link.
///
/// The link must carry a non-empty `token` and `type=signup` in its query.
///
/// # Errors
///
/// Returns [`LinkError::InvalidVerificationLink`] otherwise.
pub fn verification_token(link: &LinkParams) -> Result<&str, LinkError> {
    let token = link.query("token").filter(|t| !t.is_empty());
    match (token, link.query("type")) {
        (Some(token), Some("signup")) => Ok(token),
        _ => Err(LinkError::InvalidVerificationLink),
    }
}

/// Confirms the account behind a verification link.
pub async fn verify_email<B: Backend>(backend: &B, link: &LinkParams) -> Feedback {
    let token = match verification_token(link) {
        Ok(token) => token,
        Err(e) => return Feedback::error(e.to_string()),
    };

    match backend.verify_email(token).await {
        Ok(_) => {
            tracing::info!("email verified");
            Feedback::success("Email verified! Redirecting to your dashboard...")
                .then(Redirect::after_secs(Route::Dashboard, VERIFIED_REDIRECT_SECS))
        }
        Err(e) => {
            tracing::warn!(error = %e, "email verification failed");
            Feedback::error(e.to_string())
        }
    }
}
