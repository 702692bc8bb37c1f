//! Integration tests for the account flows.
//!
//! Runs sign up, email verification, sign in, forgotten password and
//! password reset end to end against the in-memory backend, including the
//! emailed links.
//!
//! These tests validate:
//! - Sign up with and without email confirmation
//! - Verification links confirm the account and redirect after a delay
//! - Reset emails link to `<site>/reset-password`
//! - A reset link establishes a recovery session and accepts a new password
//! - Bad links and missing sessions send the user back to login

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use taskflow::auth::{self, LinkParams, Tone, forgot, reset, verify};
use taskflow::backend::Backend;
use taskflow::backend::memory::MemoryBackend;
use taskflow::session::Route;
use taskflow_proto::auth::{AuthEvent, Credentials};

const SITE: &str = "http://localhost:5173";
const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "secret1";

fn reset_link(access: &str, refresh: &str) -> LinkParams {
    LinkParams::parse(&format!(
        "{SITE}/reset-password#access_token={access}&refresh_token={refresh}&type=recovery"
    ))
    .unwrap()
}

#[tokio::test]
async fn sign_up_with_confirmation_then_verify() {
    let backend = MemoryBackend::new().with_email_confirmation();

    let feedback = auth::sign_up(&backend, EMAIL, PASSWORD).await;
    assert_eq!(feedback.tone, Tone::Info);
    assert_eq!(
        feedback.message,
        "Account created! Please check your email to confirm your account, then you can sign in."
    );
    assert_eq!(feedback.redirect.unwrap().to, Route::Login);
    assert!(backend.session().is_none());

    // Signing in before confirming fails.
    let feedback = auth::sign_in(&backend, EMAIL, PASSWORD).await;
    assert!(feedback.is_error());
    assert!(feedback.redirect.is_none());

    let token = backend.confirmation_token(EMAIL).unwrap();
    let link = LinkParams::parse(&format!("{SITE}/verify-email?token={token}&type=signup")).unwrap();
    assert_eq!(link.route(), &Route::VerifyEmail);

    let feedback = verify::verify_email(&backend, &link).await;
    assert_eq!(feedback.tone, Tone::Success);
    let redirect = feedback.redirect.unwrap();
    assert_eq!(redirect.to, Route::Dashboard);
    assert_eq!(redirect.after, Duration::from_secs(verify::VERIFIED_REDIRECT_SECS));
    assert!(backend.session().is_some());

    // The token is single-use.
    let again = verify::verify_email(&backend, &link).await;
    assert!(again.is_error());
}

#[tokio::test]
async fn sign_up_without_confirmation_signs_in() {
    let backend = MemoryBackend::new();
    let mut rx = backend.subscribe();

    let feedback = auth::sign_up(&backend, EMAIL, PASSWORD).await;
    assert_eq!(feedback.tone, Tone::Success);
    assert_eq!(feedback.message, "Account created and signed in!");
    assert_eq!(feedback.redirect.unwrap().to, Route::Dashboard);
    assert_eq!(rx.recv().await.unwrap().event, AuthEvent::SignedIn);

    let duplicate = auth::sign_up(&backend, EMAIL, PASSWORD).await;
    assert_eq!(duplicate.message, "User already registered");
}

#[tokio::test]
async fn verification_link_without_signup_type_is_rejected() {
    let backend = MemoryBackend::new();
    let link = LinkParams::parse(&format!("{SITE}/verify-email?token=abc&type=recovery")).unwrap();
    let feedback = verify::verify_email(&backend, &link).await;
    assert_eq!(feedback.message, "Invalid verification link");
    assert!(feedback.redirect.is_none());
}

#[tokio::test]
async fn forgot_password_then_reset() {
    let backend = MemoryBackend::new();
    backend.add_account(EMAIL, PASSWORD);
    let mut rx = backend.subscribe();

    // Invalid addresses never reach the backend.
    let feedback = forgot::request_reset(&backend, "not-an-email", SITE).await;
    assert!(feedback.is_error());
    assert!(backend.sent_resets().is_empty());

    let feedback = forgot::request_reset(&backend, EMAIL, SITE).await;
    assert_eq!(feedback.message, "Password reset email sent! Check your inbox.");
    let sent = backend.sent_resets();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].redirect_to, format!("{SITE}/reset-password"));

    // Open the emailed link.
    let (access, refresh) = backend.recovery_tokens(EMAIL).unwrap();
    let link = reset_link(&access, &refresh);
    assert!(reset::open_reset_link(&backend, Some(&link)).await.is_none());
    assert_eq!(rx.recv().await.unwrap().event, AuthEvent::PasswordRecovery);

    // Local checks first.
    let feedback = reset::submit_new_password(&backend, "short", "short").await;
    assert_eq!(feedback.message, "Password must be at least 6 characters long.");
    let feedback = reset::submit_new_password(&backend, "newsecret", "different").await;
    assert_eq!(feedback.message, "Passwords do not match.");

    // Service errors are shown as-is.
    let feedback = reset::submit_new_password(&backend, PASSWORD, PASSWORD).await;
    assert_eq!(
        feedback.message,
        "New password should be different from the old password."
    );

    let feedback = reset::submit_new_password(&backend, "newsecret", "newsecret").await;
    assert_eq!(feedback.tone, Tone::Success);
    let redirect = feedback.redirect.unwrap();
    assert_eq!(redirect.to, Route::Home);
    assert_eq!(redirect.after, Duration::from_secs(2));
    assert_eq!(rx.recv().await.unwrap().event, AuthEvent::UserUpdated);

    // The new password works; the old one does not.
    backend.sign_out().await.unwrap();
    assert!(
        backend
            .sign_in(&Credentials {
                email: EMAIL.to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .is_err()
    );
    assert!(
        backend
            .sign_in(&Credentials {
                email: EMAIL.to_string(),
                password: "newsecret".to_string(),
            })
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn bad_reset_link_returns_to_login_after_three_seconds() {
    let backend = MemoryBackend::new();
    let link = reset_link("forged", "forged");

    let feedback = reset::open_reset_link(&backend, Some(&link)).await.unwrap();
    assert_eq!(
        feedback.message,
        "Invalid or expired reset link. Please request a new password reset."
    );
    let redirect = feedback.redirect.unwrap();
    assert_eq!(redirect.to, Route::Login);
    assert_eq!(redirect.after, Duration::from_secs(3));
}

#[tokio::test]
async fn reset_without_link_or_session_returns_to_login_after_five_seconds() {
    let backend = MemoryBackend::new();
    let feedback = reset::open_reset_link(&backend, None).await.unwrap();
    let redirect = feedback.redirect.unwrap();
    assert_eq!(redirect.to, Route::Login);
    assert_eq!(redirect.after, Duration::from_secs(5));

    // A link without tokens behaves the same.
    let link = LinkParams::parse(&format!("{SITE}/reset-password")).unwrap();
    let feedback = reset::open_reset_link(&backend, Some(&link)).await.unwrap();
    assert_eq!(feedback.redirect.unwrap().after, Duration::from_secs(5));
}

#[tokio::test]
async fn reset_with_existing_session_is_ready() {
    let backend = MemoryBackend::new();
    backend.add_account(EMAIL, PASSWORD);
    auth::sign_in(&backend, EMAIL, PASSWORD).await;
    assert!(reset::open_reset_link(&backend, None).await.is_none());
}

#[tokio::test]
async fn password_update_after_session_loss_reports_expiry() {
    let backend = MemoryBackend::new();
    backend.add_account(EMAIL, PASSWORD);
    auth::sign_in(&backend, EMAIL, PASSWORD).await;
    backend.expire_session();

    let feedback = reset::submit_new_password(&backend, "newsecret", "newsecret").await;
    assert_eq!(
        feedback.message,
        "Your session has expired. Please request a new password reset."
    );
    assert_eq!(feedback.redirect.unwrap().to, Route::Login);
}

#[tokio::test]
async fn sign_out_always_lands_on_login() {
    let backend = MemoryBackend::new();
    backend.add_account(EMAIL, PASSWORD);
    let feedback = auth::sign_in(&backend, EMAIL, PASSWORD).await;
    assert_eq!(feedback.message, "Logged in successfully!");

    let feedback = auth::sign_out(&backend).await;
    assert_eq!(feedback.redirect.unwrap().to, Route::Login);
    assert!(backend.session().is_none());
}
