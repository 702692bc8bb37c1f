//! Identity and session types for the hosted auth API.
//!
//! These mirror the JSON bodies of the token, signup, recover, verify and
//! user endpoints. The client treats tokens as opaque; it only reads the
//! presence of a [`Session`] and the embedded [`User`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generates a random user identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a `UserId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated user as reported by the auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier; owner key for task rows.
    pub id: UserId,
    /// Email address, when the account has one.
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session: refreshable tokens plus the user they belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for API calls.
    pub access_token: String,
    /// Token used to mint a new access token.
    pub refresh_token: String,
    /// Token type, normally `bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Absolute expiry as a Unix timestamp in seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// The signed-in user.
    pub user: User,
}

impl Session {
    /// Convenience accessor for the owner key.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Whether the access token has expired at `now` (Unix seconds).
    ///
    /// Sessions without an absolute expiry are treated as live.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Email + password credentials for sign in and sign up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Body of a sign-up response.
///
/// When email confirmation is disabled the API signs the user in
/// immediately and returns a session; otherwise only the pending user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    /// Signed in straight away.
    Session(Session),
    /// Account created; awaiting email confirmation.
    Pending(User),
}

/// Body of a refresh-token grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    /// The refresh token to exchange.
    pub refresh_token: String,
}

/// Body of a password-recovery request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverRequest {
    /// Address to send the reset link to.
    pub email: String,
}

/// One-time-password flavours accepted by the verify endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpType {
    /// Confirms a new account's email.
    Signup,
    /// Password recovery.
    Recovery,
}

/// Body of an email-verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// Which flow the token belongs to.
    #[serde(rename = "type")]
    pub otp_type: OtpType,
    /// Hashed token from the emailed link.
    pub token_hash: String,
}

/// Body of a user update; only the password is ever changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    /// New password.
    pub password: String,
}

/// Kind of session change reported to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEvent {
    /// The session restored (or found absent) at startup.
    InitialSession,
    /// A user signed in.
    SignedIn,
    /// The user signed out or the session expired.
    SignedOut,
    /// The access token was refreshed.
    TokenRefreshed,
    /// The user record changed (e.g. new password).
    UserUpdated,
    /// A recovery session was established from a reset link.
    PasswordRecovery,
}

/// Error body returned by the auth and row APIs.
///
/// Different endpoints use different field names; [`ApiErrorBody::message`]
/// picks the first one present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Auth API message.
    #[serde(default)]
    pub msg: Option<String>,
    /// Row API message.
    #[serde(default)]
    pub message: Option<String>,
    /// OAuth-style description.
    #[serde(default)]
    pub error_description: Option<String>,
    /// OAuth-style error code.
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// The most descriptive message in the body, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
    }
}
