//! Backend abstraction for `TaskFlow`.
//!
//! Defines the [`Backend`] trait covering the hosted service's auth and row
//! operations. Concrete implementations:
//! - [`rest::RestBackend`]: HTTP client for the hosted REST API
//! - [`memory::MemoryBackend`]: in-process store for tests and offline demo mode
//! - [`Unconfigured`]: stands in when no backend URL/key is configured
//!
//! Every backend owns a [`SessionSlot`]: the current session plus a
//! broadcast channel that reports each change to subscribers.

pub mod memory;
pub mod rest;

use std::future::Future;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use taskflow_proto::auth::{AuthEvent, Credentials, Session, UserId};
use taskflow_proto::task::{Task, TaskDraft, TaskId, TaskStatus};

/// Capacity of the session-change broadcast channel.
const SESSION_CHANNEL_CAPACITY: usize = 16;

/// Errors reported by backend calls.
///
/// Every variant means "the remote call failed"; none are fatal to the app.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No backend URL or anon key was configured.
    #[error("backend is not configured (set TASKFLOW_URL and TASKFLOW_ANON_KEY)")]
    NotConfigured,

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NoSession,

    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service rejected the request.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// A mutation returned no row.
    #[error("no row returned for task {0}")]
    MissingRow(TaskId),

    /// An endpoint URL could not be built.
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A session change as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    /// What happened.
    pub event: AuthEvent,
    /// The session after the change (`None` when signed out).
    pub session: Option<Session>,
}

/// Result of a sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// Email confirmation is off; the user is signed in.
    SignedIn(Session),
    /// The account awaits email confirmation.
    ConfirmationSent,
}

/// Current session plus change notification, shared by all backends.
pub struct SessionSlot {
    current: RwLock<Option<Session>>,
    changes: broadcast::Sender<SessionChange>,
}

impl SessionSlot {
    /// Creates an empty slot.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(SESSION_CHANNEL_CAPACITY);
        Self {
            current: RwLock::new(None),
            changes,
        }
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// Replaces the session and notifies subscribers.
    pub fn set(&self, event: AuthEvent, session: Option<Session>) {
        *self.current.write() = session.clone();
        tracing::debug!(?event, signed_in = session.is_some(), "session changed");
        // No subscribers is fine; the change is still recorded.
        let _ = self.changes.send(SessionChange { event, session });
    }

    /// Subscribes to future session changes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.changes.subscribe()
    }
}

impl Default for SessionSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Async interface to the hosted auth and row service.
///
/// Row operations are scoped to the signed-in user by the service; the
/// client passes the owner as an equality filter and trusts the result.
pub trait Backend: Send + Sync + 'static {
    /// Snapshot of the current session, if any.
    fn session(&self) -> Option<Session>;

    /// Subscribes to session changes.
    fn subscribe(&self) -> broadcast::Receiver<SessionChange>;

    /// Restores a previously persisted session, refreshing its tokens.
    ///
    /// Always reports an [`AuthEvent::InitialSession`] change.
    fn restore_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, BackendError>> + Send;

    /// Creates an account.
    fn sign_up(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<SignUpOutcome, BackendError>> + Send;

    /// Signs in with email and password.
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Session, BackendError>> + Send;

    /// Signs out, clearing the local session even if the remote call fails.
    fn sign_out(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Establishes a session from tokens carried in an emailed link.
    fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> impl Future<Output = Result<Session, BackendError>> + Send;

    /// Sends a password-reset email whose link points at `redirect_to`.
    fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Changes the signed-in user's password.
    fn update_password(
        &self,
        password: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Confirms a sign-up email using the token hash from the link.
    fn verify_email(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<Option<Session>, BackendError>> + Send;

    /// Fetches every task owned by `owner`, in service order.
    fn list_tasks(
        &self,
        owner: UserId,
    ) -> impl Future<Output = Result<Vec<Task>, BackendError>> + Send;

    /// Inserts a task and returns the stored row.
    fn insert_task(
        &self,
        draft: &TaskDraft,
    ) -> impl Future<Output = Result<Task, BackendError>> + Send;

    /// Replaces a task's editable fields and returns the stored row.
    fn update_task(
        &self,
        id: &TaskId,
        draft: &TaskDraft,
    ) -> impl Future<Output = Result<Task, BackendError>> + Send;

    /// Changes only the status of a task and returns the stored row.
    fn update_status(
        &self,
        id: &TaskId,
        status: TaskStatus,
    ) -> impl Future<Output = Result<Task, BackendError>> + Send;

    /// Deletes a task.
    fn delete_task(&self, id: &TaskId) -> impl Future<Output = Result<(), BackendError>> + Send;
}

/// Backend used when no service URL or key is configured.
///
/// Every call fails with [`BackendError::NotConfigured`]; the app keeps
/// running in the signed-out state.
#[derive(Default)]
pub struct Unconfigured {
    slot: SessionSlot,
}

impl Unconfigured {
    /// Creates the placeholder backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for Unconfigured {
    fn session(&self) -> Option<Session> {
        None
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.slot.subscribe()
    }

    async fn restore_session(&self) -> Result<Option<Session>, BackendError> {
        self.slot.set(AuthEvent::InitialSession, None);
        Ok(None)
    }

    async fn sign_up(&self, _credentials: &Credentials) -> Result<SignUpOutcome, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn sign_in(&self, _credentials: &Credentials) -> Result<Session, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn set_session(&self, _access: &str, _refresh: &str) -> Result<Session, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn request_password_reset(&self, _email: &str, _to: &str) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn update_password(&self, _password: &str) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn verify_email(&self, _token_hash: &str) -> Result<Option<Session>, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn list_tasks(&self, _owner: UserId) -> Result<Vec<Task>, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn insert_task(&self, _draft: &TaskDraft) -> Result<Task, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn update_task(&self, _id: &TaskId, _draft: &TaskDraft) -> Result<Task, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn update_status(&self, _id: &TaskId, _status: TaskStatus) -> Result<Task, BackendError> {
        Err(BackendError::NotConfigured)
    }

    async fn delete_task(&self, _id: &TaskId) -> Result<(), BackendError> {
        Err(BackendError::NotConfigured)
    }
}
