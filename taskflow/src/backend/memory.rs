//! In-process backend.
//!
//! Behaves like the hosted service closely enough for the client to run
//! against it: accounts with optional email confirmation, opaque tokens,
//! owner-scoped rows, and the same error messages for the common failures.
//! Used by the test suites and by `--offline` demo mode.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use taskflow_proto::auth::{AuthEvent, Credentials, Session, User, UserId};
use taskflow_proto::task::{Task, TaskDraft, TaskId, TaskStatus};

use super::{Backend, BackendError, SessionChange, SessionSlot, SignUpOutcome};

const MIN_PASSWORD_LENGTH: usize = 6;
const TOKEN_LIFETIME_SECS: u64 = 3600;

struct Account {
    user: User,
    password: String,
    confirmed: bool,
}

/// A password-reset email the backend "sent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentReset {
    /// Recipient.
    pub email: String,
    /// Where the emailed link points.
    pub redirect_to: String,
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    rows: Vec<Task>,
    next_row: u64,
    next_token: u64,
    require_confirmation: bool,
    fail_next: Option<String>,
    confirmations: HashMap<String, String>,
    recovery: HashMap<String, (String, String)>,
    tokens: HashMap<String, UserId>,
    resets: Vec<SentReset>,
}

impl Inner {
    fn issue_session(&mut self, user: &User) -> Session {
        self.next_token += 1;
        let n = self.next_token;
        let access_token = format!("mem-access-{n}");
        self.tokens.insert(access_token.clone(), user.id);
        Session {
            access_token,
            refresh_token: format!("mem-refresh-{n}"),
            token_type: "bearer".to_string(),
            expires_in: Some(TOKEN_LIFETIME_SECS),
            expires_at: None,
            user: user.clone(),
        }
    }

    fn account_by_id(&mut self, id: UserId) -> Option<&mut Account> {
        self.accounts.values_mut().find(|a| a.user.id == id)
    }
}

/// Backend that keeps accounts and rows in memory.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    slot: SessionSlot,
}

impl MemoryBackend {
    /// Creates an empty backend with email confirmation disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires new accounts to confirm their email before signing in.
    #[must_use]
    pub fn with_email_confirmation(self) -> Self {
        self.inner.lock().require_confirmation = true;
        self
    }

    /// Adds a confirmed account and returns its user id.
    pub fn add_account(&self, email: &str, password: &str) -> UserId {
        let user = User {
            id: UserId::new(),
            email: Some(email.to_string()),
        };
        let id = user.id;
        self.inner.lock().accounts.insert(
            email.to_string(),
            Account {
                user,
                password: password.to_string(),
                confirmed: true,
            },
        );
        id
    }

    /// Inserts a row directly, bypassing session checks.
    pub fn seed_task(&self, owner: UserId, draft: TaskDraft) -> Task {
        let mut inner = self.inner.lock();
        inner.next_row += 1;
        let task = Task {
            id: TaskId::new(inner.next_row.to_string()),
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: draft.status,
            due_date: draft.due_date,
            category: draft.category,
            user_id: owner,
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        inner.rows.push(task.clone());
        task
    }

    /// Makes the next backend call fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.inner.lock().fail_next = Some(message.into());
    }

    /// Token hash from the confirmation email sent to `email`, if pending.
    #[must_use]
    pub fn confirmation_token(&self, email: &str) -> Option<String> {
        self.inner
            .lock()
            .confirmations
            .iter()
            .find(|(_, addr)| addr.as_str() == email)
            .map(|(token, _)| token.clone())
    }

    /// Access and refresh tokens carried by the last reset link sent to `email`.
    #[must_use]
    pub fn recovery_tokens(&self, email: &str) -> Option<(String, String)> {
        self.inner.lock().recovery.get(email).cloned()
    }

    /// Every password-reset email sent so far.
    #[must_use]
    pub fn sent_resets(&self) -> Vec<SentReset> {
        self.inner.lock().resets.clone()
    }

    /// Snapshot of every stored row, across all owners.
    #[must_use]
    pub fn all_rows(&self) -> Vec<Task> {
        self.inner.lock().rows.clone()
    }

    /// Ends the current session as if its tokens had expired.
    pub fn expire_session(&self) {
        if let Some(session) = self.slot.get() {
            self.inner.lock().tokens.remove(&session.access_token);
        }
        self.slot.set(AuthEvent::SignedOut, None);
    }

    fn take_failure(&self) -> Result<(), BackendError> {
        match self.inner.lock().fail_next.take() {
            Some(message) => Err(api(400, message)),
            None => Ok(()),
        }
    }

    fn current_user(&self) -> Result<UserId, BackendError> {
        let session = self.slot.get().ok_or(BackendError::NoSession)?;
        self.inner
            .lock()
            .tokens
            .get(&session.access_token)
            .copied()
            .ok_or(BackendError::NoSession)
    }
}

fn api(status: u16, message: impl Into<String>) -> BackendError {
    BackendError::Api {
        status,
        message: message.into(),
    }
}

fn check_password(password: &str) -> Result<(), BackendError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(api(
            422,
            format!("Password should be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}

impl Backend for MemoryBackend {
    fn session(&self) -> Option<Session> {
        self.slot.get()
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionChange> {
        self.slot.subscribe()
    }

    async fn restore_session(&self) -> Result<Option<Session>, BackendError> {
        let session = self.slot.get();
        self.slot.set(AuthEvent::InitialSession, session.clone());
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, BackendError> {
        self.take_failure()?;
        check_password(&credentials.password)?;

        let session = {
            let mut inner = self.inner.lock();
            if inner.accounts.contains_key(&credentials.email) {
                return Err(api(422, "User already registered"));
            }
            let user = User {
                id: UserId::new(),
                email: Some(credentials.email.clone()),
            };
            let confirmed = !inner.require_confirmation;
            inner.accounts.insert(
                credentials.email.clone(),
                Account {
                    user: user.clone(),
                    password: credentials.password.clone(),
                    confirmed,
                },
            );

            if confirmed {
                Some(inner.issue_session(&user))
            } else {
                inner.next_token += 1;
                let token = format!("mem-confirm-{}", inner.next_token);
                inner.confirmations.insert(token, credentials.email.clone());
                None
            }
        };

        Ok(match session {
            Some(session) => {
                self.slot.set(AuthEvent::SignedIn, Some(session.clone()));
                SignUpOutcome::SignedIn(session)
            }
            None => SignUpOutcome::ConfirmationSent,
        })
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        self.take_failure()?;
        let session = {
            let mut inner = self.inner.lock();
            let account = inner
                .accounts
                .get(&credentials.email)
                .filter(|a| a.password == credentials.password)
                .ok_or_else(|| api(400, "Invalid login credentials"))?;
            if !account.confirmed {
                return Err(api(400, "Email not confirmed"));
            }
            let user = account.user.clone();
            inner.issue_session(&user)
        };
        self.slot.set(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(session) = self.slot.get() {
            self.inner.lock().tokens.remove(&session.access_token);
        }
        self.slot.set(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, BackendError> {
        self.take_failure()?;
        let session = {
            let mut inner = self.inner.lock();
            let id = inner
                .tokens
                .get(access_token)
                .copied()
                .ok_or_else(|| api(401, "invalid JWT: token is expired or unknown"))?;
            let user = inner
                .account_by_id(id)
                .map(|a| a.user.clone())
                .ok_or_else(|| api(404, "User not found"))?;
            Session {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
                token_type: "bearer".to_string(),
                expires_in: Some(TOKEN_LIFETIME_SECS),
                expires_at: None,
                user,
            }
        };
        self.slot.set(AuthEvent::PasswordRecovery, Some(session.clone()));
        Ok(session)
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        self.take_failure()?;
        let mut inner = self.inner.lock();
        inner.resets.push(SentReset {
            email: email.to_string(),
            redirect_to: redirect_to.to_string(),
        });
        // Unknown addresses succeed silently, like the hosted service.
        let user = inner.accounts.get(email).map(|a| a.user.clone());
        if let Some(user) = user {
            let session = inner.issue_session(&user);
            inner.recovery.insert(
                email.to_string(),
                (session.access_token, session.refresh_token),
            );
        }
        Ok(())
    }

    async fn update_password(&self, password: &str) -> Result<(), BackendError> {
        self.take_failure()?;
        let id = self
            .current_user()
            .map_err(|_| api(401, "Auth session missing!"))?;
        check_password(password)?;

        let user = {
            let mut inner = self.inner.lock();
            let account = inner
                .account_by_id(id)
                .ok_or_else(|| api(404, "User not found"))?;
            if account.password == password {
                return Err(api(
                    422,
                    "New password should be different from the old password.",
                ));
            }
            account.password = password.to_string();
            account.user.clone()
        };

        if let Some(mut session) = self.slot.get() {
            session.user = user;
            self.slot.set(AuthEvent::UserUpdated, Some(session));
        }
        Ok(())
    }

    async fn verify_email(&self, token_hash: &str) -> Result<Option<Session>, BackendError> {
        self.take_failure()?;
        let session = {
            let mut inner = self.inner.lock();
            let email = inner
                .confirmations
                .remove(token_hash)
                .ok_or_else(|| api(403, "Token has expired or is invalid"))?;
            let account = inner
                .accounts
                .get_mut(&email)
                .ok_or_else(|| api(404, "User not found"))?;
            account.confirmed = true;
            let user = account.user.clone();
            inner.issue_session(&user)
        };
        self.slot.set(AuthEvent::SignedIn, Some(session.clone()));
        Ok(Some(session))
    }

    async fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, BackendError> {
        self.take_failure()?;
        let caller = self.current_user()?;
        if caller != owner {
            // Row-level security hides other users' rows.
            return Ok(Vec::new());
        }
        Ok(self
            .inner
            .lock()
            .rows
            .iter()
            .filter(|t| t.user_id == owner)
            .cloned()
            .collect())
    }

    async fn insert_task(&self, draft: &TaskDraft) -> Result<Task, BackendError> {
        self.take_failure()?;
        let caller = self.current_user()?;
        let owner = draft.user_id.unwrap_or(caller);
        if owner != caller {
            return Err(api(
                403,
                "new row violates row-level security policy for table \"todos\"",
            ));
        }
        Ok(self.seed_task(owner, draft.clone()))
    }

    async fn update_task(&self, id: &TaskId, draft: &TaskDraft) -> Result<Task, BackendError> {
        self.take_failure()?;
        let caller = self.current_user()?;
        let mut inner = self.inner.lock();
        let row = inner
            .rows
            .iter_mut()
            .find(|t| &t.id == id && t.user_id == caller)
            .ok_or_else(|| BackendError::MissingRow(id.clone()))?;
        row.title.clone_from(&draft.title);
        row.description.clone_from(&draft.description);
        row.priority = draft.priority;
        row.status = draft.status;
        row.due_date = draft.due_date;
        row.category.clone_from(&draft.category);
        Ok(row.clone())
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<Task, BackendError> {
        self.take_failure()?;
        let caller = self.current_user()?;
        let mut inner = self.inner.lock();
        let row = inner
            .rows
            .iter_mut()
            .find(|t| &t.id == id && t.user_id == caller)
            .ok_or_else(|| BackendError::MissingRow(id.clone()))?;
        row.status = status;
        Ok(row.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), BackendError> {
        self.take_failure()?;
        let caller = self.current_user()?;
        self.inner
            .lock()
            .rows
            .retain(|t| !(&t.id == id && t.user_id == caller));
        Ok(())
    }
}
