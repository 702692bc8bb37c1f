//! HTTP backend for the hosted auth (`/auth/v1`) and row (`/rest/v1`) APIs.
//!
//! Every request carries the project's anon key in the `apikey` header and
//! a bearer token: the user's access token when signed in, otherwise the
//! anon key itself. Row mutations ask for `return=representation` so the
//! stored row comes back in the response and can replace the cached copy.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use url::Url;

use taskflow_proto::auth::{
    ApiErrorBody, AuthEvent, Credentials, OtpType, RecoverRequest, RefreshRequest, Session,
    SignUpResponse, UpdateUserRequest, User, UserId, VerifyRequest,
};
use taskflow_proto::task::{StatusPatch, TASKS_TABLE, Task, TaskDraft, TaskId, TaskStatus};

use super::{Backend, BackendError, SessionChange, SessionSlot, SignUpOutcome};
use crate::storage::LocalStore;

/// Connection settings for [`RestBackend`].
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`.
    pub url: String,
    /// Public anon key.
    pub anon_key: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

/// Backend talking to the hosted service over HTTP.
pub struct RestBackend {
    http: Client,
    base: Url,
    anon_key: String,
    slot: SessionSlot,
    store: Option<LocalStore>,
}

impl RestBackend {
    /// Builds a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::InvalidUrl`] if the project URL does not parse,
    /// or [`BackendError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &RestConfig) -> Result<Self, BackendError> {
        let mut base = Url::parse(config.url.trim())?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            http,
            base,
            anon_key: config.anon_key.trim().to_string(),
            slot: SessionSlot::new(),
            store: None,
        })
    }

    /// Persists sessions in `store` so they survive restarts.
    #[must_use]
    pub fn with_store(mut self, store: LocalStore) -> Self {
        self.store = Some(store);
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        Ok(self.base.join(path)?)
    }

    fn token_url(&self, grant_type: &str) -> Result<Url, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);
        Ok(url)
    }

    fn rows_url(&self) -> Result<Url, BackendError> {
        self.endpoint(&format!("rest/v1/{TASKS_TABLE}"))
    }

    fn row_url(&self, id: &TaskId) -> Result<Url, BackendError> {
        let mut url = self.rows_url()?;
        url.query_pairs_mut().append_pair("id", &format!("eq.{id}"));
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.anon_key))
    }

    async fn send_json<T: DeserializeOwned>(req: RequestBuilder) -> Result<T, BackendError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }
        serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn send_unit(req: RequestBuilder) -> Result<(), BackendError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.bytes().await?;
        Err(api_error(status, &body))
    }

    /// Records a session change locally and in persistent storage.
    fn commit(&self, event: AuthEvent, session: Option<Session>) {
        if let Some(store) = &self.store {
            let result = match &session {
                Some(s) => store.save_session(s),
                None => store.clear_session(),
            };
            if let Err(e) = result {
                tracing::warn!(error = %e, "could not persist session");
            }
        }
        self.slot.set(event, session);
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let url = self.token_url("refresh_token")?;
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let session: Session =
            Self::send_json(self.request(Method::POST, url, None).json(&body)).await?;
        Ok(stamp_expiry(session))
    }

    /// Access token of the current session, refreshed first if it has expired.
    ///
    /// A failed refresh ends the session.
    async fn access_token(&self) -> Result<String, BackendError> {
        let session = self.slot.get().ok_or(BackendError::NoSession)?;
        if !session.is_expired_at(now_secs()) {
            return Ok(session.access_token);
        }

        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                self.commit(AuthEvent::TokenRefreshed, Some(fresh));
                Ok(token)
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed, signing out");
                self.commit(AuthEvent::SignedOut, None);
                Err(BackendError::NoSession)
            }
        }
    }

    async fn first_row(req: RequestBuilder, id: Option<&TaskId>) -> Result<Task, BackendError> {
        let rows: Vec<Task> = Self::send_json(req).await?;
        rows.into_iter().next().ok_or_else(|| match id {
            Some(id) => BackendError::MissingRow(id.clone()),
            None => BackendError::Decode("insert returned no rows".to_string()),
        })
    }
}

impl Backend for RestBackend {
    fn session(&self) -> Option<Session> {
        self.slot.get()
    }

    fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionChange> {
        self.slot.subscribe()
    }

    async fn restore_session(&self) -> Result<Option<Session>, BackendError> {
        let Some(stored) = self.store.as_ref().and_then(LocalStore::load_session) else {
            self.slot.set(AuthEvent::InitialSession, None);
            return Ok(None);
        };

        if !stored.is_expired_at(now_secs()) {
            self.slot.set(AuthEvent::InitialSession, Some(stored.clone()));
            return Ok(Some(stored));
        }

        match self.refresh(&stored.refresh_token).await {
            Ok(fresh) => {
                self.commit(AuthEvent::InitialSession, Some(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(BackendError::Api { status, message }) => {
                tracing::info!(status, %message, "stored session rejected");
                self.commit(AuthEvent::InitialSession, None);
                Ok(None)
            }
            Err(e) => {
                // Keep the stored tokens; the service may just be unreachable.
                self.slot.set(AuthEvent::InitialSession, None);
                Err(e)
            }
        }
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<SignUpOutcome, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let resp: SignUpResponse =
            Self::send_json(self.request(Method::POST, url, None).json(credentials)).await?;

        match resp {
            SignUpResponse::Session(session) => {
                let session = stamp_expiry(session);
                self.commit(AuthEvent::SignedIn, Some(session.clone()));
                Ok(SignUpOutcome::SignedIn(session))
            }
            SignUpResponse::Pending(_) => Ok(SignUpOutcome::ConfirmationSent),
        }
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, BackendError> {
        let url = self.token_url("password")?;
        let session: Session =
            Self::send_json(self.request(Method::POST, url, None).json(credentials)).await?;
        let session = stamp_expiry(session);
        tracing::info!(user = %session.user.id, "signed in");
        self.commit(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let Some(session) = self.slot.get() else {
            return Ok(());
        };
        let url = self.endpoint("auth/v1/logout")?;
        let result =
            Self::send_unit(self.request(Method::POST, url, Some(&session.access_token))).await;
        if let Err(e) = result {
            tracing::warn!(error = %e, "remote sign-out failed, clearing local session anyway");
        }
        self.commit(AuthEvent::SignedOut, None);
        Ok(())
    }

    async fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<Session, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        let user: User =
            Self::send_json(self.request(Method::GET, url, Some(access_token))).await?;
        let session = Session {
            access_token: access_token.to_string(),
            refresh_token: refresh_token.to_string(),
            token_type: "bearer".to_string(),
            expires_in: None,
            expires_at: None,
            user,
        };
        self.commit(AuthEvent::PasswordRecovery, Some(session.clone()));
        Ok(session)
    }

    async fn request_password_reset(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), BackendError> {
        let mut url = self.endpoint("auth/v1/recover")?;
        url.query_pairs_mut().append_pair("redirect_to", redirect_to);
        let body = RecoverRequest {
            email: email.to_string(),
        };
        Self::send_unit(self.request(Method::POST, url, None).json(&body)).await
    }

    async fn update_password(&self, password: &str) -> Result<(), BackendError> {
        let token = self.access_token().await?;
        let url = self.endpoint("auth/v1/user")?;
        let body = UpdateUserRequest {
            password: password.to_string(),
        };
        let user: User =
            Self::send_json(self.request(Method::PUT, url, Some(&token)).json(&body)).await?;

        if let Some(mut session) = self.slot.get() {
            session.user = user;
            self.commit(AuthEvent::UserUpdated, Some(session));
        }
        Ok(())
    }

    async fn verify_email(&self, token_hash: &str) -> Result<Option<Session>, BackendError> {
        let url = self.endpoint("auth/v1/verify")?;
        let body = VerifyRequest {
            otp_type: OtpType::Signup,
            token_hash: token_hash.to_string(),
        };
        let resp: SignUpResponse =
            Self::send_json(self.request(Method::POST, url, None).json(&body)).await?;

        match resp {
            SignUpResponse::Session(session) => {
                let session = stamp_expiry(session);
                self.commit(AuthEvent::SignedIn, Some(session.clone()));
                Ok(Some(session))
            }
            SignUpResponse::Pending(_) => Ok(None),
        }
    }

    async fn list_tasks(&self, owner: UserId) -> Result<Vec<Task>, BackendError> {
        let token = self.access_token().await?;
        let mut url = self.rows_url()?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{owner}"));
        let tasks: Vec<Task> = Self::send_json(self.request(Method::GET, url, Some(&token))).await?;
        tracing::debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    async fn insert_task(&self, draft: &TaskDraft) -> Result<Task, BackendError> {
        let token = self.access_token().await?;
        let url = self.rows_url()?;
        let req = self
            .request(Method::POST, url, Some(&token))
            .header("Prefer", "return=representation")
            .json(&[draft]);
        Self::first_row(req, None).await
    }

    async fn update_task(&self, id: &TaskId, draft: &TaskDraft) -> Result<Task, BackendError> {
        let token = self.access_token().await?;
        let url = self.row_url(id)?;
        let req = self
            .request(Method::PATCH, url, Some(&token))
            .header("Prefer", "return=representation")
            .json(draft);
        Self::first_row(req, Some(id)).await
    }

    async fn update_status(&self, id: &TaskId, status: TaskStatus) -> Result<Task, BackendError> {
        let token = self.access_token().await?;
        let url = self.row_url(id)?;
        let req = self
            .request(Method::PATCH, url, Some(&token))
            .header("Prefer", "return=representation")
            .json(&StatusPatch { status });
        Self::first_row(req, Some(id)).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), BackendError> {
        let token = self.access_token().await?;
        let url = self.row_url(id)?;
        Self::send_unit(self.request(Method::DELETE, url, Some(&token))).await
    }
}

/// Builds a [`BackendError::Api`] from a non-success response.
fn api_error(status: reqwest::StatusCode, body: &[u8]) -> BackendError {
    let message = serde_json::from_slice::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.message().map(str::to_string))
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    BackendError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Fills in `expires_at` from `expires_in` when the service only sent the latter.
fn stamp_expiry(mut session: Session) -> Session {
    if session.expires_at.is_none()
        && let Some(secs) = session.expires_in
    {
        let secs = i64::try_from(secs).unwrap_or(i64::MAX);
        session.expires_at = Some(now_secs().saturating_add(secs));
    }
    session
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
