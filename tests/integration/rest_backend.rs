//! Integration tests for the HTTP backend against an in-process fake of
//! the hosted auth (`/auth/v1`) and row (`/rest/v1`) APIs.
//!
//! These tests validate:
//! - Every request carries the anon key; signed-in calls carry the user's token
//! - Sign in persists the session and restore brings it back
//! - Expired sessions are refreshed before row calls
//! - A rejected refresh signs the user out
//! - Row calls use the `todos` table with `eq.` filters and ask for the stored row
//! - Error bodies surface as the user-facing message

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::needless_pass_by_value)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use taskflow::auth::reset;
use taskflow::backend::rest::{RestBackend, RestConfig};
use taskflow::backend::{Backend, BackendError, SignUpOutcome};
use taskflow::session::Route;
use taskflow::storage::LocalStore;
use taskflow_proto::auth::{AuthEvent, Credentials, Session, User, UserId};
use taskflow_proto::task::{Priority, TaskDraft, TaskId, TaskStatus};

const ANON_KEY: &str = "anon-key";
const USER_ID: &str = "6f1c2b1e-3a7d-4c55-9a55-0d7f2f9e8a10";
const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "secret1";

/// One request as seen by the fake service.
#[derive(Debug, Clone)]
struct Seen {
    route: &'static str,
    query: HashMap<String, String>,
    apikey: Option<String>,
    bearer: Option<String>,
    prefer: Option<String>,
    body: Option<Value>,
}

#[derive(Debug, Default)]
struct Fake {
    seen: Vec<Seen>,
    /// Access tokens the service accepts.
    live_tokens: Vec<String>,
    /// Refresh token the service accepts.
    refresh_token: Option<String>,
    issued: u32,
    rows: Vec<Value>,
}

type Shared = Arc<Mutex<Fake>>;

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn record(
    state: &Shared,
    route: &'static str,
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    body: Option<Value>,
) -> Option<String> {
    let bearer = header(headers, "authorization")
        .and_then(|v| v.strip_prefix("Bearer ").map(str::to_string));
    state.lock().seen.push(Seen {
        route,
        query: query.clone(),
        apikey: header(headers, "apikey"),
        bearer: bearer.clone(),
        prefer: header(headers, "prefer"),
        body,
    });
    bearer
}

fn authorized(state: &Shared, bearer: Option<&str>) -> bool {
    bearer.is_some_and(|b| state.lock().live_tokens.iter().any(|t| t == b))
}

fn user_json() -> Value {
    json!({ "id": USER_ID, "email": EMAIL, "aud": "authenticated" })
}

fn issue(state: &Shared) -> Value {
    let mut fake = state.lock();
    fake.issued += 1;
    let access = format!("access-{}", fake.issued);
    let refresh = format!("refresh-{}", fake.issued);
    fake.live_tokens.push(access.clone());
    fake.refresh_token = Some(refresh.clone());
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": 3600,
        "user": user_json(),
    })
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "invalid JWT" }))).into_response()
}

async fn token(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "token", &query, &headers, Some(body.clone()));
    match query.get("grant_type").map(String::as_str) {
        Some("password") if body["email"] == EMAIL && body["password"] == PASSWORD => {
            Json(issue(&state)).into_response()
        }
        Some("password") => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
        )
            .into_response(),
        Some("refresh_token") => {
            let accepted = state.lock().refresh_token.clone();
            if accepted.as_deref() == body["refresh_token"].as_str() {
                Json(issue(&state)).into_response()
            } else {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "invalid_grant", "error_description": "Invalid Refresh Token: Refresh Token Not Found" })),
                )
                    .into_response()
            }
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn signup(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "signup", &HashMap::new(), &headers, Some(body));
    // Confirmation required: only the pending user comes back.
    Json(user_json()).into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let bearer = record(&state, "logout", &HashMap::new(), &headers, None);
    state.lock().live_tokens.retain(|t| Some(t) != bearer.as_ref());
    StatusCode::NO_CONTENT.into_response()
}

async fn get_user(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let bearer = record(&state, "get user", &HashMap::new(), &headers, None);
    if !authorized(&state, bearer.as_deref()) {
        return unauthorized();
    }
    Json(user_json()).into_response()
}

async fn put_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let bearer = record(&state, "put user", &HashMap::new(), &headers, Some(body));
    if !authorized(&state, bearer.as_deref()) {
        return unauthorized();
    }
    Json(user_json()).into_response()
}

async fn recover(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "recover", &query, &headers, Some(body));
    Json(json!({})).into_response()
}

async fn list_rows(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let bearer = record(&state, "list", &query, &headers, None);
    if !authorized(&state, bearer.as_deref()) {
        return unauthorized();
    }
    Json(Value::Array(state.lock().rows.clone())).into_response()
}

async fn insert_rows(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let bearer = record(&state, "insert", &query, &headers, Some(body.clone()));
    if !authorized(&state, bearer.as_deref()) {
        return unauthorized();
    }
    let mut fake = state.lock();
    let mut row = body[0].clone();
    row["id"] = json!(fake.rows.len() + 1);
    row["created_at"] = json!("2025-01-01T00:00:00+00:00");
    fake.rows.push(row.clone());
    (StatusCode::CREATED, Json(json!([row]))).into_response()
}

async fn patch_rows(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let bearer = record(&state, "patch", &query, &headers, Some(body.clone()));
    if !authorized(&state, bearer.as_deref()) {
        return unauthorized();
    }
    let id = query.get("id").and_then(|f| f.strip_prefix("eq.")).unwrap_or_default();
    let mut fake = state.lock();
    let Some(row) = fake.rows.iter_mut().find(|r| r["id"].to_string() == id) else {
        return Json(json!([])).into_response();
    };
    if let (Some(row), Some(patch)) = (row.as_object_mut(), body.as_object()) {
        for (key, value) in patch {
            row.insert(key.clone(), value.clone());
        }
    }
    Json(json!([row])).into_response()
}

async fn delete_rows(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let bearer = record(&state, "delete", &query, &headers, None);
    if !authorized(&state, bearer.as_deref()) {
        return unauthorized();
    }
    let id = query.get("id").and_then(|f| f.strip_prefix("eq.")).unwrap_or_default().to_string();
    state.lock().rows.retain(|r| r["id"].to_string() != id);
    StatusCode::NO_CONTENT.into_response()
}

/// Start the fake service and return its base URL.
async fn start_service(state: Shared) -> String {
    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/signup", post(signup))
        .route("/auth/v1/logout", post(logout))
        .route("/auth/v1/user", get(get_user).put(put_user))
        .route("/auth/v1/recover", post(recover))
        .route(
            "/rest/v1/todos",
            get(list_rows)
                .post(insert_rows)
                .patch(patch_rows)
                .delete(delete_rows),
        )
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn rest(url: &str) -> RestBackend {
    RestBackend::new(&RestConfig {
        url: url.to_string(),
        anon_key: ANON_KEY.to_string(),
        request_timeout: Duration::from_secs(5),
    })
    .expect("backend")
}

fn temp_store() -> LocalStore {
    LocalStore::new(std::env::temp_dir().join(format!("taskflow-rest-{}", uuid::Uuid::new_v4())))
}

fn credentials(password: &str) -> Credentials {
    Credentials {
        email: EMAIL.to_string(),
        password: password.to_string(),
    }
}

fn seen(state: &Shared, route: &str) -> Vec<Seen> {
    state
        .lock()
        .seen
        .iter()
        .filter(|s| s.route == route)
        .cloned()
        .collect()
}

async fn setup() -> (Shared, RestBackend) {
    let state = Shared::default();
    let url = start_service(Arc::clone(&state)).await;
    (state, rest(&url))
}

#[tokio::test]
async fn sign_in_uses_password_grant_and_anon_key() {
    let (state, backend) = setup().await;
    let mut rx = backend.subscribe();

    let session = backend.sign_in(&credentials(PASSWORD)).await.unwrap();
    assert_eq!(session.access_token, "access-1");
    assert!(session.expires_at.is_some(), "expiry stamped from expires_in");
    assert_eq!(session.user.email.as_deref(), Some(EMAIL));
    assert_eq!(rx.recv().await.unwrap().event, AuthEvent::SignedIn);

    let calls = seen(&state, "token");
    assert_eq!(calls[0].apikey.as_deref(), Some(ANON_KEY));
    assert_eq!(calls[0].bearer.as_deref(), Some(ANON_KEY));
    assert_eq!(calls[0].query["grant_type"], "password");
}

#[tokio::test]
async fn bad_credentials_surface_service_message() {
    let (_state, backend) = setup().await;
    let err = backend.sign_in(&credentials("wrong")).await.unwrap_err();
    match err {
        BackendError::Api { status, ref message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid login credentials");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(backend.session().is_none());
}

#[tokio::test]
async fn sign_up_pending_confirmation() {
    let (state, backend) = setup().await;
    let outcome = backend.sign_up(&credentials(PASSWORD)).await.unwrap();
    assert_eq!(outcome, SignUpOutcome::ConfirmationSent);
    assert!(backend.session().is_none());
    assert_eq!(seen(&state, "signup")[0].body.as_ref().unwrap()["email"], EMAIL);
}

#[tokio::test]
async fn session_persists_across_restarts() {
    let state = Shared::default();
    let url = start_service(Arc::clone(&state)).await;
    let store = temp_store();

    let first = rest(&url).with_store(store.clone());
    first.sign_in(&credentials(PASSWORD)).await.unwrap();
    assert!(store.load_session().is_some());

    let second = rest(&url).with_store(store.clone());
    let mut rx = second.subscribe();
    let restored = second.restore_session().await.unwrap().expect("restored");
    assert_eq!(restored.access_token, "access-1");
    let change = rx.recv().await.unwrap();
    assert_eq!(change.event, AuthEvent::InitialSession);
    assert!(change.session.is_some());

    second.sign_out().await.unwrap();
    assert!(store.load_session().is_none());
    assert_eq!(seen(&state, "logout")[0].bearer.as_deref(), Some("access-1"));
}

#[tokio::test]
async fn expired_stored_session_is_refreshed_on_restore() {
    let state = Shared::default();
    let url = start_service(Arc::clone(&state)).await;
    let store = temp_store();

    rest(&url).with_store(store.clone()).sign_in(&credentials(PASSWORD)).await.unwrap();
    let mut stale = store.load_session().unwrap();
    stale.expires_at = Some(0);
    store.save_session(&stale).unwrap();

    let backend = rest(&url).with_store(store.clone());
    let restored = backend.restore_session().await.unwrap().expect("refreshed");
    assert_eq!(restored.access_token, "access-2");
    assert_eq!(store.load_session().unwrap().access_token, "access-2");
    assert_eq!(seen(&state, "token")[1].query["grant_type"], "refresh_token");
}

#[tokio::test]
async fn rejected_refresh_on_restore_clears_session() {
    let state = Shared::default();
    let url = start_service(Arc::clone(&state)).await;
    let store = temp_store();
    store
        .save_session(&Session {
            access_token: "old".to_string(),
            refresh_token: "revoked".to_string(),
            token_type: "bearer".to_string(),
            expires_in: None,
            expires_at: Some(0),
            user: User {
                id: UserId::new(),
                email: None,
            },
        })
        .unwrap();

    let backend = rest(&url).with_store(store.clone());
    assert!(backend.restore_session().await.unwrap().is_none());
    assert!(store.load_session().is_none());
}

#[tokio::test]
async fn row_calls_filter_by_owner_and_return_stored_rows() {
    let (state, backend) = setup().await;
    let session = backend.sign_in(&credentials(PASSWORD)).await.unwrap();
    let owner = session.user_id();

    let draft = TaskDraft {
        title: "Write Documentation".to_string(),
        description: String::new(),
        priority: Priority::High,
        status: TaskStatus::Todo,
        due_date: None,
        category: Some("Docs".to_string()),
        user_id: Some(owner),
    };
    let created = backend.insert_task(&draft).await.unwrap();
    assert_eq!(created.id, TaskId::new("1"));
    assert_eq!(created.user_id, owner);
    let insert = &seen(&state, "insert")[0];
    assert_eq!(insert.prefer.as_deref(), Some("return=representation"));
    assert_eq!(insert.bearer.as_deref(), Some("access-1"));
    assert_eq!(insert.body.as_ref().unwrap()[0]["status"], "todo");

    let tasks = backend.list_tasks(owner).await.unwrap();
    assert_eq!(tasks.len(), 1);
    let list = &seen(&state, "list")[0];
    assert_eq!(list.query["select"], "*");
    assert_eq!(list.query["user_id"], format!("eq.{owner}"));

    let updated = backend
        .update_status(&created.id, TaskStatus::Completed)
        .await
        .unwrap();
    assert_eq!(updated.status, TaskStatus::Completed);
    let patch = &seen(&state, "patch")[0];
    assert_eq!(patch.query["id"], "eq.1");
    assert_eq!(patch.body.as_ref().unwrap(), &json!({ "status": "completed" }));

    let mut edit = draft.clone();
    edit.user_id = None;
    edit.title = "Write Docs".to_string();
    edit.status = TaskStatus::Completed;
    let edited = backend.update_task(&created.id, &edit).await.unwrap();
    assert_eq!(edited.title, "Write Docs");
    assert!(seen(&state, "patch")[1].body.as_ref().unwrap().get("user_id").is_none());

    backend.delete_task(&created.id).await.unwrap();
    assert_eq!(seen(&state, "delete")[0].query["id"], "eq.1");
    assert!(backend.list_tasks(owner).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_of_missing_row_reports_missing_row() {
    let (_state, backend) = setup().await;
    backend.sign_in(&credentials(PASSWORD)).await.unwrap();
    let err = backend
        .update_status(&TaskId::new("99"), TaskStatus::Todo)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::MissingRow(ref id) if id.as_str() == "99"));
}

#[tokio::test]
async fn row_calls_without_session_fail_locally() {
    let (state, backend) = setup().await;
    let err = backend.list_tasks(UserId::new()).await.unwrap_err();
    assert!(matches!(err, BackendError::NoSession));
    assert!(seen(&state, "list").is_empty());
}

#[tokio::test]
async fn recovery_link_tokens_establish_session() {
    let (state, backend) = setup().await;
    let mut rx = backend.subscribe();

    backend
        .request_password_reset(EMAIL, "http://localhost:5173/reset-password")
        .await
        .unwrap();
    let recover = &seen(&state, "recover")[0];
    assert_eq!(recover.query["redirect_to"], "http://localhost:5173/reset-password");
    assert_eq!(recover.body.as_ref().unwrap()["email"], EMAIL);

    // Forged tokens are rejected.
    assert!(backend.set_session("forged", "forged").await.is_err());

    // Tokens the service issued are accepted.
    let issued = issue(&state);
    let access = issued["access_token"].as_str().unwrap();
    let refresh = issued["refresh_token"].as_str().unwrap();
    let session = backend.set_session(access, refresh).await.unwrap();
    assert_eq!(session.user.email.as_deref(), Some(EMAIL));
    assert_eq!(rx.recv().await.unwrap().event, AuthEvent::PasswordRecovery);

    backend.update_password("newsecret").await.unwrap();
    let put = &seen(&state, "put user")[0];
    assert_eq!(put.bearer.as_deref(), Some(access));
    assert_eq!(put.body.as_ref().unwrap()["password"], "newsecret");
    assert_eq!(rx.recv().await.unwrap().event, AuthEvent::UserUpdated);
}

#[tokio::test]
async fn password_update_without_session_reports_expiry() {
    let (state, backend) = setup().await;

    let feedback = reset::submit_new_password(&backend, "newsecret", "newsecret").await;
    assert_eq!(
        feedback.message,
        "Your session has expired. Please request a new password reset."
    );
    let redirect = feedback.redirect.expect("redirect");
    assert_eq!(redirect.to, Route::Login);
    assert_eq!(redirect.after, Duration::from_secs(3));
    assert!(seen(&state, "put user").is_empty());
}

#[tokio::test]
async fn password_update_after_rejected_refresh_reports_expiry() {
    let state = Shared::default();
    let url = start_service(Arc::clone(&state)).await;
    let store = temp_store();

    let backend = rest(&url).with_store(store.clone());
    backend.sign_in(&credentials(PASSWORD)).await.unwrap();
    let mut stale = store.load_session().unwrap();
    stale.expires_at = Some(0);
    stale.refresh_token = "revoked".to_string();
    store.save_session(&stale).unwrap();

    // A restarted client finds the stale session, and its refresh is refused.
    let restarted = rest(&url).with_store(store.clone());
    assert!(restarted.restore_session().await.unwrap().is_none());

    let feedback = reset::submit_new_password(&restarted, "newsecret", "newsecret").await;
    assert_eq!(feedback.redirect.map(|r| r.to), Some(Route::Login));
    assert!(seen(&state, "put user").is_empty());
}
