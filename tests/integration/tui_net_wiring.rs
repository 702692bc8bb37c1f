//! Integration tests for the TUI ↔ background worker wiring.
//!
//! Drives `App` with real key events and pumps every command through
//! `net::spawn_net` backed by the in-memory backend, applying each
//! resulting `NetEvent` exactly as the main loop does.
//!
//! These tests validate:
//! - Signing in from the login screen lands on the dashboard with the
//!   user's own tasks loaded
//! - Adding, advancing and deleting a task round-trips through the worker
//! - A failed insert keeps the form open and shows the error
//! - Signing out clears the cache and returns to login

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use taskflow::app::App;
use taskflow::auth::Tone;
use taskflow::backend::memory::MemoryBackend;
use taskflow::net::{self, NetCommand, NetEvent};
use taskflow::session::Route;
use taskflow_proto::task::{Priority, TaskDraft, TaskStatus};
use tokio::sync::mpsc;

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "secret1";
const WAIT: Duration = Duration::from_secs(5);

/// App plus the worker's channel ends.
struct Harness {
    app: App,
    cmd_tx: mpsc::Sender<NetCommand>,
    evt_rx: mpsc::Receiver<NetEvent>,
}

impl Harness {
    fn start(backend: &Arc<MemoryBackend>) -> Self {
        let (cmd_tx, evt_rx) = net::spawn_net(Arc::clone(backend), "http://localhost:5173".into(), 32);
        let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        Self {
            app: App::new(today),
            cmd_tx,
            evt_rx,
        }
    }

    async fn send(&self, cmd: Option<NetCommand>) {
        if let Some(cmd) = cmd {
            self.cmd_tx.send(cmd).await.expect("worker alive");
        }
    }

    async fn press(&mut self, code: KeyCode) {
        let cmd = self.app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
        self.send(cmd).await;
    }

    async fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            self.press(KeyCode::Char(c)).await;
        }
    }

    /// Applies worker events, forwarding follow-up commands, until `done`.
    async fn settle(&mut self, done: impl Fn(&App) -> bool) {
        while !done(&self.app) {
            let event = tokio::time::timeout(WAIT, self.evt_rx.recv())
                .await
                .expect("timed out waiting for worker")
                .expect("worker channel closed");
            let follow_up = self.app.apply_net_event(event, Instant::now());
            self.send(follow_up).await;
        }
    }

    async fn sign_in(&mut self, expected_tasks: usize) {
        self.press(KeyCode::F(3)).await;
        assert_eq!(self.app.route(), &Route::Login);
        self.type_text(EMAIL).await;
        self.press(KeyCode::Tab).await;
        self.type_text(PASSWORD).await;
        self.press(KeyCode::Enter).await;
        assert!(self.app.busy);

        self.settle(|app| {
            app.route() == &Route::Dashboard
                && !app.busy
                && !app.loading
                && app.tasks.tasks().len() == expected_tasks
        })
        .await;
    }
}

fn draft(title: &str, status: TaskStatus) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: String::new(),
        priority: Priority::Medium,
        status,
        due_date: None,
        category: None,
        user_id: None,
    }
}

#[tokio::test]
async fn sign_in_loads_own_tasks_on_dashboard() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = backend.add_account(EMAIL, PASSWORD);
    let other = backend.add_account("bob@example.com", "hunter22");
    backend.seed_task(owner, draft("Write Documentation", TaskStatus::Todo));
    backend.seed_task(owner, draft("Review PRs", TaskStatus::Completed));
    backend.seed_task(other, draft("Not mine", TaskStatus::Todo));

    let mut h = Harness::start(&backend);
    h.sign_in(2).await;

    assert_eq!(h.app.auth.email(), Some(EMAIL));
    assert!(h.app.credentials.second.is_empty(), "password is not kept");
    let stats = h.app.view().stats;
    assert_eq!((stats.total, stats.completed, stats.todo), (2, 1, 1));
    assert_eq!(h.app.notice.as_ref().unwrap().text, "Logged in successfully!");
}

#[tokio::test]
async fn add_advance_and_delete_through_keys() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_account(EMAIL, PASSWORD);
    let mut h = Harness::start(&backend);
    h.sign_in(0).await;

    h.press(KeyCode::Char('n')).await;
    assert!(h.app.form.is_some());
    h.type_text("Ship release").await;
    h.press(KeyCode::Enter).await;
    h.settle(|app| app.form.is_none()).await;

    let task = h.app.selected_task().unwrap().clone();
    assert_eq!(task.title, "Ship release");
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(backend.all_rows().len(), 1);

    h.press(KeyCode::Enter).await;
    h.settle(|app| app.tasks.get(&task.id).unwrap().status == TaskStatus::InProgress)
        .await;

    h.press(KeyCode::Char('3')).await;
    h.settle(|app| app.tasks.get(&task.id).unwrap().status == TaskStatus::Completed)
        .await;
    assert_eq!(h.app.view().stats.completed, 1);

    h.press(KeyCode::Char('d')).await;
    h.settle(|app| app.tasks.tasks().is_empty()).await;
    assert!(backend.all_rows().is_empty());
    assert!(h.app.selected_task().is_none());
}

#[tokio::test]
async fn failed_insert_keeps_form_open() {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_account(EMAIL, PASSWORD);
    let mut h = Harness::start(&backend);
    h.sign_in(0).await;

    backend.fail_next("insert failed");
    h.press(KeyCode::Char('n')).await;
    h.type_text("Doomed").await;
    h.press(KeyCode::Enter).await;
    h.settle(|app| app.notice.as_ref().is_some_and(|n| n.tone == Tone::Error))
        .await;

    assert_eq!(
        h.app.notice.as_ref().unwrap().text,
        "Could not add task: insert failed"
    );
    assert!(h.app.form.is_some());
    assert!(h.app.tasks.tasks().is_empty());
}

#[tokio::test]
async fn sign_out_clears_cache_and_returns_to_login() {
    let backend = Arc::new(MemoryBackend::new());
    let owner = backend.add_account(EMAIL, PASSWORD);
    backend.seed_task(owner, draft("Private", TaskStatus::Todo));
    let mut h = Harness::start(&backend);
    h.sign_in(1).await;

    h.press(KeyCode::F(3)).await;
    h.settle(|app| !app.busy && !app.auth.is_signed_in()).await;

    assert_eq!(h.app.route(), &Route::Login);
    assert!(h.app.tasks.tasks().is_empty());
    assert!(h.app.form.is_none());

    // The dashboard is closed to anonymous users.
    h.press(KeyCode::F(1)).await;
    assert_eq!(h.app.route(), &Route::Login);
}
