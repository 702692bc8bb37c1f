//! Background worker wiring the TUI to the async backend.
//!
//! This module bridges the synchronous TUI event loop (crossterm poll-based)
//! with a [`Backend`]. It spawns background tokio tasks and communicates
//! with the main thread via [`NetCommand`] / [`NetEvent`] channels.
//!
//! # Architecture
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ───  tokio background tasks
//!                     ─── NetCommand →
//! ```
//!
//! Commands are executed one at a time, in the order sent, so results
//! arrive in issue order. Session changes are forwarded by a separate task
//! as they happen.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use taskflow_proto::auth::UserId;
use taskflow_proto::task::{Task, TaskDraft, TaskId, TaskStatus};

use crate::auth::{self, Feedback, LinkParams, forgot, reset, verify};
use crate::backend::{Backend, SessionChange};

/// Commands sent from the TUI main loop to the background worker.
#[derive(Debug)]
pub enum NetCommand {
    /// Restore the saved session, if any.
    RestoreSession,
    /// Sign in with email and password.
    SignIn {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Create an account.
    SignUp {
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Sign out.
    SignOut,
    /// Confirm an email from a verification link.
    VerifyEmail(LinkParams),
    /// Prepare the reset screen from an optional reset link.
    OpenResetLink(Option<LinkParams>),
    /// Send a password-reset email.
    RequestPasswordReset {
        /// Address to send to.
        email: String,
    },
    /// Set a new password.
    UpdatePassword {
        /// New password.
        password: String,
        /// Repeated new password.
        confirmation: String,
    },
    /// Fetch every task owned by `owner`.
    FetchTasks {
        /// Owner to fetch for.
        owner: UserId,
    },
    /// Insert a task.
    CreateTask(TaskDraft),
    /// Replace a task's editable fields.
    UpdateTask {
        /// Task to update.
        id: TaskId,
        /// New field values.
        draft: TaskDraft,
    },
    /// Change a task's status.
    SetStatus {
        /// Task to update.
        id: TaskId,
        /// New status.
        status: TaskStatus,
    },
    /// Delete a task.
    DeleteTask(TaskId),
    /// Gracefully shut down the worker.
    Shutdown,
}

/// Events sent from the background worker to the TUI main loop.
#[derive(Debug)]
pub enum NetEvent {
    /// The session changed.
    Session(SessionChange),
    /// An account flow finished.
    Auth(Feedback),
    /// The reset screen is ready (`None`) or cannot be used.
    ResetLinkChecked(Option<Feedback>),
    /// A fetch finished.
    TasksLoaded {
        /// Owner the tasks were fetched for.
        owner: UserId,
        /// Rows in service order.
        tasks: Vec<Task>,
    },
    /// A task was inserted.
    TaskInserted(Task),
    /// A task was updated.
    TaskUpdated(Task),
    /// A task was deleted.
    TaskDeleted(TaskId),
    /// A task call failed; prior state is untouched.
    TaskFailed {
        /// What was attempted.
        action: &'static str,
        /// Backend message.
        message: String,
    },
}

/// Spawn the background worker and return channel handles.
///
/// Spawns two tasks on the current tokio runtime:
///
/// 1. A **command handler** that executes [`NetCommand`]s against the
///    backend, one at a time.
/// 2. A **session forwarder** that relays backend session changes as
///    [`NetEvent::Session`].
///
/// `site_url` is the app's public URL; password-reset emails link below it.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn_net<B: Backend>(
    backend: Arc<B>,
    site_url: String,
    channel_capacity: usize,
) -> (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::channel::<NetCommand>(channel_capacity);
    let (evt_tx, evt_rx) = mpsc::channel::<NetEvent>(channel_capacity);

    // Subscribe before any command runs so no change is missed.
    let changes = backend.subscribe();
    let fwd_tx = evt_tx.clone();
    tokio::spawn(async move {
        session_forwarder(changes, fwd_tx).await;
    });

    tokio::spawn(async move {
        command_handler(backend, site_url, cmd_rx, evt_tx).await;
    });

    (cmd_tx, evt_rx)
}

/// Background task: execute commands from the TUI main loop.
async fn command_handler<B: Backend>(
    backend: Arc<B>,
    site_url: String,
    mut cmd_rx: mpsc::Receiver<NetCommand>,
    evt_tx: mpsc::Sender<NetEvent>,
) {
    while let Some(cmd) = cmd_rx.recv().await {
        if matches!(cmd, NetCommand::Shutdown) {
            tracing::info!("net command handler shutting down");
            break;
        }
        let Some(event) = execute(backend.as_ref(), &site_url, cmd).await else {
            continue;
        };
        if evt_tx.send(event).await.is_err() {
            // TUI dropped; exit.
            break;
        }
    }
}

/// Runs one command and produces the event reporting its result.
async fn execute<B: Backend>(backend: &B, site_url: &str, cmd: NetCommand) -> Option<NetEvent> {
    let event = match cmd {
        NetCommand::RestoreSession => {
            if let Err(e) = backend.restore_session().await {
                tracing::warn!(error = %e, "session restore failed");
            }
            // The outcome arrives as a session change.
            return None;
        }
        NetCommand::SignIn { email, password } => {
            NetEvent::Auth(auth::sign_in(backend, &email, &password).await)
        }
        NetCommand::SignUp { email, password } => {
            NetEvent::Auth(auth::sign_up(backend, &email, &password).await)
        }
        NetCommand::SignOut => NetEvent::Auth(auth::sign_out(backend).await),
        NetCommand::VerifyEmail(link) => NetEvent::Auth(verify::verify_email(backend, &link).await),
        NetCommand::OpenResetLink(link) => {
            NetEvent::ResetLinkChecked(reset::open_reset_link(backend, link.as_ref()).await)
        }
        NetCommand::RequestPasswordReset { email } => {
            NetEvent::Auth(forgot::request_reset(backend, &email, site_url).await)
        }
        NetCommand::UpdatePassword {
            password,
            confirmation,
        } => NetEvent::Auth(reset::submit_new_password(backend, &password, &confirmation).await),
        NetCommand::FetchTasks { owner } => match backend.list_tasks(owner).await {
            Ok(tasks) => NetEvent::TasksLoaded { owner, tasks },
            Err(e) => task_failed("fetch tasks", &e),
        },
        NetCommand::CreateTask(draft) => match backend.insert_task(&draft).await {
            Ok(task) => NetEvent::TaskInserted(task),
            Err(e) => task_failed("add task", &e),
        },
        NetCommand::UpdateTask { id, draft } => match backend.update_task(&id, &draft).await {
            Ok(task) => NetEvent::TaskUpdated(task),
            Err(e) => task_failed("update task", &e),
        },
        NetCommand::SetStatus { id, status } => match backend.update_status(&id, status).await {
            Ok(task) => NetEvent::TaskUpdated(task),
            Err(e) => task_failed("update status", &e),
        },
        NetCommand::DeleteTask(id) => match backend.delete_task(&id).await {
            Ok(()) => NetEvent::TaskDeleted(id),
            Err(e) => task_failed("delete task", &e),
        },
        NetCommand::Shutdown => return None,
    };
    Some(event)
}

fn task_failed(action: &'static str, error: &impl std::fmt::Display) -> NetEvent {
    tracing::warn!(action, error = %error, "task call failed");
    NetEvent::TaskFailed {
        action,
        message: error.to_string(),
    }
}

/// Background task: forward session changes to the TUI.
async fn session_forwarder(
    mut changes: broadcast::Receiver<SessionChange>,
    evt_tx: mpsc::Sender<NetEvent>,
) {
    loop {
        match changes.recv().await {
            Ok(change) => {
                if evt_tx.send(NetEvent::Session(change)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "session forwarder lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
