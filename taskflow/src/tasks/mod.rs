//! The signed-in user's tasks.
//!
//! [`TaskManager`] caches the rows fetched from the backend and turns form
//! input into insert/update payloads. [`view`] derives what the dashboard
//! shows from that cache; [`form`] holds the create/edit form buffer.

pub mod form;
pub mod manager;
pub mod view;

pub use form::{FormField, FormMode, TaskFields, TaskForm};
pub use manager::TaskManager;
pub use view::{StatusFilter, TaskStats, TaskView, derive_view, visible_tasks};

use thiserror::Error;

/// Errors from local task validation and cache lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// Task title cannot be empty.
    #[error("task title cannot be empty")]
    TitleEmpty,
    /// Task title exceeds the maximum length.
    #[error("task title too long (max 256 characters)")]
    TitleTooLong,
    /// No cached task has the given id.
    #[error("task not found: {0}")]
    TaskNotFound(String),
    /// Due date is not a `YYYY-MM-DD` calendar date.
    #[error("invalid due date {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),
    /// The operation needs a signed-in user.
    #[error("sign in to manage tasks")]
    NotSignedIn,
}
