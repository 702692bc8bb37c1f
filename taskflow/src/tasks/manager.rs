//! Cached task list for the signed-in user.
//!
//! The cache changes only when a backend round trip resolves: a fetch
//! replaces it wholesale, an insert appends the returned row, an update
//! replaces the row with the same id, and a delete removes it. Failed
//! calls never reach this type, so they leave the cache as it was.

use taskflow_proto::auth::UserId;
use taskflow_proto::task::{MAX_TASK_TITLE_LENGTH, Task, TaskDraft, TaskId, TaskStatus};

use super::TaskError;
use super::form::TaskFields;

/// Owner-scoped cache of tasks in fetch order.
#[derive(Debug, Clone, Default)]
pub struct TaskManager {
    tasks: Vec<Task>,
    owner: Option<UserId>,
}

impl TaskManager {
    /// Creates an empty cache with no owner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached tasks in fetch order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Owner the cache was last filled for.
    #[must_use]
    pub const fn owner(&self) -> Option<UserId> {
        self.owner
    }

    /// Looks up a cached task.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Replaces the whole cache with a fresh fetch for `owner`.
    pub fn replace_all(&mut self, owner: UserId, tasks: Vec<Task>) {
        tracing::debug!(%owner, count = tasks.len(), "task cache replaced");
        self.owner = Some(owner);
        self.tasks = tasks;
    }

    /// Empties the cache, e.g. on sign-out.
    pub fn clear(&mut self) {
        self.owner = None;
        self.tasks.clear();
    }

    /// Builds the insert payload for a new task.
    ///
    /// New tasks always start as [`TaskStatus::Todo`] and belong to the
    /// cache owner.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::NotSignedIn`] without an owner, or a title
    /// validation error.
    pub fn build_insert(&self, fields: TaskFields) -> Result<TaskDraft, TaskError> {
        let owner = self.owner.ok_or(TaskError::NotSignedIn)?;
        let title = validate_title(&fields.title)?;
        Ok(TaskDraft {
            title,
            description: fields.description,
            priority: fields.priority,
            status: TaskStatus::Todo,
            due_date: fields.due_date,
            category: fields.category,
            user_id: Some(owner),
        })
    }

    /// Builds the update payload for an edit of task `id`.
    ///
    /// The edit form does not touch status, so the cached status is sent
    /// back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::TaskNotFound`] if `id` is not cached, or a
    /// title validation error.
    pub fn build_update(&self, id: &TaskId, fields: TaskFields) -> Result<TaskDraft, TaskError> {
        let existing = self
            .get(id)
            .ok_or_else(|| TaskError::TaskNotFound(id.to_string()))?;
        let title = validate_title(&fields.title)?;
        Ok(TaskDraft {
            title,
            description: fields.description,
            priority: fields.priority,
            status: existing.status,
            due_date: fields.due_date,
            category: fields.category,
            user_id: None,
        })
    }

    /// Appends a row returned by an insert.
    pub fn apply_inserted(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Replaces the cached row with the same id. Unknown ids are ignored.
    pub fn apply_updated(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => tracing::debug!(id = %task.id, "update for uncached task ignored"),
        }
    }

    /// Removes the cached row with `id`.
    pub fn apply_deleted(&mut self, id: &TaskId) {
        self.tasks.retain(|t| &t.id != id);
    }
}

/// Trims a title and checks it is non-empty and within the length limit.
///
/// # Errors
///
/// Returns [`TaskError::TitleEmpty`] or [`TaskError::TitleTooLong`].
pub fn validate_title(title: &str) -> Result<String, TaskError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TaskError::TitleEmpty);
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(TaskError::TitleTooLong);
    }
    Ok(title.to_string())
}
