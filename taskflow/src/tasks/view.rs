//! Dashboard view-model: the filtered task list and aggregate counts.
//!
//! Everything here is a pure function of the cached task list, the status
//! filter and the search query. The UI recomputes it on every draw.

use std::fmt;
use std::str::FromStr;

use taskflow_proto::task::{ParseEnumError, Task, TaskStatus};

/// Status filter selected on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum StatusFilter {
    /// No status restriction.
    #[default]
    All,
    /// Only tasks with [`TaskStatus::Todo`].
    Todo,
    /// Only tasks with [`TaskStatus::InProgress`].
    InProgress,
    /// Only tasks with [`TaskStatus::Completed`].
    Completed,
}

impl StatusFilter {
    /// All filters in the order the dashboard cycles through them.
    pub const ALL: [Self; 4] = [Self::All, Self::Todo, Self::InProgress, Self::Completed];

    /// Whether a task with `status` passes this filter.
    #[must_use]
    pub const fn matches(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Todo => matches!(status, TaskStatus::Todo),
            Self::InProgress => matches!(status, TaskStatus::InProgress),
            Self::Completed => matches!(status, TaskStatus::Completed),
        }
    }

    /// The next filter, wrapping back to [`StatusFilter::All`].
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::All => Self::Todo,
            Self::Todo => Self::InProgress,
            Self::InProgress => Self::Completed,
            Self::Completed => Self::All,
        }
    }

    /// Filter value as spelled in the status select (`all`, `todo`, ...).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Todo => "todo",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }

    /// Label shown in the filter selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All Tasks",
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
        }
    }
}

impl From<TaskStatus> for StatusFilter {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Todo => Self::Todo,
            TaskStatus::InProgress => Self::InProgress,
            TaskStatus::Completed => Self::Completed,
        }
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusFilter {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Self::All);
        }
        s.parse::<TaskStatus>().map(Self::from)
    }
}

/// Aggregate counts over the full, unfiltered task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Number of tasks.
    pub total: usize,
    /// Tasks with status `completed`.
    pub completed: usize,
    /// Tasks with status `in-progress`.
    pub in_progress: usize,
    /// Tasks with status `todo`.
    pub todo: usize,
}

impl TaskStats {
    /// Counts tasks by status in a single pass.
    #[must_use]
    pub fn from_tasks(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut stats, task| {
            stats.total += 1;
            match task.status {
                TaskStatus::Todo => stats.todo += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Completed => stats.completed += 1,
            }
            stats
        })
    }

    /// Share of completed tasks as a whole percentage, rounded half up.
    ///
    /// Zero when there are no tasks.
    #[must_use]
    pub const fn completion_rate(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        (200 * self.completed + self.total) / (2 * self.total)
    }
}

/// Normalizes a raw search query: trimmed and lowercased.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Whether `task` matches an already-normalized query.
///
/// An empty query matches everything.
#[must_use]
pub fn matches_query(task: &Task, normalized_query: &str) -> bool {
    normalized_query.is_empty() || task.search_haystack().contains(normalized_query)
}

/// The subsequence of `tasks` passing both the status filter and the query.
///
/// Order is preserved.
#[must_use]
pub fn visible_tasks<'a>(tasks: &'a [Task], filter: StatusFilter, query: &str) -> Vec<&'a Task> {
    let query = normalize_query(query);
    tasks
        .iter()
        .filter(|task| filter.matches(task.status) && matches_query(task, &query))
        .collect()
}

/// Everything the dashboard renders from the task cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView<'a> {
    /// Tasks to list, in fetch order.
    pub visible: Vec<&'a Task>,
    /// Counts over all tasks, regardless of filter or query.
    pub stats: TaskStats,
}

/// Derives the dashboard view from the full task list.
#[must_use]
pub fn derive_view<'a>(tasks: &'a [Task], filter: StatusFilter, query: &str) -> TaskView<'a> {
    TaskView {
        visible: visible_tasks(tasks, filter, query),
        stats: TaskStats::from_tasks(tasks),
    }
}
