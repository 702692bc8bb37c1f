//! Create/edit form buffer.

use chrono::NaiveDate;
use taskflow_proto::task::{Priority, Task, TaskId};

use super::TaskError;
use super::manager::validate_title;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whether the form creates a task or edits an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    /// New task.
    Create,
    /// Edit of the task with this id.
    Edit(TaskId),
}

/// Focusable form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    /// Title text.
    Title,
    /// Description text.
    Description,
    /// Priority selector.
    Priority,
    /// Due date text (`YYYY-MM-DD`).
    DueDate,
    /// Category text.
    Category,
}

impl FormField {
    /// Fields in tab order.
    pub const ALL: [Self; 5] = [
        Self::Title,
        Self::Description,
        Self::Priority,
        Self::DueDate,
        Self::Category,
    ];

    /// Field label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Description => "Description",
            Self::Priority => "Priority",
            Self::DueDate => "Due Date",
            Self::Category => "Category",
        }
    }

    const fn next(self) -> Self {
        match self {
            Self::Title => Self::Description,
            Self::Description => Self::Priority,
            Self::Priority => Self::DueDate,
            Self::DueDate => Self::Category,
            Self::Category => Self::Title,
        }
    }

    const fn prev(self) -> Self {
        match self {
            Self::Title => Self::Category,
            Self::Description => Self::Title,
            Self::Priority => Self::Description,
            Self::DueDate => Self::Priority,
            Self::Category => Self::DueDate,
        }
    }
}

/// Parsed, validated form content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    /// Trimmed, non-empty title.
    pub title: String,
    /// Description, possibly empty.
    pub description: String,
    /// Priority.
    pub priority: Priority,
    /// Due date, if entered.
    pub due_date: Option<NaiveDate>,
    /// Category, if entered.
    pub category: Option<String>,
}

/// Text buffer behind the task form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    mode: FormMode,
    focus: FormField,
    title: String,
    description: String,
    priority: Priority,
    due_date: String,
    category: String,
}

impl TaskForm {
    /// Blank form for a new task; priority starts at medium.
    #[must_use]
    pub fn create() -> Self {
        Self {
            mode: FormMode::Create,
            focus: FormField::Title,
            title: String::new(),
            description: String::new(),
            priority: Priority::Medium,
            due_date: String::new(),
            category: String::new(),
        }
    }

    /// Form prefilled from `task`.
    #[must_use]
    pub fn edit(task: &Task) -> Self {
        Self {
            mode: FormMode::Edit(task.id.clone()),
            focus: FormField::Title,
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            due_date: task
                .due_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            category: task.category.clone().unwrap_or_default(),
        }
    }

    /// Create or edit.
    #[must_use]
    pub const fn mode(&self) -> &FormMode {
        &self.mode
    }

    /// Focused field.
    #[must_use]
    pub const fn focus(&self) -> FormField {
        self.focus
    }

    /// Moves focus to the next field, wrapping.
    pub const fn focus_next(&mut self) {
        self.focus = self.focus.next();
    }

    /// Moves focus to the previous field, wrapping.
    pub const fn focus_prev(&mut self) {
        self.focus = self.focus.prev();
    }

    /// Current priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Steps the priority `low -> medium -> high -> low`.
    pub const fn cycle_priority(&mut self) {
        self.priority = self.priority.cycle();
    }

    /// Displayed text of `field`.
    #[must_use]
    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Title => &self.title,
            FormField::Description => &self.description,
            FormField::Priority => self.priority.label(),
            FormField::DueDate => &self.due_date,
            FormField::Category => &self.category,
        }
    }

    fn buffer_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::Priority => None,
            FormField::DueDate => Some(&mut self.due_date),
            FormField::Category => Some(&mut self.category),
        }
    }

    /// Types `c` into the focused field. On the priority field, a space
    /// cycles the priority instead.
    pub fn insert_char(&mut self, c: char) {
        match self.buffer_mut() {
            Some(buf) => buf.push(c),
            None if c == ' ' => self.cycle_priority(),
            None => {}
        }
    }

    /// Deletes the last character of the focused field.
    pub fn backspace(&mut self) {
        if let Some(buf) = self.buffer_mut() {
            buf.pop();
        }
    }

    /// Validates and parses the form.
    ///
    /// # Errors
    ///
    /// Returns a title error, or [`TaskError::InvalidDate`] if the due date
    /// is neither empty nor `YYYY-MM-DD`.
    pub fn submit(&self) -> Result<TaskFields, TaskError> {
        let title = validate_title(&self.title)?;

        let due = self.due_date.trim();
        let due_date = if due.is_empty() {
            None
        } else {
            Some(
                NaiveDate::parse_from_str(due, DATE_FORMAT)
                    .map_err(|_| TaskError::InvalidDate(due.to_string()))?,
            )
        };

        let category = self.category.trim();
        Ok(TaskFields {
            title,
            description: self.description.clone(),
            priority: self.priority,
            due_date,
            category: (!category.is_empty()).then(|| category.to_string()),
        })
    }
}
