use crate::error::AppError;
use time::OffsetDateTime;

pub type TaskId = i64;

pub const DEFAULT_COLOR: &str = "#000ff3";
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// A scheduled task occupying the half-open interval `[start_date, due_date)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: String,
    pub color: String,
    pub start_date: OffsetDateTime,
    pub due_date: OffsetDateTime,
}

/// A task that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub status: String,
    pub color: String,
    pub start_date: OffsetDateTime,
    pub due_date: OffsetDateTime,
}

/// Anything that can be checked against the existing schedule.
///
/// `task_id` is `None` for drafts, so a draft is compared against every
/// existing task while an edited task skips its own previous version.
pub trait Schedulable {
    fn task_id(&self) -> Option<TaskId>;
    fn start_date(&self) -> OffsetDateTime;
    fn due_date(&self) -> OffsetDateTime;
}

impl Schedulable for Task {
    fn task_id(&self) -> Option<TaskId> {
        Some(self.id)
    }

    fn start_date(&self) -> OffsetDateTime {
        self.start_date
    }

    fn due_date(&self) -> OffsetDateTime {
        self.due_date
    }
}

impl Schedulable for TaskDraft {
    fn task_id(&self) -> Option<TaskId> {
        None
    }

    fn start_date(&self) -> OffsetDateTime {
        self.start_date
    }

    fn due_date(&self) -> OffsetDateTime {
        self.due_date
    }
}

impl Task {
    pub fn from_draft(id: TaskId, draft: TaskDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            status: draft.status,
            color: draft.color,
            start_date: draft.start_date,
            due_date: draft.due_date,
        }
    }
}

impl TaskDraft {
    pub fn check_fields(&self) -> Result<(), AppError> {
        check_fields(&self.title, &self.description)
    }
}

pub fn check_fields(title: &str, description: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(AppError::invalid_input(format!(
            "description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}

/// Sparse update payload: the id plus every field that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialTask {
    pub id: TaskId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub color: Option<String>,
    pub start_date: Option<OffsetDateTime>,
    pub due_date: Option<OffsetDateTime>,
}

impl PartialTask {
    pub fn new(id: TaskId) -> Self {
        Self {
            id,
            title: None,
            description: None,
            status: None,
            color: None,
            start_date: None,
            due_date: None,
        }
    }

    /// True when the patch carries nothing but the id.
    pub fn is_noop(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.color.is_none()
            && self.start_date.is_none()
            && self.due_date.is_none()
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("Title");
        }
        if self.description.is_some() {
            fields.push("Description");
        }
        if self.status.is_some() {
            fields.push("Status");
        }
        if self.color.is_some() {
            fields.push("Color");
        }
        if self.start_date.is_some() {
            fields.push("StartDate");
        }
        if self.due_date.is_some() {
            fields.push("DueDate");
        }
        fields
    }

    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = &self.status {
            task.status = status.clone();
        }
        if let Some(color) = &self.color {
            task.color = color.clone();
        }
        if let Some(start_date) = self.start_date {
            task.start_date = start_date;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}
