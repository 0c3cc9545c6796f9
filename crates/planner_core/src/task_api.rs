use crate::calendar::{self, CalendarEvent, Toolbar};
use crate::error::AppError;
use crate::model::{Task, TaskDraft, TaskId};
use crate::notify::Notifier;
use crate::remote::TaskRemote;
use crate::scheduler::{search, sorted_future_tasks, validate};
use crate::session::{EditSession, SaveOutcome, TaskForm};
use crate::storage::json_store::{self, JsonStore};
use log::info;
use time::{Date, OffsetDateTime, Time, UtcOffset};

/// Field changes requested for an existing task. `None` keeps the current
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEdits {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub color: Option<String>,
    pub date: Option<Date>,
    pub start_time: Option<Time>,
    pub end_time: Option<Time>,
}

impl TaskEdits {
    pub fn apply_to(&self, form: &mut TaskForm) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            form.title = title.clone();
        }
        if let Some(description) = &self.description {
            form.description = description.clone();
        }
        if let Some(status) = &self.status {
            form.status = status.clone();
        }
        if let Some(color) = &self.color {
            form.color = color.clone();
        }
        if let Some(date) = self.date {
            form.date = date;
        }
        if let Some(start_time) = self.start_time {
            form.set_start_time(start_time);
        }
        if let Some(end_time) = self.end_time
            && !form.set_end_time(end_time)
        {
            return Err(AppError::invalid_input(
                "end time can not be before start time",
            ));
        }
        Ok(())
    }
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_utc().to_offset(local_offset())
}

pub fn open_store() -> Result<JsonStore, AppError> {
    Ok(JsonStore::new(json_store::store_path()?, local_offset()))
}

pub fn add_task(draft: &TaskDraft) -> Result<Task, AppError> {
    add_task_with_remote(&open_store()?, draft, now())
}

pub fn list_upcoming() -> Result<Vec<Task>, AppError> {
    list_upcoming_with_remote(&open_store()?, now())
}

pub fn all_tasks() -> Result<Vec<Task>, AppError> {
    open_store()?.fetch_tasks()
}

pub fn search_tasks(query: &str) -> Result<Vec<Task>, AppError> {
    search_tasks_with_remote(&open_store()?, query)
}

pub fn get_task(id: TaskId) -> Result<Task, AppError> {
    get_task_with_remote(&open_store()?, id)
}

pub fn calendar_events(toolbar: &Toolbar) -> Result<Vec<CalendarEvent>, AppError> {
    calendar_events_with_remote(&open_store()?, toolbar, local_offset())
}

pub fn edit_task(
    id: TaskId,
    edits: &TaskEdits,
    notifier: &dyn Notifier,
) -> Result<SaveOutcome, AppError> {
    edit_task_with_remote(&open_store()?, id, edits, now(), notifier)
}

pub fn delete_task(id: TaskId, notifier: &dyn Notifier) -> Result<(), AppError> {
    delete_task_with_remote(&open_store()?, id, now().offset(), notifier)
}

/// Validates `draft` against the remote's current tasks and creates it.
pub fn add_task_with_remote(
    remote: &dyn TaskRemote,
    draft: &TaskDraft,
    now: OffsetDateTime,
) -> Result<Task, AppError> {
    draft.check_fields()?;
    let existing = remote.fetch_tasks()?;
    validate(draft, &existing, now)?;

    let task = remote.create_task(draft)?;
    info!("event=task_add module=task_api status=ok id={}", task.id);
    Ok(task)
}

pub fn list_upcoming_with_remote(
    remote: &dyn TaskRemote,
    now: OffsetDateTime,
) -> Result<Vec<Task>, AppError> {
    Ok(sorted_future_tasks(&remote.fetch_tasks()?, now))
}

pub fn search_tasks_with_remote(
    remote: &dyn TaskRemote,
    query: &str,
) -> Result<Vec<Task>, AppError> {
    Ok(search(&remote.fetch_tasks()?, query))
}

pub fn get_task_with_remote(remote: &dyn TaskRemote, id: TaskId) -> Result<Task, AppError> {
    remote.fetch_task(id)
}

pub fn calendar_events_with_remote(
    remote: &dyn TaskRemote,
    toolbar: &Toolbar,
    offset: UtcOffset,
) -> Result<Vec<CalendarEvent>, AppError> {
    calendar::events(&remote.fetch_tasks()?, toolbar, offset)
}

pub fn edit_task_with_remote(
    remote: &dyn TaskRemote,
    id: TaskId,
    edits: &TaskEdits,
    now: OffsetDateTime,
    notifier: &dyn Notifier,
) -> Result<SaveOutcome, AppError> {
    let mut session = EditSession::new(now.offset());
    session.load(remote, id, notifier)?;

    let form = session
        .form_mut()
        .ok_or_else(|| AppError::invalid_input("task could not be opened"))?;
    edits.apply_to(form)?;

    session.save(remote, now, notifier)
}

pub fn delete_task_with_remote(
    remote: &dyn TaskRemote,
    id: TaskId,
    offset: UtcOffset,
    notifier: &dyn Notifier,
) -> Result<(), AppError> {
    let mut session = EditSession::new(offset);
    session.load(remote, id, notifier)?;
    session.delete(remote, notifier)
}
