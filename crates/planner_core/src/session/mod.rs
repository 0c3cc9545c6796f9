//! Edit-session lifecycle for a single task.
//!
//! # Responsibility
//! - Seed an editable form from a fetched task and keep it across refetches
//!   of the same task.
//! - Validate, diff and commit edits through a [`TaskRemote`], one request at
//!   a time.
//! - Report every outcome to a [`Notifier`].
//!
//! # Invariants
//! - At most one save or delete is in flight; the session refuses new
//!   requests while in `Saving` or `Deleting`.
//! - A failed request returns the session to `Open` with the user's edits.
//! - Validation failures never reach the remote.

mod debounce;

pub use debounce::{DEFAULT_SEARCH_DEBOUNCE, DelayedTask, InteractionState};

use crate::error::AppError;
use crate::model::{DEFAULT_COLOR, PartialTask, Task, TaskDraft, TaskId, check_fields};
use crate::notify::{Notice, Notifier, deliver};
use crate::remote::TaskRemote;
use crate::scheduler::{diff, validate};
use log::{debug, info};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Editable fields of a task: one day with a start and an end time on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub color: String,
    pub status: String,
    pub date: Date,
    start_time: Time,
    end_time: Time,
}

impl TaskForm {
    pub fn new<T: Into<String>>(title: T, date: Date, start_time: Time, end_time: Time) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            color: DEFAULT_COLOR.to_string(),
            status: String::new(),
            date,
            start_time,
            end_time,
        }
    }

    pub fn from_task(task: &Task, offset: UtcOffset) -> Self {
        let start = task.start_date.to_offset(offset);
        let due = task.due_date.to_offset(offset);
        let color = if task.color.trim().is_empty() {
            DEFAULT_COLOR.to_string()
        } else {
            task.color.clone()
        };

        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            color,
            status: task.status.clone(),
            date: due.date(),
            start_time: start.time(),
            end_time: due.time(),
        }
    }

    pub fn start_time(&self) -> Time {
        self.start_time
    }

    pub fn end_time(&self) -> Time {
        self.end_time
    }

    /// Sets the start; an end that would precede it is pulled along.
    pub fn set_start_time(&mut self, start_time: Time) {
        self.start_time = start_time;
        if start_time > self.end_time {
            self.end_time = start_time;
        }
    }

    /// Sets the end unless it would precede the start. Returns whether the
    /// value was taken.
    pub fn set_end_time(&mut self, end_time: Time) -> bool {
        if end_time < self.start_time {
            return false;
        }
        self.end_time = end_time;
        true
    }

    fn interval(&self, offset: UtcOffset) -> (OffsetDateTime, OffsetDateTime) {
        (
            PrimitiveDateTime::new(self.date, self.start_time).assume_offset(offset),
            PrimitiveDateTime::new(self.date, self.end_time).assume_offset(offset),
        )
    }

    pub fn to_task(&self, id: TaskId, offset: UtcOffset) -> Result<Task, AppError> {
        let draft = self.to_draft(offset)?;
        Ok(Task::from_draft(id, draft))
    }

    pub fn to_draft(&self, offset: UtcOffset) -> Result<TaskDraft, AppError> {
        check_fields(&self.title, &self.description)?;
        let (start_date, due_date) = self.interval(offset);

        Ok(TaskDraft {
            title: self.title.trim().to_string(),
            description: self.description.clone(),
            status: self.status.clone(),
            color: self.color.clone(),
            start_date,
            due_date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditState {
    Closed,
    Loading { id: TaskId },
    Open { loaded: Task, form: TaskForm },
    Saving { loaded: Task, form: TaskForm },
    Deleting { loaded: Task, form: TaskForm },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveRequest {
    /// Nothing changed; the session closed without a request.
    Unchanged,
    Commit(PartialTask),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Unchanged,
    Saved(Task),
}

#[derive(Debug)]
pub struct EditSession {
    state: EditState,
    offset: UtcOffset,
}

impl EditSession {
    pub fn new(offset: UtcOffset) -> Self {
        Self {
            state: EditState::Closed,
            offset,
        }
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, EditState::Closed)
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            EditState::Saving { .. } | EditState::Deleting { .. }
        )
    }

    pub fn loaded(&self) -> Option<&Task> {
        match &self.state {
            EditState::Open { loaded, .. }
            | EditState::Saving { loaded, .. }
            | EditState::Deleting { loaded, .. } => Some(loaded),
            EditState::Closed | EditState::Loading { .. } => None,
        }
    }

    pub fn form(&self) -> Option<&TaskForm> {
        match &self.state {
            EditState::Open { form, .. }
            | EditState::Saving { form, .. }
            | EditState::Deleting { form, .. } => Some(form),
            EditState::Closed | EditState::Loading { .. } => None,
        }
    }

    /// The form is only editable while no request is in flight.
    pub fn form_mut(&mut self) -> Option<&mut TaskForm> {
        match &mut self.state {
            EditState::Open { form, .. } => Some(form),
            _ => None,
        }
    }

    pub fn open(&mut self, id: TaskId) -> Result<(), AppError> {
        if !self.is_closed() {
            return Err(AppError::invalid_input("an edit session is already open"));
        }
        self.state = EditState::Loading { id };
        Ok(())
    }

    pub fn close(&mut self) -> Result<(), AppError> {
        if self.is_busy() {
            return Err(AppError::invalid_input("a request is already in flight"));
        }
        self.state = EditState::Closed;
        Ok(())
    }

    /// Seeds the form from `task` when it is the one being loaded, or when
    /// it is a different task than the one currently open. Returns whether
    /// the form was (re)seeded.
    pub fn on_fetch_resolved(&mut self, task: Task) -> bool {
        let seed = match &self.state {
            EditState::Loading { id } => *id == task.id,
            EditState::Open { loaded, .. } => loaded.id != task.id,
            _ => false,
        };
        if !seed {
            return false;
        }

        debug!("event=edit_seed module=session status=ok id={}", task.id);
        self.state = EditState::Open {
            form: TaskForm::from_task(&task, self.offset),
            loaded: task,
        };
        true
    }

    pub fn on_fetch_failed(&mut self, err: &AppError, notifier: &dyn Notifier) {
        if matches!(self.state, EditState::Loading { .. }) {
            self.state = EditState::Closed;
            deliver(notifier, Notice::error("Error loading task!", err));
        }
    }

    /// Opens the session on `id` and loads it from `remote`.
    pub fn load(
        &mut self,
        remote: &dyn TaskRemote,
        id: TaskId,
        notifier: &dyn Notifier,
    ) -> Result<(), AppError> {
        self.open(id)?;
        match remote.fetch_task(id) {
            Ok(task) => {
                self.on_fetch_resolved(task);
                Ok(())
            }
            Err(err) => {
                self.on_fetch_failed(&err, notifier);
                Err(err)
            }
        }
    }

    fn ensure_open(&self) -> Result<(), AppError> {
        match self.state {
            EditState::Open { .. } => Ok(()),
            EditState::Saving { .. } | EditState::Deleting { .. } => {
                Err(AppError::invalid_input("a request is already in flight"))
            }
            EditState::Closed | EditState::Loading { .. } => {
                Err(AppError::invalid_input("no task is open for editing"))
            }
        }
    }

    /// Validates the form against `existing` and moves to `Saving` with the
    /// patch to send, or closes when nothing changed.
    pub fn begin_save(
        &mut self,
        now: OffsetDateTime,
        existing: &[Task],
        notifier: &dyn Notifier,
    ) -> Result<SaveRequest, AppError> {
        self.ensure_open()?;
        let EditState::Open { loaded, form } = &self.state else {
            return Err(AppError::invalid_input("no task is open for editing"));
        };

        let checked = form.to_task(loaded.id, self.offset).and_then(|candidate| {
            validate(&candidate, existing, now)?;
            Ok(candidate)
        });
        let candidate = match checked {
            Ok(candidate) => candidate,
            Err(err) => {
                deliver(notifier, Notice::error("Task not saved", &err));
                return Err(err);
            }
        };

        let patch = diff(&candidate, loaded);
        if patch.is_noop() {
            debug!(
                "event=edit_save module=session status=unchanged id={}",
                patch.id
            );
            self.state = EditState::Closed;
            return Ok(SaveRequest::Unchanged);
        }

        self.state = match std::mem::replace(&mut self.state, EditState::Closed) {
            EditState::Open { loaded, form } => EditState::Saving { loaded, form },
            other => other,
        };
        Ok(SaveRequest::Commit(patch))
    }

    pub fn finish_save(
        &mut self,
        result: Result<Task, AppError>,
        notifier: &dyn Notifier,
    ) -> Result<SaveOutcome, AppError> {
        match std::mem::replace(&mut self.state, EditState::Closed) {
            EditState::Saving { loaded, form } => match result {
                Ok(task) => {
                    info!("event=edit_save module=session status=ok id={}", task.id);
                    deliver(notifier, Notice::success("Task edited successfully!"));
                    Ok(SaveOutcome::Saved(task))
                }
                Err(err) => {
                    deliver(notifier, Notice::error("Error editing task!", &err));
                    self.state = EditState::Open { loaded, form };
                    Err(err)
                }
            },
            other => {
                self.state = other;
                Err(AppError::invalid_input("no save is in flight"))
            }
        }
    }

    /// Runs a complete save against `remote`, using its current task list as
    /// the overlap snapshot.
    pub fn save(
        &mut self,
        remote: &dyn TaskRemote,
        now: OffsetDateTime,
        notifier: &dyn Notifier,
    ) -> Result<SaveOutcome, AppError> {
        self.ensure_open()?;

        let existing = match remote.fetch_tasks() {
            Ok(tasks) => tasks,
            Err(err) => {
                deliver(notifier, Notice::error("Error loading tasks!", &err));
                return Err(err);
            }
        };

        match self.begin_save(now, &existing, notifier)? {
            SaveRequest::Unchanged => Ok(SaveOutcome::Unchanged),
            SaveRequest::Commit(patch) => {
                let result = remote.update_task(&patch);
                self.finish_save(result, notifier)
            }
        }
    }

    pub fn begin_delete(&mut self) -> Result<TaskId, AppError> {
        self.ensure_open()?;
        match std::mem::replace(&mut self.state, EditState::Closed) {
            EditState::Open { loaded, form } => {
                let id = loaded.id;
                self.state = EditState::Deleting { loaded, form };
                Ok(id)
            }
            other => {
                self.state = other;
                Err(AppError::invalid_input("no task is open for editing"))
            }
        }
    }

    pub fn finish_delete(
        &mut self,
        result: Result<(), AppError>,
        notifier: &dyn Notifier,
    ) -> Result<(), AppError> {
        match std::mem::replace(&mut self.state, EditState::Closed) {
            EditState::Deleting { loaded, form } => match result {
                Ok(()) => {
                    info!(
                        "event=edit_delete module=session status=ok id={}",
                        loaded.id
                    );
                    deliver(notifier, Notice::success("Task deleted successfully!"));
                    Ok(())
                }
                Err(err) => {
                    deliver(notifier, Notice::error("Error deleting the task!", &err));
                    self.state = EditState::Open { loaded, form };
                    Err(err)
                }
            },
            other => {
                self.state = other;
                Err(AppError::invalid_input("no delete is in flight"))
            }
        }
    }

    pub fn delete(
        &mut self,
        remote: &dyn TaskRemote,
        notifier: &dyn Notifier,
    ) -> Result<(), AppError> {
        let id = self.begin_delete()?;
        let result = remote.delete_task(id);
        self.finish_delete(result, notifier)
    }
}
