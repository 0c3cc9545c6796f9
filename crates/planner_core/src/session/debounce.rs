use crate::calendar::Toolbar;
use crate::model::Task;
use crate::scheduler::search;
use std::time::{Duration, Instant};

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// A single pending action due at a deadline. Scheduling a new one cancels
/// whatever was pending.
#[derive(Debug, Clone)]
pub struct DelayedTask<T> {
    pending: Option<(Instant, T)>,
}

impl<T> Default for DelayedTask<T> {
    fn default() -> Self {
        Self { pending: None }
    }
}

impl<T> DelayedTask<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value that was pending and got replaced, if any.
    pub fn schedule(&mut self, value: T, at: Instant) -> Option<T> {
        self.pending.replace((at, value)).map(|(_, old)| old)
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, value)| value)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Hands out the pending value once `now` reaches its deadline.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self.deadline().is_some_and(|at| now >= at) {
            self.cancel()
        } else {
            None
        }
    }
}

/// Per-session UI state: the debounced search box and the calendar toolbar.
#[derive(Debug, Clone)]
pub struct InteractionState {
    query: String,
    show_actions: bool,
    delay: Duration,
    lookup: DelayedTask<String>,
    pub toolbar: Toolbar,
}

impl InteractionState {
    pub fn new(toolbar: Toolbar, delay: Duration) -> Self {
        Self {
            query: String::new(),
            show_actions: true,
            delay,
            lookup: DelayedTask::new(),
            toolbar,
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether the add/plan actions are shown; they hide while searching.
    pub fn show_actions(&self) -> bool {
        self.show_actions
    }

    pub fn has_pending_lookup(&self) -> bool {
        self.lookup.is_pending()
    }

    /// When the pending lookup becomes due.
    pub fn lookup_deadline(&self) -> Option<Instant> {
        self.lookup.deadline()
    }

    pub fn on_input_change(&mut self, value: &str, now: Instant) {
        self.query = value.to_string();
        self.show_actions = value.is_empty();

        // clearing the box restores the full list right away
        let at = if value.is_empty() {
            now
        } else {
            now.checked_add(self.delay).unwrap_or(now)
        };
        if self.lookup.schedule(value.to_string(), at).is_some() {
            log::trace!("event=search_debounce module=session status=replaced");
        }
    }

    /// Runs the pending lookup against `tasks` once it is due.
    pub fn poll_search(&mut self, tasks: &[Task], now: Instant) -> Option<Vec<Task>> {
        self.lookup.poll(now).map(|query| search(tasks, &query))
    }
}
