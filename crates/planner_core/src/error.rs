use crate::model::{ParseError, TaskId};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    InvalidInput(String),
    InvalidData(String),
    Io(String),
    Validation(ValidationError),
    Transport(String),
    Parse(ParseError),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn transport<M: Into<String>>(message: M) -> Self {
        Self::Transport(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::Io(_) => "io_error",
            Self::Validation(_) => "validation_error",
            Self::Transport(_) => "transport_error",
            Self::Parse(_) => "parse_error",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput(message)
            | Self::InvalidData(message)
            | Self::Io(message)
            | Self::Transport(message) => message.clone(),
            Self::Validation(err) => err.message(),
            Self::Parse(err) => err.to_string(),
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<ParseError> for AppError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

/// Which of the three overlap rules rejected a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapRule {
    /// The candidate starts inside another task.
    StartOverlap,
    /// The candidate ends inside another task.
    EndOverlap,
    /// The candidate spans another task entirely.
    Containment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    DateTooFarAhead,
    EmptyDuration,
    StartInPast,
    OverlapsExisting { rule: OverlapRule, task_id: TaskId },
}

impl ValidationError {
    pub fn message(&self) -> String {
        match self {
            Self::DateTooFarAhead => "date exceeds 1 month ahead".to_string(),
            Self::EmptyDuration => "start and due time can not match".to_string(),
            Self::StartInPast => "start time is in the past".to_string(),
            Self::OverlapsExisting { rule, task_id } => {
                let what = match rule {
                    OverlapRule::StartOverlap => "start time overlaps with",
                    OverlapRule::EndOverlap => "end time overlaps with",
                    OverlapRule::Containment => "duration overlaps with",
                };
                format!("task {what} task {task_id}, please choose a different time")
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ValidationError {}
