//! Loosely-typed task payloads as the data layer hands them over.
//!
//! Every field is optional on the wire; [`RawTask::into_task`] is the single
//! place where a payload becomes a [`Task`], and it refuses payloads that lack
//! an id, a title or either timestamp.

use crate::error::AppError;
use crate::model::task::{DEFAULT_COLOR, PartialTask, Task, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Number(TaskId),
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RawId>,
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        rename = "Description",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "Color", default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(rename = "StartDate", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(rename = "DueDate", default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub field: &'static str,
    pub reason: String,
}

impl ParseError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            reason: "is missing".to_string(),
        }
    }

    pub fn invalid<R: Into<String>>(field: &'static str, reason: R) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field `{}` {}", self.field, self.reason)
    }
}

impl std::error::Error for ParseError {}

/// Parses RFC 3339, or the form-style `YYYY-MM-DDTHH:MM` at `offset`.
pub fn parse_timestamp(value: &str, offset: UtcOffset) -> Option<OffsetDateTime> {
    let trimmed = value.trim();
    if let Ok(parsed) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Some(parsed);
    }

    PrimitiveDateTime::parse(
        trimmed,
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    )
    .ok()
    .map(|local| local.assume_offset(offset))
}

pub fn format_timestamp(value: OffsetDateTime) -> Result<String, AppError> {
    value
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

impl RawId {
    fn to_id(&self) -> Result<TaskId, ParseError> {
        match self {
            Self::Number(id) => Ok(*id),
            Self::Text(text) => text
                .trim()
                .parse::<TaskId>()
                .map_err(|_| ParseError::invalid("ID", format!("`{text}` is not an integer"))),
        }
    }
}

const TEXT_FIELDS: [&str; 6] = [
    "Title",
    "Description",
    "Status",
    "Color",
    "StartDate",
    "DueDate",
];

impl RawTask {
    /// Reads one stored entry. A key holding the wrong JSON type is reported
    /// against that key.
    pub fn from_value(value: &Value) -> Result<Self, ParseError> {
        let Some(object) = value.as_object() else {
            return Err(ParseError::invalid("ID", "entry is not an object"));
        };
        for field in TEXT_FIELDS {
            if let Some(found) = object.get(field)
                && !(found.is_string() || found.is_null())
            {
                return Err(ParseError::invalid(field, "is not a string"));
            }
        }

        Self::deserialize(value).map_err(|err| ParseError::invalid("ID", err.to_string()))
    }

    /// The id of a stored entry, readable even when the rest of it is not.
    pub fn id_of(value: &Value) -> Option<TaskId> {
        let id = value.get("ID")?;
        RawId::deserialize(id).ok()?.to_id().ok()
    }

    pub fn raw_id(&self) -> Option<TaskId> {
        self.id.as_ref().and_then(|id| id.to_id().ok())
    }

    pub fn into_task(self, offset: UtcOffset) -> Result<Task, ParseError> {
        let id = self.id.as_ref().ok_or(ParseError::missing("ID"))?.to_id()?;

        let title = self.title.ok_or(ParseError::missing("Title"))?;
        if title.trim().is_empty() {
            return Err(ParseError::invalid("Title", "is empty"));
        }

        let start_date = required_timestamp("StartDate", self.start_date.as_deref(), offset)?;
        let due_date = required_timestamp("DueDate", self.due_date.as_deref(), offset)?;

        Ok(Task {
            id,
            title,
            description: self.description.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            color: self
                .color
                .filter(|color| !color.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
            start_date,
            due_date,
        })
    }

    pub fn from_task(task: &Task) -> Result<Self, AppError> {
        Ok(Self {
            id: Some(RawId::Number(task.id)),
            title: Some(task.title.clone()),
            description: Some(task.description.clone()),
            status: Some(task.status.clone()),
            color: Some(task.color.clone()),
            start_date: Some(format_timestamp(task.start_date)?),
            due_date: Some(format_timestamp(task.due_date)?),
        })
    }

    /// The update payload for `patch`: only the changed keys plus `ID`.
    pub fn from_patch(patch: &PartialTask) -> Result<Self, AppError> {
        Ok(Self {
            id: Some(RawId::Number(patch.id)),
            title: patch.title.clone(),
            description: patch.description.clone(),
            status: patch.status.clone(),
            color: patch.color.clone(),
            start_date: patch.start_date.map(format_timestamp).transpose()?,
            due_date: patch.due_date.map(format_timestamp).transpose()?,
        })
    }
}

fn required_timestamp(
    field: &'static str,
    value: Option<&str>,
    offset: UtcOffset,
) -> Result<OffsetDateTime, ParseError> {
    let value = value.ok_or(ParseError::missing(field))?;
    parse_timestamp(value, offset).ok_or_else(|| {
        ParseError::invalid(field, format!("`{value}` is not a valid timestamp"))
    })
}
