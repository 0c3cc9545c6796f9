mod raw;
mod task;

pub use raw::{ParseError, RawId, RawTask, format_timestamp, parse_timestamp};
pub use task::{
    DEFAULT_COLOR, MAX_DESCRIPTION_CHARS, PartialTask, Schedulable, Task, TaskDraft, TaskId,
    check_fields,
};
