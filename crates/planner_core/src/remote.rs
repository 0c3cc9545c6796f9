use crate::error::AppError;
use crate::model::{PartialTask, Task, TaskDraft, TaskId};

/// The data layer the planner talks to. Every call either succeeds or fails
/// with an error whose message is shown to the user as-is.
pub trait TaskRemote {
    fn fetch_tasks(&self) -> Result<Vec<Task>, AppError>;

    fn fetch_task(&self, id: TaskId) -> Result<Task, AppError>;

    fn create_task(&self, draft: &TaskDraft) -> Result<Task, AppError>;

    fn update_task(&self, patch: &PartialTask) -> Result<Task, AppError>;

    fn delete_task(&self, id: TaskId) -> Result<(), AppError>;
}
