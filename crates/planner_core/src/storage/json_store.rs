use crate::error::AppError;
use crate::model::{PartialTask, RawTask, Task, TaskDraft, TaskId};
use crate::remote::TaskRemote;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use time::UtcOffset;

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "tasks.json";
const STORE_ENV_VAR: &str = "PLANNER_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredTasks {
    schema_version: u32,
    #[serde(default)]
    next_id: Option<TaskId>,
    #[serde(default)]
    tasks: Vec<Value>,
}

/// Stored entries are kept as JSON so one bad entry cannot hide the others.
/// `next_id` is `None` once every id has been handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskState {
    pub tasks: Vec<Value>,
    pub next_id: Option<TaskId>,
}

impl Default for TaskState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: Some(1),
        }
    }
}

fn to_entry(raw: &RawTask) -> Result<Value, AppError> {
    serde_json::to_value(raw).map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("planner").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("planner")
            .join(STORE_FILE_NAME))
    }
}

pub fn load_state(path: &Path) -> Result<TaskState, AppError> {
    if !path.exists() {
        return Ok(TaskState::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let stored: StoredTasks =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;

    if stored.schema_version != SCHEMA_VERSION {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    // never hand out an id that is already taken, even if next_id was edited by hand
    let max_id = stored
        .tasks
        .iter()
        .filter_map(RawTask::id_of)
        .max()
        .unwrap_or(0);
    let next_id = max_id
        .checked_add(1)
        .map(|floor| stored.next_id.unwrap_or(1).max(floor));

    Ok(TaskState {
        tasks: stored.tasks,
        next_id,
    })
}

pub fn save_state(path: &Path, state: &TaskState) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredTasks {
        schema_version: SCHEMA_VERSION,
        next_id: state.next_id,
        tasks: state.tasks.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content).map_err(|err| AppError::io(err.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    Ok(())
}

/// File-backed [`TaskRemote`]. Timestamps without an offset are read at
/// `offset`.
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    offset: UtcOffset,
}

impl JsonStore {
    pub fn new<P: Into<PathBuf>>(path: P, offset: UtcOffset) -> Self {
        Self {
            path: path.into(),
            offset,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn position(state: &TaskState, id: TaskId) -> Result<usize, AppError> {
        state
            .tasks
            .iter()
            .position(|entry| RawTask::id_of(entry) == Some(id))
            .ok_or_else(|| AppError::invalid_input("task not found"))
    }
}

impl TaskRemote for JsonStore {
    fn fetch_tasks(&self) -> Result<Vec<Task>, AppError> {
        let state = load_state(&self.path)?;
        let mut tasks = Vec::with_capacity(state.tasks.len());

        for entry in &state.tasks {
            match RawTask::from_value(entry).and_then(|raw| raw.into_task(self.offset)) {
                Ok(task) => tasks.push(task),
                Err(err) => warn!(
                    "event=fetch_tasks module=store status=skipped id={:?} error={}",
                    RawTask::id_of(entry),
                    err
                ),
            }
        }

        Ok(tasks)
    }

    fn fetch_task(&self, id: TaskId) -> Result<Task, AppError> {
        let state = load_state(&self.path)?;
        let index = Self::position(&state, id)?;
        Ok(RawTask::from_value(&state.tasks[index])?.into_task(self.offset)?)
    }

    fn create_task(&self, draft: &TaskDraft) -> Result<Task, AppError> {
        draft.check_fields()?;

        let mut state = load_state(&self.path)?;
        let id = state
            .next_id
            .ok_or_else(|| AppError::invalid_data("task id space exhausted"))?;
        let task = Task::from_draft(id, draft.clone());
        state.tasks.push(to_entry(&RawTask::from_task(&task)?)?);
        state.next_id = id.checked_add(1);
        save_state(&self.path, &state)?;

        info!(
            "event=task_create module=store status=ok id={}",
            task.id
        );
        Ok(task)
    }

    fn update_task(&self, patch: &PartialTask) -> Result<Task, AppError> {
        let mut state = load_state(&self.path)?;
        let index = Self::position(&state, patch.id)?;

        let mut task = RawTask::from_value(&state.tasks[index])?.into_task(self.offset)?;
        patch.apply(&mut task);
        crate::model::check_fields(&task.title, &task.description)?;

        // only the patched keys are written; anything else in the entry stays
        if let Value::Object(changes) = to_entry(&RawTask::from_patch(patch)?)?
            && let Some(entry) = state.tasks[index].as_object_mut()
        {
            entry.extend(changes);
        }
        save_state(&self.path, &state)?;

        info!(
            "event=task_update module=store status=ok id={} fields={}",
            task.id,
            patch.changed_fields().join(",")
        );
        Ok(task)
    }

    fn delete_task(&self, id: TaskId) -> Result<(), AppError> {
        let mut state = load_state(&self.path)?;
        let index = Self::position(&state, id)?;
        state.tasks.remove(index);
        save_state(&self.path, &state)?;

        info!("event=task_delete module=store status=ok id={}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonStore, SCHEMA_VERSION, TaskState, load_state, save_state};
    use crate::model::{PartialTask, RawId, RawTask, TaskDraft};
    use crate::remote::TaskRemote;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::UtcOffset;
    use time::macros::datetime;

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("planner-{nanos}-{file_name}"))
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: "read chapter 4".to_string(),
            status: "todo".to_string(),
            color: "#000ff3".to_string(),
            start_date: datetime!(2026-10-20 10:00 UTC),
            due_date: datetime!(2026-10-20 11:00 UTC),
        }
    }

    #[test]
    fn missing_file_loads_empty_state() {
        let path = temp_path("missing.json");
        let state = load_state(&path).unwrap();
        assert!(state.tasks.is_empty());
        assert_eq!(state.next_id, Some(1));
    }

    #[test]
    fn create_assigns_increasing_ids_and_persists() {
        let path = temp_path("create.json");
        let store = JsonStore::new(&path, UtcOffset::UTC);

        let first = store.create_task(&draft("Math 101")).unwrap();
        let second = store.create_task(&draft("History")).unwrap();
        let loaded = store.fetch_tasks().unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(loaded, vec![first, second]);
    }

    #[test]
    fn create_rejects_blank_title() {
        let path = temp_path("blank-title.json");
        let store = JsonStore::new(&path, UtcOffset::UTC);

        let err = store.create_task(&draft("  ")).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert!(!path.exists());
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let path = temp_path("reuse.json");
        let store = JsonStore::new(&path, UtcOffset::UTC);

        let first = store.create_task(&draft("one")).unwrap();
        store.delete_task(first.id).unwrap();
        let second = store.create_task(&draft("two")).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(second.id, 2);
    }

    #[test]
    fn update_applies_patch_fields() {
        let path = temp_path("update.json");
        let store = JsonStore::new(&path, UtcOffset::UTC);
        let created = store.create_task(&draft("Math 101")).unwrap();

        let mut patch = PartialTask::new(created.id);
        patch.status = Some("done".to_string());
        let updated = store.update_task(&patch).unwrap();
        let fetched = store.fetch_task(created.id).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(updated.status, "done");
        assert_eq!(updated.title, "Math 101");
        assert_eq!(fetched, updated);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let path = temp_path("unknown.json");
        let store = JsonStore::new(&path, UtcOffset::UTC);

        let err = store.fetch_task(9).unwrap_err();
        assert_eq!(err.message(), "task not found");
        let err = store.delete_task(9).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        let err = store.update_task(&PartialTask::new(9)).unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn malformed_entries_are_skipped_in_lists_but_reported_alone() {
        let path = temp_path("malformed.json");
        let state = TaskState {
            tasks: vec![
                serde_json::to_value(RawTask {
                    id: Some(RawId::Number(1)),
                    title: Some("no dates".to_string()),
                    ..RawTask::default()
                })
                .unwrap(),
                serde_json::to_value(RawTask {
                    id: Some(RawId::Number(2)),
                    title: Some("fine".to_string()),
                    start_date: Some("2026-10-20T10:00:00Z".to_string()),
                    due_date: Some("2026-10-20T11:00:00Z".to_string()),
                    ..RawTask::default()
                })
                .unwrap(),
            ],
            next_id: Some(3),
        };
        save_state(&path, &state).unwrap();

        let store = JsonStore::new(&path, UtcOffset::UTC);
        let tasks = store.fetch_tasks().unwrap();
        let err = store.fetch_task(1).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 2);
        assert_eq!(err.code(), "parse_error");
        assert!(err.message().contains("StartDate"));
    }

    #[test]
    fn next_id_never_trails_stored_ids() {
        let path = temp_path("next-id.json");
        let content = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "next_id": 1,
            "tasks": [
                {
                    "ID": 7,
                    "Title": "demo",
                    "StartDate": "2026-10-20T10:00:00Z",
                    "DueDate": "2026-10-20T11:00:00Z"
                }
            ]
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let state = load_state(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(state.next_id, Some(8));
    }

    #[test]
    fn wrongly_typed_entry_does_not_hide_the_rest() {
        let path = temp_path("wrong-type.json");
        let content = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "tasks": [
                {
                    "ID": 1,
                    "Title": "Math",
                    "StartDate": "2026-10-20T10:00:00Z",
                    "DueDate": "2026-10-20T11:00:00Z"
                },
                {
                    "ID": 2,
                    "Title": 5,
                    "StartDate": "2026-10-20T12:00:00Z",
                    "DueDate": "2026-10-20T13:00:00Z"
                }
            ]
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let store = JsonStore::new(&path, UtcOffset::UTC);
        let tasks = store.fetch_tasks().unwrap();
        let err = store.fetch_task(2).unwrap_err();
        let created = store.create_task(&draft("History")).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Math");
        assert_eq!(err.code(), "parse_error");
        assert!(err.message().contains("Title"));
        assert_eq!(created.id, 3);
    }

    #[test]
    fn exhausted_id_space_fails_create_but_not_reads() {
        let path = temp_path("max-id.json");
        let content = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "tasks": [
                {
                    "ID": i64::MAX,
                    "Title": "last",
                    "StartDate": "2026-10-20T10:00:00Z",
                    "DueDate": "2026-10-20T11:00:00Z"
                }
            ]
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let store = JsonStore::new(&path, UtcOffset::UTC);
        let tasks = store.fetch_tasks().unwrap();
        let err = store.create_task(&draft("one more")).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(tasks[0].id, i64::MAX);
        assert_eq!(err.code(), "invalid_data");
        assert_eq!(err.message(), "task id space exhausted");
    }

    #[test]
    fn update_writes_only_patched_keys() {
        let path = temp_path("sparse-update.json");
        let content = serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "tasks": [
                {
                    "ID": "4",
                    "Title": "Math",
                    "Owner": "student-1",
                    "StartDate": "2026-10-20T10:00",
                    "DueDate": "2026-10-20T11:00"
                }
            ]
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let store = JsonStore::new(&path, UtcOffset::UTC);
        let mut patch = PartialTask::new(4);
        patch.title = Some("Math 102".to_string());
        store.update_task(&patch).unwrap();

        let stored: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        fs::remove_file(&path).ok();

        let entry = &stored["tasks"][0];
        assert_eq!(entry["Title"], "Math 102");
        assert_eq!(entry["Owner"], "student-1");
        assert_eq!(entry["StartDate"], "2026-10-20T10:00");
        assert!(entry.get("Color").is_none());
    }

    #[test]
    fn schema_version_must_match() {
        let path = temp_path("bad-schema.json");
        let bad = format!(
            "{{\n  \"schema_version\": {},\n  \"tasks\": []\n}}",
            SCHEMA_VERSION + 1
        );
        fs::write(&path, bad).unwrap();

        let err = load_state(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }
}
