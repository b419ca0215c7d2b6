use crate::error::AppError;
use crate::model::Task;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SCHEMA_VERSION: u32 = 3;
const APP_DIR_NAME: &str = "focus";
const DATA_DIR_ENV_VAR: &str = "FOCUS_DATA_DIR";
const TASKS_FILE_NAME: &str = "tasks.json";
const SETTINGS_FILE_NAME: &str = "settings.json";
const STATS_FILE_NAME: &str = "stats.json";

/// One JSON document per key under a single data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn from_env() -> Result<Self, AppError> {
        data_dir().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.root.join(TASKS_FILE_NAME)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE_NAME)
    }

    pub fn stats_path(&self) -> PathBuf {
        self.root.join(STATS_FILE_NAME)
    }
}

pub fn data_dir() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(DATA_DIR_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredTasks {
    schema_version: u32,
    tasks: Vec<Task>,
    #[serde(default)]
    last_access: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskState {
    pub tasks: Vec<Task>,
    /// Calendar day of the last write, kept for display only.
    pub last_access: Option<String>,
}

pub fn load_state(path: &Path) -> Result<TaskState, AppError> {
    let Some(stored) = read_record::<StoredTasks>(path)? else {
        return Ok(TaskState::default());
    };

    if !(1..=SCHEMA_VERSION).contains(&stored.schema_version) {
        return Err(AppError::invalid_data("schema_version mismatch"));
    }

    if let Some(duplicate) = duplicate_id(&stored.tasks) {
        return Err(AppError::invalid_data(format!(
            "duplicate task id {duplicate}"
        )));
    }

    Ok(TaskState {
        tasks: stored.tasks,
        last_access: stored.last_access,
    })
}

fn duplicate_id(tasks: &[Task]) -> Option<String> {
    let mut seen = std::collections::HashSet::new();
    tasks
        .iter()
        .find(|task| !seen.insert(task.id.as_str()))
        .map(|task| task.id.clone())
}

pub fn save_state(path: &Path, state: &TaskState) -> Result<(), AppError> {
    let stored = StoredTasks {
        schema_version: SCHEMA_VERSION,
        tasks: state.tasks.to_vec(),
        last_access: state.last_access.clone(),
    };
    write_record(path, &stored)
}

/// Reads one record. A missing file is `Ok(None)`.
pub fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, AppError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let record = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    Ok(Some(record))
}

pub fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let content = serde_json::to_string_pretty(record)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    std::fs::write(path, content)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    tracing::trace!(path = %path.display(), "record written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{SCHEMA_VERSION, StoreLayout, TaskState, load_state, read_record, save_state};
    use crate::model::{Task, TaskStatus, UserStats};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::macros::datetime;

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("focus-{nanos}-{file_name}"))
    }

    fn sample_task() -> Task {
        Task {
            id: "task-1".to_string(),
            title: "demo".to_string(),
            description: "details".to_string(),
            deadline: Some(datetime!(2025-12-21 09:00 UTC)),
            created_at: datetime!(2025-12-20 00:00 UTC),
            status: TaskStatus::Pending,
            completion_proof: None,
            deleted_at: None,
        }
    }

    #[test]
    fn missing_file_loads_empty_state() {
        let path = temp_path("missing.json");
        let loaded = load_state(&path).unwrap();

        assert!(loaded.tasks.is_empty());
        assert_eq!(loaded.last_access, None);
    }

    #[test]
    fn saved_state_keeps_tasks_and_marker() {
        let path = temp_path("tasks.json");
        let state = TaskState {
            tasks: vec![sample_task()],
            last_access: Some("2025-12-20".to_string()),
        };

        save_state(&path, &state).unwrap();
        let loaded = load_state(&path).unwrap();
        let raw = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded, state);
        assert!(raw.contains("\"deadline\": \"2025-12-21T09:00:00Z\""));
        assert!(raw.contains(&format!("\"schema_version\": {SCHEMA_VERSION}")));
    }

    #[test]
    fn accepts_v1_schema_without_optional_fields() {
        let path = temp_path("v1-schema.json");
        let content = "{\n  \"schema_version\": 1,\n  \"tasks\": [\n    {\n      \"id\": \"task-1\",\n      \"title\": \"demo\",\n      \"status\": \"failed\",\n      \"created_at\": \"2025-12-20T00:00:00Z\"\n    }\n  ]\n}";
        fs::write(&path, content).unwrap();

        let loaded = load_state(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.tasks.len(), 1);
        assert_eq!(loaded.tasks[0].status, TaskStatus::Failed);
        assert_eq!(loaded.tasks[0].deadline, None);
        assert_eq!(loaded.tasks[0].deleted_at, None);
    }

    #[test]
    fn rejects_unknown_status() {
        let path = temp_path("bad-status.json");
        let content = "{\n  \"schema_version\": 3,\n  \"tasks\": [\n    {\n      \"id\": \"task-1\",\n      \"title\": \"demo\",\n      \"status\": \"archived\",\n      \"created_at\": \"2025-12-20T00:00:00Z\"\n    }\n  ]\n}";
        fs::write(&path, content).unwrap();

        let err = load_state(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn rejects_duplicate_ids() {
        let path = temp_path("duplicate-ids.json");
        save_state(
            &path,
            &TaskState {
                tasks: vec![sample_task(), sample_task()],
                last_access: None,
            },
        )
        .unwrap();

        let err = load_state(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert!(err.message().contains("duplicate task id"));
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

    #[test]
    fn read_record_reports_invalid_json() {
        let path = temp_path("stats.json");
        fs::write(&path, "[1, 2").unwrap();

        let err = read_record::<UserStats>(&path).unwrap_err();
        fs::remove_file(&path).ok();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn layout_places_records_under_root() {
        let layout = StoreLayout::new("/tmp/focus-data");

        assert_eq!(layout.tasks_path(), PathBuf::from("/tmp/focus-data/tasks.json"));
        assert_eq!(layout.settings_path(), PathBuf::from("/tmp/focus-data/settings.json"));
        assert_eq!(layout.stats_path(), PathBuf::from("/tmp/focus-data/stats.json"));
    }
}
