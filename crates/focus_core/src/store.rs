use crate::clock::{Clock, day_key};
use crate::error::AppError;
use crate::model::{Task, TaskPatch, TaskStatus};
use crate::storage::json_store;
use crate::storage::TaskState;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use ulid::Ulid;

pub trait TaskPersistence {
    fn persist(&self, state: &TaskState) -> Result<(), AppError>;
}

pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl TaskPersistence for JsonFilePersistence {
    fn persist(&self, state: &TaskState) -> Result<(), AppError> {
        json_store::save_state(&self.path, state)
    }
}

pub struct TaskStore {
    tasks: Vec<Task>,
    last_access: Option<String>,
    persistence: Box<dyn TaskPersistence>,
}

impl TaskStore {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let state = json_store::load_state(path)?;
        Ok(Self::with_persistence(
            state,
            Box::new(JsonFilePersistence::new(path)),
        ))
    }

    pub fn with_persistence(state: TaskState, persistence: Box<dyn TaskPersistence>) -> Self {
        Self {
            tasks: state.tasks,
            last_access: state.last_access,
            persistence,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn last_access(&self) -> Option<&str> {
        self.last_access.as_deref()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id.trim())
    }

    pub fn pending(&self) -> Vec<&Task> {
        self.active_with_status(TaskStatus::Pending)
    }

    pub fn completed(&self) -> Vec<&Task> {
        self.active_with_status(TaskStatus::Completed)
    }

    pub fn failed(&self) -> Vec<&Task> {
        self.active_with_status(TaskStatus::Failed)
    }

    pub fn bin(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|task| task.is_deleted()).collect()
    }

    fn active_with_status(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| !task.is_deleted() && task.status == status)
            .collect()
    }

    pub fn create(
        &mut self,
        clock: &dyn Clock,
        title: &str,
        description: &str,
        deadline: Option<OffsetDateTime>,
    ) -> Result<Task, AppError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }

        let task = Task {
            id: format!("task-{}", Ulid::new().to_string().to_lowercase()),
            title: trimmed.to_string(),
            description: description.trim().to_string(),
            deadline,
            created_at: clock.now(),
            status: TaskStatus::Pending,
            completion_proof: None,
            deleted_at: None,
        };

        let mut tasks = self.tasks.clone();
        tasks.insert(0, task.clone());
        self.commit(clock, tasks)?;
        tracing::debug!(task_id = %task.id, "task created");

        Ok(task)
    }

    pub fn update(
        &mut self,
        clock: &dyn Clock,
        id: &str,
        patch: TaskPatch,
    ) -> Result<Option<Task>, AppError> {
        let title = match patch.title.as_deref().map(str::trim) {
            Some("") => return Err(AppError::invalid_input("title is required")),
            other => other.map(str::to_string),
        };

        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        if patch.is_empty() {
            return Ok(Some(self.tasks[index].clone()));
        }

        let mut tasks = self.tasks.clone();
        let task = &mut tasks[index];
        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = description.trim().to_string();
        }
        if let Some(deadline) = patch.deadline {
            task.deadline = deadline;
        }

        let updated = task.clone();
        self.commit(clock, tasks)?;
        tracing::debug!(task_id = %updated.id, "task updated");

        Ok(Some(updated))
    }

    pub fn set_status(
        &mut self,
        clock: &dyn Clock,
        id: &str,
        status: TaskStatus,
        proof: Option<String>,
    ) -> Result<Option<Task>, AppError> {
        if proof.is_some() && status != TaskStatus::Completed {
            return Err(AppError::invalid_input(
                "proof can only be attached on completion",
            ));
        }

        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        let current = self.tasks[index].status;
        if !current.can_become(status) {
            return Err(AppError::invalid_input(format!(
                "task is {} and cannot become {}",
                current.label(),
                status.label()
            )));
        }

        let mut tasks = self.tasks.clone();
        let task = &mut tasks[index];
        task.status = status;
        if status == TaskStatus::Completed {
            task.completion_proof = proof;
        }

        let updated = task.clone();
        self.commit(clock, tasks)?;
        tracing::debug!(task_id = %updated.id, status = status.label(), "task status changed");

        Ok(Some(updated))
    }

    pub fn soft_delete(&mut self, clock: &dyn Clock, id: &str) -> Result<Option<Task>, AppError> {
        let Some(index) = self.position(id) else {
            return Ok(None);
        };
        if self.tasks[index].is_deleted() {
            return Ok(Some(self.tasks[index].clone()));
        }

        let mut tasks = self.tasks.clone();
        tasks[index].deleted_at = Some(clock.now());
        let updated = tasks[index].clone();
        self.commit(clock, tasks)?;
        tracing::debug!(task_id = %updated.id, "task moved to bin");

        Ok(Some(updated))
    }

    pub fn restore(&mut self, clock: &dyn Clock, id: &str) -> Result<Option<Task>, AppError> {
        let Some(index) = self
            .position(id)
            .filter(|index| self.tasks[*index].is_deleted())
        else {
            return Ok(None);
        };

        let mut tasks = self.tasks.clone();
        tasks[index].deleted_at = None;
        let updated = tasks[index].clone();
        self.commit(clock, tasks)?;
        tracing::debug!(task_id = %updated.id, "task restored");

        Ok(Some(updated))
    }

    pub fn purge(&mut self, clock: &dyn Clock, id: &str) -> Result<Option<Task>, AppError> {
        let Some(index) = self
            .position(id)
            .filter(|index| self.tasks[*index].is_deleted())
        else {
            return Ok(None);
        };

        let mut tasks = self.tasks.clone();
        let removed = tasks.remove(index);
        self.commit(clock, tasks)?;
        tracing::debug!(task_id = %removed.id, "task purged");

        Ok(Some(removed))
    }

    /// Fails every live pending task whose deadline is before `clock.now()`,
    /// in a single write. Nothing is written when no task expired.
    pub fn expire_overdue(&mut self, clock: &dyn Clock) -> Result<Vec<Task>, AppError> {
        let now = clock.now();
        let mut tasks = self.tasks.clone();
        let mut expired = Vec::new();

        for task in &mut tasks {
            if task.status == TaskStatus::Pending && !task.is_deleted() && task.is_overdue(now) {
                task.status = TaskStatus::Failed;
                expired.push(task.clone());
            }
        }

        if !expired.is_empty() {
            self.commit(clock, tasks)?;
        }

        Ok(expired)
    }

    fn position(&self, id: &str) -> Option<usize> {
        let trimmed = id.trim();
        self.tasks.iter().position(|task| task.id == trimmed)
    }

    // Memory only changes once the write succeeded.
    fn commit(&mut self, clock: &dyn Clock, tasks: Vec<Task>) -> Result<(), AppError> {
        let state = TaskState {
            tasks,
            last_access: Some(day_key(clock.today())),
        };
        self.persistence.persist(&state)?;
        self.tasks = state.tasks;
        self.last_access = state.last_access;
        Ok(())
    }
}
