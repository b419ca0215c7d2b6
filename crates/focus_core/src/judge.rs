use crate::clock::Clock;
use crate::error::AppError;
use crate::model::{Task, TaskStatus};
use crate::oracle::{Oracle, Verdict};
use crate::store::TaskStore;

pub const FALLBACK_REJECTION: &str = "System error. Discipline prevails. Task stays.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeState {
    Idle,
    Judging,
    Inquiry,
    Approved,
    Rejected,
}

impl JudgeState {
    pub fn label(self) -> &'static str {
        match self {
            JudgeState::Idle => "idle",
            JudgeState::Judging => "judging",
            JudgeState::Inquiry => "inquiry",
            JudgeState::Approved => "approved",
            JudgeState::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JudgeState::Approved | JudgeState::Rejected)
    }

    pub fn can_become(self, next: JudgeState) -> bool {
        matches!(
            (self, next),
            (JudgeState::Idle | JudgeState::Inquiry, JudgeState::Judging)
                | (
                    JudgeState::Judging,
                    JudgeState::Approved | JudgeState::Rejected | JudgeState::Inquiry
                )
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionRoute {
    SimpleConfirm,
    Judge,
}

pub fn route_deletion(task: &Task) -> DeletionRoute {
    match task.status {
        TaskStatus::Pending => DeletionRoute::Judge,
        TaskStatus::Completed | TaskStatus::Failed => DeletionRoute::SimpleConfirm,
    }
}

pub fn simple_delete(
    store: &mut TaskStore,
    clock: &dyn Clock,
    id: &str,
    confirmed: bool,
) -> Result<Option<Task>, AppError> {
    let Some(task) = store.get(id) else {
        return Ok(None);
    };
    if route_deletion(task) != DeletionRoute::SimpleConfirm {
        return Err(AppError::invalid_input(
            "pending tasks must be argued for before deletion",
        ));
    }
    if !confirmed {
        return Ok(None);
    }
    store.soft_delete(clock, id)
}

#[derive(Debug)]
pub struct DeletionSession {
    task_id: String,
    title: String,
    history: Vec<String>,
    state: JudgeState,
    trace: Vec<JudgeState>,
    message: Option<String>,
}

impl DeletionSession {
    pub fn open(task: &Task) -> Result<Self, AppError> {
        if task.is_deleted() {
            return Err(AppError::invalid_input("task is already in the bin"));
        }
        if route_deletion(task) != DeletionRoute::Judge {
            return Err(AppError::invalid_input(format!(
                "task is {}; confirm its deletion instead",
                task.status.label()
            )));
        }

        Ok(Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            history: Vec::new(),
            state: JudgeState::Idle,
            trace: vec![JudgeState::Idle],
            message: None,
        })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> JudgeState {
        self.state
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn trace(&self) -> &[JudgeState] {
        &self.trace
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn submit(&mut self, reason: &str, oracle: &dyn Oracle) -> Result<JudgeState, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::invalid_input("a reason is required"));
        }
        if !self.state.can_become(JudgeState::Judging) {
            return Err(AppError::invalid_input(format!(
                "cannot submit while the session is {}",
                self.state.label()
            )));
        }

        self.history.push(reason.to_string());
        self.transition(JudgeState::Judging)?;

        let (next, message) = match oracle.judge_deletion(&self.title, reason, &self.history) {
            Ok(result) => {
                let message = match (result.verdict, result.question) {
                    (Verdict::Inquiry, Some(question)) if !question.trim().is_empty() => {
                        format!("{} {}", result.message.trim(), question.trim())
                    }
                    _ => result.message,
                };
                let next = match result.verdict {
                    Verdict::Approved => JudgeState::Approved,
                    Verdict::Rejected => JudgeState::Rejected,
                    Verdict::Inquiry => JudgeState::Inquiry,
                };
                (next, message)
            }
            Err(err) => {
                tracing::warn!(error = %err, task_id = %self.task_id, "judge unavailable; rejecting");
                (JudgeState::Rejected, FALLBACK_REJECTION.to_string())
            }
        };

        self.message = Some(message);
        self.transition(next)?;
        tracing::info!(
            task_id = %self.task_id,
            verdict = next.label(),
            turns = self.history.len(),
            "deletion judged"
        );

        Ok(next)
    }

    /// Bins the task even if it failed after the session opened.
    pub fn execute(self, store: &mut TaskStore, clock: &dyn Clock) -> Result<Option<Task>, AppError> {
        if self.state != JudgeState::Approved {
            return Err(AppError::invalid_input(format!(
                "deletion was not approved (session is {})",
                self.state.label()
            )));
        }
        store.soft_delete(clock, &self.task_id)
    }

    pub fn dismiss(self) -> Result<(), AppError> {
        if self.state != JudgeState::Rejected {
            return Err(AppError::invalid_input(format!(
                "nothing to dismiss (session is {})",
                self.state.label()
            )));
        }
        Ok(())
    }

    pub fn withdraw(self) {
        tracing::debug!(task_id = %self.task_id, state = self.state.label(), "deletion withdrawn");
    }

    fn transition(&mut self, next: JudgeState) -> Result<(), AppError> {
        if !self.state.can_become(next) {
            return Err(AppError::invalid_input(format!(
                "illegal judge transition {} -> {}",
                self.state.label(),
                next.label()
            )));
        }
        self.state = next;
        self.trace.push(next);
        Ok(())
    }
}
