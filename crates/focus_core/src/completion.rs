use crate::clock::Clock;
use crate::error::AppError;
use crate::model::{Task, TaskStatus};
use crate::store::TaskStore;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStep {
    Honesty,
    Proof,
    Aborted,
}

pub fn encode_image(mime: &str, bytes: &[u8]) -> Result<String, AppError> {
    if !mime.starts_with("image/") {
        return Err(AppError::invalid_input(format!("{mime} is not an image type")));
    }
    if bytes.is_empty() {
        return Err(AppError::invalid_input("image is empty"));
    }
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

/// Reads and encodes an image file, choosing the MIME type by extension.
pub fn encode_image_file(path: &Path) -> Result<String, AppError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = image_mime(&extension).ok_or_else(|| {
        AppError::invalid_input(format!("{} is not a supported image", path.display()))
    })?;
    let bytes =
        std::fs::read(path).map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    encode_image(mime, &bytes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionProof(String);

impl CompletionProof {
    pub fn from_image_bytes(mime: &str, bytes: &[u8]) -> Result<Self, AppError> {
        encode_image(mime, bytes).map(Self)
    }

    pub fn from_image_file(path: &Path) -> Result<Self, AppError> {
        encode_image_file(path).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

fn image_mime(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

#[derive(Debug)]
pub struct CompletionFlow {
    task_id: String,
    title: String,
    step: CompletionStep,
}

impl CompletionFlow {
    pub fn begin(store: &TaskStore, clock: &dyn Clock, id: &str) -> Result<Option<Self>, AppError> {
        let Some(task) = store.get(id) else {
            return Ok(None);
        };
        ensure_completable(task, clock)?;

        Ok(Some(Self {
            task_id: task.id.clone(),
            title: task.title.clone(),
            step: CompletionStep::Honesty,
        }))
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn step(&self) -> CompletionStep {
        self.step
    }

    pub fn honesty_prompt(&self) -> String {
        format!(
            "Have you TRULY completed this task honestly?\n  \"{}\"",
            self.title
        )
    }

    pub fn answer_honesty(&mut self, honest: bool) -> Result<CompletionStep, AppError> {
        if self.step != CompletionStep::Honesty {
            return Err(AppError::invalid_input("honesty check already answered"));
        }
        self.step = if honest {
            CompletionStep::Proof
        } else {
            CompletionStep::Aborted
        };
        Ok(self.step)
    }

    pub fn finish(
        self,
        store: &mut TaskStore,
        clock: &dyn Clock,
        proof: Option<CompletionProof>,
    ) -> Result<Option<Task>, AppError> {
        if self.step != CompletionStep::Proof {
            return Err(AppError::invalid_input(
                "completion requires an affirmative honesty check",
            ));
        }

        // expired or binned meanwhile
        if let Some(task) = store.get(&self.task_id) {
            ensure_completable(task, clock)?;
        }

        store.set_status(
            clock,
            &self.task_id,
            TaskStatus::Completed,
            proof.map(CompletionProof::into_string),
        )
    }
}

fn ensure_completable(task: &Task, clock: &dyn Clock) -> Result<(), AppError> {
    if task.is_deleted() {
        return Err(AppError::invalid_input("task is in the bin"));
    }
    if task.status != TaskStatus::Pending {
        return Err(AppError::invalid_input(format!(
            "task already {}",
            task.status.label()
        )));
    }
    if task.is_overdue(clock.now()) {
        return Err(AppError::invalid_input("task is overdue"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CompletionFlow, CompletionProof, CompletionStep};
    use crate::clock::FixedClock;
    use crate::model::TaskStatus;
    use crate::store::testing::memory_store;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::macros::datetime;

    fn clock() -> FixedClock {
        FixedClock::new(datetime!(2025-12-20 12:00 UTC))
    }

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("focus-{nanos}-{file_name}"))
    }

    #[test]
    fn skipping_proof_completes_without_proof() {
        let clock = clock();
        let (mut store, _) = memory_store();
        let task = store.create(&clock, "Write report", "", None).unwrap();

        let mut flow = CompletionFlow::begin(&store, &clock, &task.id)
            .unwrap()
            .unwrap();
        assert!(flow.honesty_prompt().contains("Write report"));
        assert_eq!(flow.answer_honesty(true).unwrap(), CompletionStep::Proof);
        let done = flow.finish(&mut store, &clock, None).unwrap().unwrap();

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.completion_proof, None);
    }

    #[test]
    fn attached_proof_is_stored_as_data_url() {
        let clock = clock();
        let (mut store, _) = memory_store();
        let task = store.create(&clock, "Gym", "", None).unwrap();
        let proof = CompletionProof::from_image_bytes("image/png", &[1, 2, 3]).unwrap();

        let mut flow = CompletionFlow::begin(&store, &clock, &task.id)
            .unwrap()
            .unwrap();
        flow.answer_honesty(true).unwrap();
        let done = flow.finish(&mut store, &clock, Some(proof)).unwrap().unwrap();

        assert_eq!(
            done.completion_proof.as_deref(),
            Some("data:image/png;base64,AQID")
        );
    }

    #[test]
    fn declining_honesty_aborts_without_side_effects() {
        let clock = clock();
        let (mut store, persistence) = memory_store();
        let task = store.create(&clock, "task", "", None).unwrap();
        let writes = persistence.write_count();

        let mut flow = CompletionFlow::begin(&store, &clock, &task.id)
            .unwrap()
            .unwrap();
        assert_eq!(flow.answer_honesty(false).unwrap(), CompletionStep::Aborted);
        let err = flow.finish(&mut store, &clock, None).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
        assert_eq!(store.get(&task.id).unwrap().status, TaskStatus::Pending);
        assert_eq!(persistence.write_count(), writes);
    }

    #[test]
    fn honesty_is_answered_once() {
        let clock = clock();
        let (mut store, _) = memory_store();
        let task = store.create(&clock, "task", "", None).unwrap();

        let mut flow = CompletionFlow::begin(&store, &clock, &task.id)
            .unwrap()
            .unwrap();
        flow.answer_honesty(true).unwrap();

        assert!(flow.answer_honesty(false).is_err());
        assert_eq!(flow.step(), CompletionStep::Proof);
    }

    #[test]
    fn begin_rejects_overdue_terminal_and_binned_tasks() {
        let clock = clock();
        let (mut store, _) = memory_store();
        let overdue = store
            .create(&clock, "late", "", Some(datetime!(2025-12-20 11:00 UTC)))
            .unwrap();
        let done = store.create(&clock, "done", "", None).unwrap();
        store
            .set_status(&clock, &done.id, TaskStatus::Completed, None)
            .unwrap();
        let binned = store.create(&clock, "binned", "", None).unwrap();
        store.soft_delete(&clock, &binned.id).unwrap();

        for id in [&overdue.id, &done.id, &binned.id] {
            let err = CompletionFlow::begin(&store, &clock, id).unwrap_err();
            assert_eq!(err.code(), "invalid_input");
        }
        assert!(CompletionFlow::begin(&store, &clock, "task-missing")
            .unwrap()
            .is_none());
    }

    #[test]
    fn finish_rechecks_deadline() {
        let clock = clock();
        let (mut store, _) = memory_store();
        let task = store
            .create(&clock, "tight", "", Some(datetime!(2025-12-20 12:00:30 UTC)))
            .unwrap();
        let mut flow = CompletionFlow::begin(&store, &clock, &task.id)
            .unwrap()
            .unwrap();
        flow.answer_honesty(true).unwrap();

        clock.advance(time::Duration::minutes(1));
        let err = flow.finish(&mut store, &clock, None).unwrap_err();

        assert!(err.message().contains("overdue"));
    }

    #[test]
    fn proof_from_file_uses_extension_mime() {
        let path = temp_path("proof.JPG");
        std::fs::write(&path, b"jpeg-bytes").unwrap();

        let proof = CompletionProof::from_image_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(proof.as_str().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn proof_rejects_non_images_and_empty_files() {
        let text = temp_path("notes.txt");
        std::fs::write(&text, b"hello").unwrap();
        let err = CompletionProof::from_image_file(&text).unwrap_err();
        std::fs::remove_file(&text).ok();
        assert_eq!(err.code(), "invalid_input");

        let err = CompletionProof::from_image_bytes("image/png", &[]).unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        let missing = temp_path("missing.png");
        let err = CompletionProof::from_image_file(&missing).unwrap_err();
        assert_eq!(err.code(), "io_error");
    }
}
