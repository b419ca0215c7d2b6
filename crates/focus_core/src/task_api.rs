use crate::clock::{Clock, SystemClock};
use crate::completion::{CompletionFlow, CompletionProof};
use crate::config::{
    Settings, SettingOverride, load_settings_with_fallback, merge_overrides,
    parse_setting_override, save_settings,
};
use crate::error::AppError;
use crate::judge::{DeletionRoute, DeletionSession, route_deletion, simple_delete};
use crate::mentor;
use crate::model::{Task, TaskPatch, UserStats};
use crate::notify::Notifier;
use crate::oracle::Oracle;
use crate::storage::StoreLayout;
use crate::storage::json_store;
use crate::store::TaskStore;
use crate::sweeper::DeadlineSweeper;
use crate::voice::{VoiceOutcome, task_from_transcript};
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Debug)]
pub struct NotificationOutcome {
    pub tasks: Vec<Task>,
    pub failures: Vec<NotificationFailure>,
}

#[derive(Debug)]
pub struct NotificationFailure {
    pub task_id: String,
    pub error: AppError,
}

pub struct TaskApi {
    layout: StoreLayout,
    clock: Box<dyn Clock>,
    store: TaskStore,
    stats: UserStats,
    saved_settings: Settings,
    overrides: Vec<SettingOverride>,
    settings: Settings,
    settings_warning: Option<AppError>,
    expired_on_open: Vec<Task>,
}

impl TaskApi {
    pub fn from_env(overrides: &[String]) -> Result<Self, AppError> {
        let layout = StoreLayout::from_env()?;
        let overrides = overrides
            .iter()
            .map(|raw| parse_setting_override(raw))
            .collect::<Result<Vec<_>, _>>()?;
        Self::open(layout, overrides, Box::new(SystemClock))
    }

    pub fn open(
        layout: StoreLayout,
        overrides: Vec<SettingOverride>,
        clock: Box<dyn Clock>,
    ) -> Result<Self, AppError> {
        let loaded = load_settings_with_fallback(&layout.settings_path());
        if let Some(err) = &loaded.error {
            tracing::warn!(error = %err, "settings unreadable; using defaults");
        }
        let settings = merge_overrides(&loaded.settings, &overrides)?;
        let stats = json_store::read_record::<UserStats>(&layout.stats_path())?.unwrap_or_default();
        let mut store = TaskStore::open(&layout.tasks_path())?;

        let sweeper = DeadlineSweeper::new(settings.sweep_interval());
        let expired_on_open = sweeper.sweep(&mut store, clock.as_ref())?;

        Ok(Self {
            layout,
            clock,
            store,
            stats,
            saved_settings: loaded.settings,
            overrides,
            settings,
            settings_warning: loaded.error,
            expired_on_open,
        })
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    /// Effective settings, including one-run overrides.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_warning(&self) -> Option<&AppError> {
        self.settings_warning.as_ref()
    }

    pub fn expired_on_open(&self) -> &[Task] {
        &self.expired_on_open
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.store.get(id)
    }

    pub fn add_task(
        &mut self,
        title: &str,
        description: &str,
        deadline: Option<OffsetDateTime>,
    ) -> Result<Task, AppError> {
        let task = self
            .store
            .create(self.clock.as_ref(), title, description, deadline)?;
        self.stats.record_created();
        self.save_stats()?;
        Ok(task)
    }

    pub fn deadline_in(&self, offset: time::Duration) -> Result<OffsetDateTime, AppError> {
        self.clock
            .now()
            .checked_add(offset)
            .ok_or_else(|| AppError::invalid_input("deadline is too far in the future"))
    }

    pub fn edit_task(&mut self, id: &str, patch: TaskPatch) -> Result<Option<Task>, AppError> {
        self.store.update(self.clock.as_ref(), id, patch)
    }

    pub fn add_from_voice(
        &mut self,
        oracle: &dyn Oracle,
        transcript: &str,
    ) -> Result<VoiceOutcome, AppError> {
        if !self.settings.voice_input {
            return Err(AppError::invalid_input("voice input is turned off"));
        }
        let outcome = task_from_transcript(&mut self.store, self.clock.as_ref(), oracle, transcript)?;
        if let VoiceOutcome::Added(_) = outcome {
            self.stats.record_created();
            self.save_stats()?;
        }
        Ok(outcome)
    }

    pub fn begin_completion(&self, id: &str) -> Result<Option<CompletionFlow>, AppError> {
        CompletionFlow::begin(&self.store, self.clock.as_ref(), id)
    }

    pub fn finish_completion(
        &mut self,
        flow: CompletionFlow,
        proof: Option<CompletionProof>,
    ) -> Result<Option<Task>, AppError> {
        let completed = flow.finish(&mut self.store, self.clock.as_ref(), proof)?;
        if completed.is_some() {
            self.stats.record_completed(self.clock.today());
            self.save_stats()?;
        }
        Ok(completed)
    }

    /// `None` when the id is unknown or already in the bin.
    pub fn deletion_route(&self, id: &str) -> Option<DeletionRoute> {
        self.store
            .get(id)
            .filter(|task| !task.is_deleted())
            .map(route_deletion)
    }

    pub fn open_deletion(&self, id: &str) -> Result<Option<DeletionSession>, AppError> {
        self.store.get(id).map(DeletionSession::open).transpose()
    }

    pub fn execute_deletion(&mut self, session: DeletionSession) -> Result<Option<Task>, AppError> {
        let deleted = session.execute(&mut self.store, self.clock.as_ref())?;
        self.count_deletion(deleted)
    }

    pub fn confirm_simple_delete(
        &mut self,
        id: &str,
        confirmed: bool,
    ) -> Result<Option<Task>, AppError> {
        let deleted = simple_delete(&mut self.store, self.clock.as_ref(), id, confirmed)?;
        self.count_deletion(deleted)
    }

    pub fn restore(&mut self, id: &str) -> Result<Option<Task>, AppError> {
        self.store.restore(self.clock.as_ref(), id)
    }

    pub fn purge(&mut self, id: &str) -> Result<Option<Task>, AppError> {
        self.store.purge(self.clock.as_ref(), id)
    }

    pub fn quote(&self, oracle: &dyn Oracle) -> String {
        mentor::mentor_quote(&self.settings, oracle, &mut rand::thread_rng())
    }

    /// Persists one `KEY=VALUE` change. One-run overrides still win afterwards.
    pub fn update_setting(&mut self, assignment: &str) -> Result<&Settings, AppError> {
        let item = parse_setting_override(assignment)?;
        let mut saved = self.saved_settings.clone();
        saved.apply(item.key, &item.value)?;
        self.commit_settings(saved)?;
        Ok(&self.settings)
    }

    pub fn update_mentors<T, F>(&mut self, edit: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Settings) -> Result<T, AppError>,
    {
        let mut saved = self.saved_settings.clone();
        let value = edit(&mut saved)?;
        self.commit_settings(saved)?;
        Ok(value)
    }

    pub fn sweep(&mut self) -> Result<Vec<Task>, AppError> {
        DeadlineSweeper::new(self.settings.sweep_interval()).sweep(&mut self.store, self.clock.as_ref())
    }

    /// Sweeps on the configured interval, notifying for every task that
    /// expires. `observe` sees the reloaded store and the tick's instant.
    pub fn watch<O, Z>(
        &mut self,
        max_ticks: Option<u64>,
        notifier: &dyn Notifier,
        mut observe: O,
        sleep: Z,
    ) -> Result<u64, AppError>
    where
        O: FnMut(&TaskStore, &NotificationOutcome, OffsetDateTime),
        Z: FnMut(Duration),
    {
        let path = self.layout.tasks_path();
        let sweeper = DeadlineSweeper::new(self.settings.sweep_interval());
        let ticks = sweeper.run(
            self.clock.as_ref(),
            max_ticks,
            || TaskStore::open(&path),
            |store, expired, now| observe(store, &notify_expired(expired, notifier), now),
            sleep,
        )?;
        self.store = TaskStore::open(&path)?;
        Ok(ticks)
    }

    fn commit_settings(&mut self, saved: Settings) -> Result<(), AppError> {
        let effective = merge_overrides(&saved, &self.overrides)?;
        save_settings(&self.layout.settings_path(), &saved)?;
        self.saved_settings = saved;
        self.settings = effective;
        Ok(())
    }

    fn count_deletion(&mut self, deleted: Option<Task>) -> Result<Option<Task>, AppError> {
        if deleted.is_some() {
            self.stats.record_deleted();
            self.save_stats()?;
        }
        Ok(deleted)
    }

    fn save_stats(&self) -> Result<(), AppError> {
        json_store::write_record(&self.layout.stats_path(), &self.stats)
    }
}

pub fn notify_expired(tasks: &[Task], notifier: &dyn Notifier) -> NotificationOutcome {
    let mut notified = Vec::new();
    let mut failures = Vec::new();

    for task in tasks {
        match notifier.deadline_missed(task) {
            Ok(()) => notified.push(task.clone()),
            Err(err) => failures.push(NotificationFailure {
                task_id: task.id.clone(),
                error: err,
            }),
        }
    }

    NotificationOutcome {
        tasks: notified,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::{TaskApi, notify_expired};
    use crate::clock::{Clock, FixedClock};
    use crate::config::{MentorMode, parse_setting_override};
    use crate::error::AppError;
    use crate::judge::{DeletionRoute, JudgeState};
    use crate::mentor;
    use crate::model::{Task, TaskStatus, UserStats};
    use crate::notify::Notifier;
    use crate::oracle::LocalOracle;
    use crate::storage::{StoreLayout, json_store};
    use crate::voice::VoiceOutcome;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::{SystemTime, UNIX_EPOCH};
    use time::OffsetDateTime;
    use time::macros::datetime;

    fn temp_dir(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("focus-{nanos}-{name}"))
    }

    /// Shares one instant between the api and the test body.
    #[derive(Clone)]
    struct SharedClock(Rc<FixedClock>);

    impl Clock for SharedClock {
        fn now(&self) -> OffsetDateTime {
            self.0.now()
        }

        fn today(&self) -> time::Date {
            self.0.today()
        }
    }

    fn open(root: &PathBuf, clock: &SharedClock) -> TaskApi {
        TaskApi::open(StoreLayout::new(root), Vec::new(), Box::new(clock.clone())).unwrap()
    }

    fn shared_clock() -> SharedClock {
        SharedClock(Rc::new(FixedClock::new(datetime!(2025-12-20 12:00 UTC))))
    }

    #[test]
    fn creating_a_task_counts_but_does_not_complete() {
        let root = temp_dir("api-create");
        let clock = shared_clock();
        let mut api = open(&root, &clock);

        let task = api.add_task("Write report", "", None).unwrap();
        let reopened = open(&root, &clock);
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(reopened.store().pending().len(), 1);
        assert_eq!(reopened.stats().total_created, 1);
        assert_eq!(reopened.stats().total_completed, 0);
    }

    #[test]
    fn opening_sweeps_expired_deadlines() {
        let root = temp_dir("api-sweep");
        let clock = shared_clock();
        let mut api = open(&root, &clock);
        let deadline = api.deadline_in(time::Duration::seconds(1)).unwrap();
        let task = api.add_task("late", "", Some(deadline)).unwrap();

        clock.0.advance(time::Duration::seconds(2));
        let reopened = open(&root, &clock);
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(reopened.expired_on_open().len(), 1);
        assert_eq!(reopened.get(&task.id).unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn deadline_past_the_calendar_range_is_invalid_input() {
        let root = temp_dir("api-far-deadline");
        let clock = shared_clock();
        let api = open(&root, &clock);
        std::fs::remove_dir_all(&root).ok();

        let err = api.deadline_in(time::Duration::weeks(99_999_999)).unwrap_err();

        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn completion_updates_streak_and_counter() {
        let root = temp_dir("api-complete");
        let clock = shared_clock();
        let mut api = open(&root, &clock);
        let task = api.add_task("Gym", "", None).unwrap();

        let mut flow = api.begin_completion(&task.id).unwrap().unwrap();
        flow.answer_honesty(true).unwrap();
        let done = api.finish_completion(flow, None).unwrap().unwrap();
        let stats: UserStats = json_store::read_record(&api.layout().stats_path())
            .unwrap()
            .unwrap();
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.completion_proof, None);
        assert_eq!(stats.total_completed, 1);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.last_completion_date.as_deref(), Some("2025-12-20"));
    }

    #[test]
    fn judged_deletion_counts_once_and_purge_does_not() {
        let root = temp_dir("api-judge");
        let clock = shared_clock();
        let mut api = open(&root, &clock);
        let task = api.add_task("Write report", "", None).unwrap();
        let oracle = LocalOracle::new();

        assert_eq!(api.deletion_route(&task.id), Some(DeletionRoute::Judge));
        let mut session = api.open_deletion(&task.id).unwrap().unwrap();
        assert_eq!(session.submit("tired", &oracle).unwrap(), JudgeState::Inquiry);
        assert_eq!(
            session.submit("yes I promise to come back", &oracle).unwrap(),
            JudgeState::Approved
        );
        api.execute_deletion(session).unwrap().unwrap();

        assert!(api.store().pending().is_empty());
        assert_eq!(api.store().bin().len(), 1);
        assert_eq!(api.deletion_route(&task.id), None);

        api.purge(&task.id).unwrap().unwrap();
        std::fs::remove_dir_all(&root).ok();

        assert!(api.store().tasks().is_empty());
        assert_eq!(api.stats().total_deleted, 1);
    }

    #[test]
    fn restoring_a_completed_task_returns_it_to_completed() {
        let root = temp_dir("api-restore");
        let clock = shared_clock();
        let mut api = open(&root, &clock);
        let task = api.add_task("done", "", None).unwrap();
        let mut flow = api.begin_completion(&task.id).unwrap().unwrap();
        flow.answer_honesty(true).unwrap();
        api.finish_completion(flow, None).unwrap();

        assert_eq!(api.deletion_route(&task.id), Some(DeletionRoute::SimpleConfirm));
        api.confirm_simple_delete(&task.id, true).unwrap().unwrap();
        let restored = api.restore(&task.id).unwrap().unwrap();
        std::fs::remove_dir_all(&root).ok();

        assert!(restored.deleted_at.is_none());
        assert_eq!(restored.status, TaskStatus::Completed);
        assert_eq!(api.store().completed().len(), 1);
        assert!(api.store().bin().is_empty());
    }

    #[test]
    fn voice_respects_the_input_toggle() {
        let root = temp_dir("api-voice");
        let clock = shared_clock();
        let mut api = open(&root, &clock);

        let outcome = api
            .add_from_voice(&LocalOracle::new(), "call mom in 2 hours")
            .unwrap();
        assert!(matches!(outcome, VoiceOutcome::Added(_)));
        assert_eq!(api.stats().total_created, 1);

        api.update_setting("voice_input=off").unwrap();
        let err = api
            .add_from_voice(&LocalOracle::new(), "call dad")
            .unwrap_err();
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn overrides_apply_for_one_run_without_being_saved() {
        let root = temp_dir("api-overrides");
        let clock = shared_clock();
        let overrides = vec![parse_setting_override("mentor_mode=random").unwrap()];
        let mut api =
            TaskApi::open(StoreLayout::new(&root), overrides, Box::new(clock.clone())).unwrap();
        assert_eq!(api.settings().mentor_mode, MentorMode::Random);

        api.update_setting("voice_response=off").unwrap();
        assert_eq!(api.settings().mentor_mode, MentorMode::Random);
        let reopened = open(&root, &clock);
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(reopened.settings().mentor_mode, MentorMode::Selected);
        assert!(!reopened.settings().voice_response);
    }

    #[test]
    fn mentor_edits_are_persisted() {
        let root = temp_dir("api-mentors");
        let clock = shared_clock();
        let mut api = open(&root, &clock);

        let added = api
            .update_mentors(|settings| mentor::add_mentor(settings, "Serena", None))
            .unwrap();
        let reopened = open(&root, &clock);
        std::fs::remove_dir_all(&root).ok();

        assert!(reopened.settings().mentors.iter().any(|m| m.id == added.id));
    }

    #[test]
    fn watch_reloads_and_notifies_each_expiry_once() {
        struct Recording(RefCell<Vec<String>>);

        impl Notifier for Recording {
            fn deadline_missed(&self, task: &Task) -> Result<(), AppError> {
                self.0.borrow_mut().push(task.title.clone());
                Ok(())
            }
        }

        let root = temp_dir("api-watch");
        let clock = shared_clock();
        let mut api = open(&root, &clock);
        let deadline = api.deadline_in(time::Duration::milliseconds(1_500)).unwrap();
        let task = api.add_task("soon", "", Some(deadline)).unwrap();
        let notifier = Recording(RefCell::new(Vec::new()));
        let mut instants = Vec::new();

        let ticks = api
            .watch(
                Some(4),
                &notifier,
                |_, _, now| instants.push(now),
                |_| clock.0.advance(time::Duration::seconds(1)),
            )
            .unwrap();
        std::fs::remove_dir_all(&root).ok();

        assert_eq!(ticks, 4);
        assert_eq!(*notifier.0.borrow(), vec!["soon"]);
        assert_eq!(instants[0], datetime!(2025-12-20 12:00 UTC));
        assert_eq!(api.get(&task.id).unwrap().status, TaskStatus::Failed);
    }

    #[test]
    fn notification_failures_are_collected() {
        struct Broken;

        impl Notifier for Broken {
            fn deadline_missed(&self, _task: &Task) -> Result<(), AppError> {
                Err(AppError::io("no notification daemon"))
            }
        }

        let clock = FixedClock::new(datetime!(2025-12-20 12:00 UTC));
        let (mut store, _) = crate::store::testing::memory_store();
        let task = store.create(&clock, "late", "", None).unwrap();

        let outcome = notify_expired(&[task.clone()], &Broken);

        assert!(outcome.tasks.is_empty());
        assert_eq!(outcome.failures[0].task_id, task.id);
    }
}
