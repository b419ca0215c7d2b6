use crate::clock::Clock;
use crate::error::AppError;
use crate::model::Task;
use crate::store::TaskStore;
use std::time::Duration;
use time::OffsetDateTime;

struct Sampled(OffsetDateTime);

impl Clock for Sampled {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

pub struct DeadlineSweeper {
    interval: Duration,
}

impl DeadlineSweeper {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn sweep(&self, store: &mut TaskStore, clock: &dyn Clock) -> Result<Vec<Task>, AppError> {
        let expired = store.expire_overdue(clock)?;
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "deadline sweep failed overdue tasks");
        }
        Ok(expired)
    }

    /// Reopens the store on every tick. Stops after `max_ticks` when given.
    pub fn run<S, O, Z>(
        &self,
        clock: &dyn Clock,
        max_ticks: Option<u64>,
        mut open: S,
        mut observe: O,
        mut sleep: Z,
    ) -> Result<u64, AppError>
    where
        S: FnMut() -> Result<TaskStore, AppError>,
        O: FnMut(&TaskStore, &[Task], OffsetDateTime),
        Z: FnMut(Duration),
    {
        let mut ticks = 0;
        loop {
            let sample = Sampled(clock.now());
            let mut store = open()?;
            let expired = self.sweep(&mut store, &sample)?;
            observe(&store, &expired, sample.0);
            ticks += 1;

            if max_ticks.is_some_and(|max| ticks >= max) {
                return Ok(ticks);
            }
            sleep(self.interval);
        }
    }
}

/// `HH:MM:SS`, prefixed with whole days when at least one remains.
pub fn format_countdown(left: time::Duration) -> String {
    let total = left.whole_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}
