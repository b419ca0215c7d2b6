use std::cell::Cell;
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime, UtcOffset};

pub trait Clock {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().to_offset(local_offset()).date()
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

pub struct FixedClock {
    instant: Cell<OffsetDateTime>,
}

impl FixedClock {
    pub fn new(instant: OffsetDateTime) -> Self {
        Self {
            instant: Cell::new(instant),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.instant.set(self.instant.get() + by);
    }

    pub fn set(&self, instant: OffsetDateTime) {
        self.instant.set(instant);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.instant.get()
    }

    fn today(&self) -> Date {
        self.instant.get().date()
    }
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// `YYYY-MM-DD`, the key used for day-granular comparisons.
pub fn day_key(date: Date) -> String {
    let format = format_description!("[year]-[month]-[day]");
    date.format(&format).unwrap_or_else(|_| date.to_string())
}
