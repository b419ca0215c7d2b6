use crate::clock::day_key;
use serde::{Deserialize, Serialize};
use time::{Date, Duration};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    #[serde(default)]
    pub total_created: u64,
    #[serde(default)]
    pub total_completed: u64,
    #[serde(default)]
    pub total_deleted: u64,
    #[serde(default)]
    pub current_streak: u32,
    /// Calendar day (`YYYY-MM-DD`) of the latest completion.
    #[serde(default)]
    pub last_completion_date: Option<String>,
}

impl UserStats {
    pub fn record_created(&mut self) {
        self.total_created += 1;
    }

    pub fn record_deleted(&mut self) {
        self.total_deleted += 1;
    }

    /// Counts a completion made on `today`.
    ///
    /// The streak compares day strings: a second completion on the same day
    /// leaves it alone, a completion the day after the last one extends it,
    /// and anything else starts over at one.
    pub fn record_completed(&mut self, today: Date) {
        self.total_completed += 1;

        let today_key = day_key(today);
        let yesterday_key = today.checked_sub(Duration::days(1)).map(day_key);

        match self.last_completion_date.as_deref() {
            Some(last) if last == today_key => {}
            Some(last) if Some(last) == yesterday_key.as_deref() => {
                self.current_streak += 1;
            }
            _ => self.current_streak = 1,
        }

        self.last_completion_date = Some(today_key);
    }

    pub fn completion_rate(&self) -> u32 {
        if self.total_created == 0 {
            return 0;
        }
        ((self.total_completed as f64 / self.total_created as f64) * 100.0).round() as u32
    }
}
