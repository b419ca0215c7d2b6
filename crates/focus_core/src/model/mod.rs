mod stats;
mod task;

pub use stats::UserStats;
pub use task::{Task, TaskPatch, TaskStatus};
