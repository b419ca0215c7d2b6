pub mod clock;
pub mod completion;
pub mod config;
pub mod error;
pub mod judge;
pub mod mentor;
pub mod model;
pub mod notify;
pub mod oracle;
pub mod storage;
pub mod store;
pub mod sweeper;
pub mod task_api;
pub mod voice;

#[cfg(test)]
mod tests {
    use crate::error::AppError;
    use crate::model::{Task, TaskStatus};
    use time::macros::datetime;

    #[test]
    fn task_serializes_with_rfc3339_timestamps() {
        let task = Task {
            id: "task-1".to_string(),
            title: "demo".to_string(),
            description: String::new(),
            deadline: None,
            created_at: datetime!(2025-12-20 00:00 UTC),
            status: TaskStatus::Pending,
            completion_proof: None,
            deleted_at: None,
        };

        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["created_at"], "2025-12-20T00:00:00Z");
        assert_eq!(json["status"], "pending");
        assert!(json["deadline"].is_null());
    }

    #[test]
    fn app_error_exposes_code() {
        let err = AppError::invalid_input("missing title");
        assert_eq!(err.code(), "invalid_input");
        assert_eq!(err.to_string(), "invalid_input - missing title");
    }
}
