use crate::error::AppError;
use crate::model::Task;
use crate::notify::{APP_NAME, Notifier, activation_argument, launch_show, missed_body};
use notify_rust::Notification;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn deadline_missed(&self, task: &Task) -> Result<(), AppError> {
        let action = activation_argument(&task.id);
        let handle = Notification::new()
            .appname(APP_NAME)
            .summary("Deadline missed")
            .body(&missed_body(task))
            .action(&action, "Open")
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        let task_id = task.id.clone();
        std::thread::spawn(move || {
            handle.wait_for_action(|selected| {
                if selected == action || selected == "default" {
                    if let Err(err) = launch_show(&task_id) {
                        tracing::warn!(error = %err, "could not open task from notification");
                    }
                }
            });
        });

        Ok(())
    }
}
