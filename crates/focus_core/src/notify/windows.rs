use crate::error::AppError;
use crate::model::Task;
use crate::notify::{
    APP_NAME, Notifier, activation_argument, launch_show, missed_body, parse_activation_argument,
};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn deadline_missed(&self, task: &Task) -> Result<(), AppError> {
        let task_id = task.id.clone();
        let action = activation_argument(&task.id);

        Toast::new(Toast::POWERSHELL_APP_ID)
            .title(&format!("{APP_NAME}: deadline missed"))
            .text1(&missed_body(task))
            .add_button("Open", &action)
            .on_activated(move |args| {
                let target = args
                    .as_deref()
                    .and_then(parse_activation_argument)
                    .unwrap_or_else(|| task_id.clone());
                if let Err(err) = launch_show(&target) {
                    tracing::warn!(error = %err, "could not open task from notification");
                }
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
