use crate::clock::Clock;
use crate::config::Settings;
use crate::error::AppError;
use crate::model::Task;
use crate::oracle::Oracle;
use crate::store::TaskStore;
use std::process::{Command, Stdio};

pub const DID_NOT_CATCH: &str = "I didn't catch that.";
pub const TASK_VERIFIED: &str = "Task verified. Excellent work.";
pub const TASK_REMOVED: &str = "Task removed.";

pub fn added_line(title: &str) -> String {
    format!("Added {title}")
}

pub trait Speaker {
    fn say(&self, text: &str);
}

pub struct NoopSpeaker;

impl Speaker for NoopSpeaker {
    fn say(&self, _text: &str) {}
}

pub struct CommandSpeaker {
    program: &'static str,
}

impl CommandSpeaker {
    pub fn for_platform() -> Self {
        let program = if cfg!(target_os = "macos") {
            "say"
        } else if cfg!(windows) {
            "powershell"
        } else {
            "espeak"
        };
        Self { program }
    }

    fn command(&self, text: &str) -> Command {
        let mut command = Command::new(self.program);
        if self.program == "powershell" {
            let escaped = text.replace('\'', "''");
            let script = format!(
                "Add-Type -AssemblyName System.Speech; \
                 (New-Object System.Speech.Synthesis.SpeechSynthesizer).Speak('{escaped}')"
            );
            command.args(["-NoProfile", "-Command", script.as_str()]);
        } else {
            command.arg(text);
        }
        command
    }
}

impl Speaker for CommandSpeaker {
    fn say(&self, text: &str) {
        let spawned = self
            .command(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        if let Err(err) = spawned {
            tracing::debug!(program = self.program, error = %err, "speech unavailable");
        }
    }
}

/// Silent when voice responses are off or `FOCUS_DISABLE_SPEECH` is set.
pub fn speaker_for(settings: &Settings) -> Box<dyn Speaker> {
    if !settings.voice_response || std::env::var_os("FOCUS_DISABLE_SPEECH").is_some() {
        return Box::new(NoopSpeaker);
    }
    Box::new(CommandSpeaker::for_platform())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    Added(Task),
    NotUnderstood,
}

impl VoiceOutcome {
    pub fn reply(&self) -> String {
        match self {
            VoiceOutcome::Added(task) => added_line(&task.title),
            VoiceOutcome::NotUnderstood => DID_NOT_CATCH.to_string(),
        }
    }
}

/// Parse failures and out-of-range deadlines yield `NotUnderstood`.
pub fn task_from_transcript(
    store: &mut TaskStore,
    clock: &dyn Clock,
    oracle: &dyn Oracle,
    transcript: &str,
) -> Result<VoiceOutcome, AppError> {
    let transcript = transcript.trim();
    if transcript.is_empty() {
        return Err(AppError::invalid_input("transcript is empty"));
    }

    let parsed = match oracle.parse_voice_command(transcript) {
        Ok(Some(parsed)) if !parsed.title.trim().is_empty() => parsed,
        Ok(_) => return Ok(VoiceOutcome::NotUnderstood),
        Err(err) => {
            tracing::warn!(error = %err, "voice command not parsed");
            return Ok(VoiceOutcome::NotUnderstood);
        }
    };

    let deadline = match parsed
        .deadline_relative_seconds
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
    {
        None => None,
        Some(seconds) => {
            let Some(deadline) = time::Duration::checked_seconds_f64(seconds)
                .and_then(|offset| clock.now().checked_add(offset))
            else {
                tracing::warn!(seconds, "voice deadline out of range");
                return Ok(VoiceOutcome::NotUnderstood);
            };
            Some(deadline)
        }
    };

    let task = store.create(clock, &parsed.title, &parsed.description, deadline)?;
    Ok(VoiceOutcome::Added(task))
}
