mod gemini;
mod local;

pub use gemini::GeminiOracle;
pub use local::LocalOracle;

use crate::config::{OracleBackend, Settings};
use crate::error::AppError;
use serde::{Deserialize, Serialize};

/// Fixed question asked when a deletion reason mentions health or fatigue.
pub const HEALTH_INQUIRY: &str =
    "Your health comes first. Do you promise to return to this task later? Yes or No?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Rejected,
    Inquiry,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::Rejected => "rejected",
            Verdict::Inquiry => "inquiry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeResult {
    pub verdict: Verdict,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

impl JudgeResult {
    pub fn new<M: Into<String>>(verdict: Verdict, message: M) -> Self {
        Self {
            verdict,
            message: message.into(),
            question: None,
        }
    }

    pub fn with_question<Q: Into<String>>(mut self, question: Q) -> Self {
        self.question = Some(question.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deadline_relative_seconds: Option<f64>,
}

pub trait Oracle {
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the transcript holds no recognisable task.
    fn parse_voice_command(&self, transcript: &str) -> Result<Option<ParsedTask>, AppError>;

    fn personalized_quote(&self, mentor_name: &str) -> Result<String, AppError>;

    fn judge_deletion(
        &self,
        title: &str,
        reason: &str,
        history: &[String],
    ) -> Result<JudgeResult, AppError>;
}

/// Picks the backend from `FOCUS_ORACLE`, falling back to the settings.
pub fn select_oracle(settings: &Settings) -> Box<dyn Oracle> {
    let backend = match std::env::var("FOCUS_ORACLE") {
        Ok(raw) => OracleBackend::parse(&raw).unwrap_or_else(|| {
            tracing::warn!(value = %raw, "ignoring unknown FOCUS_ORACLE");
            settings.oracle
        }),
        Err(_) => settings.oracle,
    };
    build_oracle(backend, api_key_from_env(), settings)
}

pub fn build_oracle(
    backend: OracleBackend,
    api_key: Option<String>,
    settings: &Settings,
) -> Box<dyn Oracle> {
    match (backend, api_key) {
        (OracleBackend::Local, _) => Box::new(LocalOracle::new()),
        (OracleBackend::Gemini | OracleBackend::Auto, Some(key)) => Box::new(GeminiOracle::new(
            key,
            settings.model,
            settings.oracle_timeout(),
        )),
        (OracleBackend::Gemini, None) => {
            tracing::warn!("gemini oracle requested without an API key; using local rules");
            Box::new(LocalOracle::new())
        }
        (OracleBackend::Auto, None) => Box::new(LocalOracle::new()),
    }
}

fn api_key_from_env() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}


#[cfg(test)]
mod tests {
    use super::{JudgeResult, ParsedTask, Verdict, build_oracle};
    use crate::config::{OracleBackend, Settings};

    #[test]
    fn judge_result_parses_backend_json() {
        let result: JudgeResult = serde_json::from_str(
            r#"{"verdict":"inquiry","message":"Why now?","question":"What changed?"}"#,
        )
        .unwrap();

        assert_eq!(result.verdict, Verdict::Inquiry);
        assert_eq!(result.question.as_deref(), Some("What changed?"));
    }

    #[test]
    fn parsed_task_accepts_camel_case_and_missing_deadline() {
        let parsed: ParsedTask =
            serde_json::from_str(r#"{"title":"Call mom","description":"Weekly call"}"#).unwrap();
        assert_eq!(parsed.deadline_relative_seconds, None);

        let parsed: ParsedTask = serde_json::from_str(
            r#"{"title":"Gym","description":"","deadlineRelativeSeconds":7200}"#,
        )
        .unwrap();
        assert_eq!(parsed.deadline_relative_seconds, Some(7200.0));
    }

    #[test]
    fn backend_selection_requires_a_key_for_gemini() {
        let settings = Settings::default();

        assert_eq!(build_oracle(OracleBackend::Auto, None, &settings).name(), "local");
        assert_eq!(
            build_oracle(OracleBackend::Auto, Some("k".into()), &settings).name(),
            "gemini"
        );
        assert_eq!(build_oracle(OracleBackend::Gemini, None, &settings).name(), "local");
        assert_eq!(
            build_oracle(OracleBackend::Local, Some("k".into()), &settings).name(),
            "local"
        );
    }
}
