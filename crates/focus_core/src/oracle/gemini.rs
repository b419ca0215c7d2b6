use super::{JudgeResult, Oracle, ParsedTask};
use crate::config::ModelChoice;
use crate::error::AppError;
use serde_json::{Value, json};
use std::time::Duration;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Blocking client for the Gemini `generateContent` endpoint.
pub struct GeminiOracle {
    api_key: String,
    model: ModelChoice,
    timeout: Duration,
}

impl GeminiOracle {
    pub fn new(api_key: String, model: ModelChoice, timeout: Duration) -> Self {
        Self {
            api_key,
            model,
            timeout,
        }
    }

    fn generate(&self, prompt: &str, schema: Option<Value>) -> Result<String, AppError> {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if let Some(schema) = schema {
            body["generationConfig"] = json!({
                "responseMimeType": "application/json",
                "responseSchema": schema,
            });
        }
        let body = serde_json::to_string(&body)
            .map_err(|err| AppError::oracle(format!("request encode failed: {err}")))?;

        let url = format!("{API_BASE}/{}:generateContent", self.model.api_model());
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();

        tracing::debug!(model = self.model.api_model(), "gemini request");
        let response = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("x-goog-api-key", &self.api_key)
            .send_string(&body);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let detail = response.into_string().unwrap_or_default();
                return Err(AppError::oracle(format!("gemini returned HTTP {code}: {detail}")));
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(AppError::oracle(format!("gemini unreachable: {transport}")));
            }
        };

        let text = response
            .into_string()
            .map_err(|err| AppError::oracle(format!("response read failed: {err}")))?;
        extract_text(&text)
    }
}

/// Pulls the first candidate's text out of a `generateContent` response.
fn extract_text(raw: &str) -> Result<String, AppError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| AppError::oracle(format!("malformed response: {err}")))?;

    let text: String = value["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::oracle("response carried no text"));
    }
    Ok(trimmed.to_string())
}

fn voice_prompt(transcript: &str) -> String {
    format!(
        "Extract a task from this voice command: \"{transcript}\".\n\
         If the user specifies a time (e.g., \"in 2 hours\", \"by 5pm\"), calculate the seconds \
         from now until that time and return it as deadlineRelativeSeconds.\n\
         If no description is provided, use a brief summary of the title.\n\
         Return JSON."
    )
}

fn voice_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "description": { "type": "STRING" },
            "deadlineRelativeSeconds": {
                "type": "NUMBER",
                "description": "Seconds from now until deadline, or null if no deadline",
            },
        },
        "required": ["title", "description"],
    })
}

fn quote_prompt(name: &str) -> String {
    format!(
        "Give a short, punchy, 1-sentence motivational quote from {name}.\n\
         Tone: High performance, Discipline, Aggression, Focus.\n\
         CRITICAL: You MUST end the quote exactly with this format: \" - {name}\".\n\
         Example Output: \"Self-belief and hard work will always earn you success. - {name}\""
    )
}

fn judge_prompt(title: &str, reason: &str, history: &[String]) -> String {
    let history = serde_json::to_string(history).unwrap_or_else(|_| "[]".to_string());
    format!(
        "You are a Strict Productivity Judge. A user wants to delete the task: \"{title}\".\n\
         Current reason provided: \"{reason}\".\n\
         Conversation History: {history}\n\n\
         Your goal: Prevent the user from being lazy, but distinguish between laziness and \
         genuine burnout.\n\n\
         CRITICAL HEALTH EXCEPTION RULE:\n\
         If the user mentions: tired, sleep, sleepy, fatigue, sick, stress, exhaustion, \
         headache, mental burnout.\n\
         1. If you have ALREADY asked \"Do you promise to return to this task later? Yes or No?\" \
         and the user answered \"Yes\" or \"No\" -> APPROVED immediately.\n\
         2. If you have NOT asked it yet -> Return 'inquiry'. Message MUST be exactly: \
         \"{inquiry}\". Do not ask anything else.\n\n\
         NORMAL RULES (Only if not a health exception):\n\
         1. If reason is short, empty, emotional (without valid fatigue), or lazy -> REJECT \
         immediately.\n\
         2. If user answers probing questions reasonably and shows self-awareness -> APPROVED.\n\
         3. If reason is strictly logical (e.g., \"Duplicate task\", \"Already done\") -> APPROVED.\n\
         4. If user fails to justify after questioning -> REJECT.\n\
         5. If ambiguous -> Return 'inquiry' with a probing question.\n\n\
         Return JSON.",
        inquiry = super::HEALTH_INQUIRY,
    )
}

fn judge_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "verdict": { "type": "STRING", "enum": ["approved", "rejected", "inquiry"] },
            "message": { "type": "STRING", "description": "The judge's response to the user." },
            "question": {
                "type": "STRING",
                "description": "The follow-up question if verdict is inquiry.",
            },
        },
        "required": ["verdict", "message"],
    })
}

impl Oracle for GeminiOracle {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn parse_voice_command(&self, transcript: &str) -> Result<Option<ParsedTask>, AppError> {
        let text = self.generate(&voice_prompt(transcript), Some(voice_schema()))?;
        let parsed: ParsedTask = serde_json::from_str(&text)
            .map_err(|err| AppError::oracle(format!("voice reply is not a task: {err}")))?;
        if parsed.title.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(parsed))
    }

    fn personalized_quote(&self, mentor_name: &str) -> Result<String, AppError> {
        self.generate(&quote_prompt(mentor_name), None)
    }

    fn judge_deletion(
        &self,
        title: &str,
        reason: &str,
        history: &[String],
    ) -> Result<JudgeResult, AppError> {
        let text = self.generate(&judge_prompt(title, reason, history), Some(judge_schema()))?;
        serde_json::from_str(&text)
            .map_err(|err| AppError::oracle(format!("verdict is not valid JSON: {err}")))
    }
}
