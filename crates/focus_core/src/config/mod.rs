use crate::error::AppError;
use crate::storage::json_store;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_MENTOR_ID: &str = "mentor-virat-kohli";
const DEFAULT_MENTOR_NAME: &str = "Virat Kohli";

#[derive(Debug, Clone)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
    pub alert: &'static str,
    pub reset: &'static str,
}

impl Palette {
    pub fn accentize(&self, text: &str) -> String {
        paint(self.accent, self.reset, text)
    }

    pub fn mutedize(&self, text: &str) -> String {
        paint(self.muted, self.reset, text)
    }

    pub fn alertize(&self, text: &str) -> String {
        paint(self.alert, self.reset, text)
    }
}

fn paint(color: &str, reset: &str, text: &str) -> String {
    if color.is_empty() {
        text.to_string()
    } else {
        format!("{color}{text}{reset}")
    }
}

pub fn palette_for_theme(theme: Theme) -> Palette {
    match theme {
        Theme::Dark => Palette {
            accent: "\x1b[38;5;141m",
            muted: "\x1b[38;5;250m",
            alert: "\x1b[38;5;203m",
            reset: "\x1b[0m",
        },
        Theme::Light => Palette {
            accent: "",
            muted: "",
            alert: "",
            reset: "",
        },
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

pub fn canonical_theme_name(raw: &str) -> Option<Theme> {
    match canonicalize_name(raw).as_deref() {
        None | Some("light") | Some("default") | Some("vanilla") => Some(Theme::Light),
        Some("dark") | Some("dark_mode") | Some("darkmode") | Some("noir") => Some(Theme::Dark),
        Some(_) => None,
    }
}

/// Lowercases and collapses punctuation runs to single underscores.
fn canonicalize_name(raw: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelChoice {
    #[default]
    #[serde(rename = "gemini-1.5-flash")]
    Flash,
    #[serde(rename = "gemini-1.5-pro")]
    Pro,
    #[serde(rename = "gemini-2.0")]
    Gemini2,
    #[serde(rename = "gemini-exp")]
    Experimental,
}

impl ModelChoice {
    pub fn parse(raw: &str) -> Option<Self> {
        match canonicalize_name(raw)?.as_str() {
            "gemini_1_5_flash" | "flash" => Some(Self::Flash),
            "gemini_1_5_pro" | "pro" => Some(Self::Pro),
            "gemini_2_0" | "gemini_2" | "2_0" => Some(Self::Gemini2),
            "gemini_exp" | "exp" | "experimental" => Some(Self::Experimental),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Flash => "gemini-1.5-flash",
            Self::Pro => "gemini-1.5-pro",
            Self::Gemini2 => "gemini-2.0",
            Self::Experimental => "gemini-exp",
        }
    }

    /// Model name sent to the backend for this user-facing choice.
    pub fn api_model(self) -> &'static str {
        match self {
            Self::Flash => "gemini-2.5-flash",
            Self::Pro => "gemini-3-pro-preview",
            Self::Gemini2 => "gemini-2.0-flash-exp",
            Self::Experimental => "gemini-exp-1206",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleBackend {
    #[default]
    Auto,
    Gemini,
    Local,
}

impl OracleBackend {
    pub fn parse(raw: &str) -> Option<Self> {
        match canonicalize_name(raw)?.as_str() {
            "auto" => Some(Self::Auto),
            "gemini" | "remote" => Some(Self::Gemini),
            "local" | "offline" => Some(Self::Local),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Gemini => "gemini",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentorMode {
    #[default]
    Selected,
    Random,
}

impl MentorMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Selected => "selected",
            Self::Random => "random",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mentor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub quotes: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl Mentor {
    pub fn default_mentor() -> Self {
        Self {
            id: DEFAULT_MENTOR_ID.to_string(),
            name: DEFAULT_MENTOR_NAME.to_string(),
            photo: None,
            quotes: Vec::new(),
            is_default: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub model: ModelChoice,
    #[serde(default)]
    pub oracle: OracleBackend,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "enabled")]
    pub voice_input: bool,
    #[serde(default = "enabled")]
    pub voice_response: bool,
    #[serde(default = "default_mentors")]
    pub mentors: Vec<Mentor>,
    #[serde(default = "default_active_mentor")]
    pub active_mentor_id: String,
    #[serde(default)]
    pub mentor_mode: MentorMode,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_approval_delay_ms")]
    pub approval_delay_ms: u64,
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,
}

fn enabled() -> bool {
    true
}

fn default_mentors() -> Vec<Mentor> {
    vec![Mentor::default_mentor()]
}

fn default_active_mentor() -> String {
    DEFAULT_MENTOR_ID.to_string()
}

fn default_sweep_interval_secs() -> u64 {
    1
}

fn default_approval_delay_ms() -> u64 {
    2000
}

fn default_oracle_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: ModelChoice::default(),
            oracle: OracleBackend::default(),
            theme: Theme::default(),
            voice_input: true,
            voice_response: true,
            mentors: default_mentors(),
            active_mentor_id: default_active_mentor(),
            mentor_mode: MentorMode::default(),
            sweep_interval_secs: default_sweep_interval_secs(),
            approval_delay_ms: default_approval_delay_ms(),
            oracle_timeout_secs: default_oracle_timeout_secs(),
        }
    }
}

impl Settings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn approval_delay(&self) -> Duration {
        Duration::from_millis(self.approval_delay_ms)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs.max(1))
    }

    pub fn apply(&mut self, key: SettingKey, value: &str) -> Result<(), AppError> {
        match key {
            SettingKey::Theme => {
                self.theme = canonical_theme_name(value)
                    .ok_or_else(|| AppError::invalid_input(format!("unknown theme '{value}'")))?;
            }
            SettingKey::Model => {
                self.model = ModelChoice::parse(value)
                    .ok_or_else(|| AppError::invalid_input(format!("unknown model '{value}'")))?;
            }
            SettingKey::Oracle => {
                self.oracle = OracleBackend::parse(value)
                    .ok_or_else(|| AppError::invalid_input(format!("unknown oracle '{value}'")))?;
            }
            SettingKey::VoiceInput => self.voice_input = parse_flag(value)?,
            SettingKey::VoiceResponse => self.voice_response = parse_flag(value)?,
            SettingKey::MentorMode => {
                self.mentor_mode = match canonicalize_name(value).as_deref() {
                    Some("random") => MentorMode::Random,
                    Some("selected") | Some("active") => MentorMode::Selected,
                    _ => {
                        return Err(AppError::invalid_input(format!(
                            "unknown mentor mode '{value}'"
                        )));
                    }
                };
            }
            SettingKey::SweepIntervalSecs => self.sweep_interval_secs = parse_number(value)?,
            SettingKey::ApprovalDelayMs => self.approval_delay_ms = parse_number(value)?,
            SettingKey::OracleTimeoutSecs => self.oracle_timeout_secs = parse_number(value)?,
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool, AppError> {
    match canonicalize_name(value).as_deref() {
        Some("true") | Some("on") | Some("yes") | Some("1") => Ok(true),
        Some("false") | Some("off") | Some("no") | Some("0") => Ok(false),
        _ => Err(AppError::invalid_input(format!(
            "expected on/off, got '{value}'"
        ))),
    }
}

fn parse_number(value: &str) -> Result<u64, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::invalid_input(format!("expected a number, got '{value}'")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Theme,
    Model,
    Oracle,
    VoiceInput,
    VoiceResponse,
    MentorMode,
    SweepIntervalSecs,
    ApprovalDelayMs,
    OracleTimeoutSecs,
}

impl SettingKey {
    fn parse(raw: &str) -> Option<Self> {
        match canonicalize_name(raw)?.as_str() {
            "theme" => Some(Self::Theme),
            "model" | "gemini_model" => Some(Self::Model),
            "oracle" => Some(Self::Oracle),
            "voice_input" => Some(Self::VoiceInput),
            "voice_response" => Some(Self::VoiceResponse),
            "mentor_mode" => Some(Self::MentorMode),
            "sweep_interval_secs" | "sweep_interval" => Some(Self::SweepIntervalSecs),
            "approval_delay_ms" | "approval_delay" => Some(Self::ApprovalDelayMs),
            "oracle_timeout_secs" | "oracle_timeout" => Some(Self::OracleTimeoutSecs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingOverride {
    pub key: SettingKey,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` assignment.
pub fn parse_setting_override(raw: &str) -> Result<SettingOverride, AppError> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| AppError::invalid_input("override must be in KEY=VALUE format"))?;

    let name = canonicalize_name(key_raw)
        .ok_or_else(|| AppError::invalid_input("override key cannot be empty"))?;
    let key = SettingKey::parse(&name)
        .ok_or_else(|| AppError::invalid_input(format!("unknown setting '{name}'")))?;

    Ok(SettingOverride {
        key,
        value: value_raw.trim().to_string(),
    })
}

pub fn merge_overrides(
    base: &Settings,
    overrides: &[SettingOverride],
) -> Result<Settings, AppError> {
    let mut merged = base.clone();
    for item in overrides {
        merged.apply(item.key, &item.value)?;
    }
    Ok(merged)
}

#[derive(Debug, Clone)]
pub struct SettingsLoad {
    pub settings: Settings,
    pub error: Option<AppError>,
}

/// Reads settings, falling back to defaults when the file is missing or bad.
pub fn load_settings_with_fallback(path: &Path) -> SettingsLoad {
    match json_store::read_record::<Settings>(path) {
        Ok(Some(settings)) => SettingsLoad {
            settings,
            error: None,
        },
        Ok(None) => SettingsLoad {
            settings: Settings::default(),
            error: None,
        },
        Err(err) => SettingsLoad {
            settings: Settings::default(),
            error: Some(err),
        },
    }
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<(), AppError> {
    json_store::write_record(path, settings)
}
