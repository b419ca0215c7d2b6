//! Offline oracle: keyword rules for the judge, regex parsing for voice.

use super::{HEALTH_INQUIRY, JudgeResult, Oracle, ParsedTask, Verdict};
use crate::error::AppError;
use rand::seq::SliceRandom;
use regex::Regex;
use std::sync::LazyLock;

static RE_HEALTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(tired|sleep|sleepy|fatigue[d]?|sick|stress(?:ed)?|exhaust(?:ed|ion)|headache|burn(?:ed|t)?[\s-]?out)\b",
    )
    .unwrap()
});

static RE_LOGICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(duplicate[d]?|already\s+(?:done|finished|completed|handled)|no\s+longer\s+(?:needed|relevant|required)|not\s+needed\s+anymore|cancell?ed|obsolete|created\s+by\s+mistake|by\s+accident|typo)\b",
    )
    .unwrap()
});

static RE_LAZY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(lazy|boring|bored|meh|whatever|later|don'?t\s+(?:feel|want)|can'?t\s+be\s+bothered|not\s+in\s+the\s+mood)\b",
    )
    .unwrap()
});

static RE_RELATIVE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in|within)\s+(an?|\d{1,4})\s+(seconds?|secs?|minutes?|mins?|hours?|hrs?|days?|weeks?)\b")
        .unwrap()
});

static RE_LEADING_FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:please\s+)?(?:remind\s+me\s+to|add\s+(?:a\s+)?task\s+(?:to\s+)?|i\s+(?:need|have)\s+to|create\s+(?:a\s+)?task\s+(?:to\s+)?)\s*")
        .unwrap()
});

const BUILT_IN_QUOTES: &[&str] = &[
    "Discipline is choosing what you want most over what you want now.",
    "The work does not care how you feel. Do it anyway.",
    "Champions keep playing until they get it right.",
    "Focus on the next ball, not the last one.",
];

const PROBE_QUESTION: &str =
    "What exactly stops you from finishing it, and what will you do instead?";

/// Words a probed answer needs before it counts as reasoned.
const REASONED_ANSWER_WORDS: usize = 6;
/// A first reason shorter than this is treated as lazy.
const MIN_REASON_WORDS: usize = 4;

#[derive(Debug, Default)]
pub struct LocalOracle;

impl LocalOracle {
    pub fn new() -> Self {
        Self
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn seconds_for(amount: &str, unit: &str) -> Option<f64> {
    let amount: f64 = match amount.to_ascii_lowercase().as_str() {
        "a" | "an" => 1.0,
        digits => digits.parse().ok()?,
    };
    let unit = unit.to_ascii_lowercase();
    let scale = if unit.starts_with("sec") {
        1.0
    } else if unit.starts_with("min") {
        60.0
    } else if unit.starts_with('h') {
        3_600.0
    } else if unit.starts_with('d') {
        86_400.0
    } else {
        604_800.0
    };
    Some(amount * scale)
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Oracle for LocalOracle {
    fn name(&self) -> &'static str {
        "local"
    }

    fn parse_voice_command(&self, transcript: &str) -> Result<Option<ParsedTask>, AppError> {
        let deadline_relative_seconds = RE_RELATIVE_TIME
            .captures(transcript)
            .and_then(|caps| seconds_for(&caps[1], &caps[2]));

        let without_time = RE_RELATIVE_TIME.replace_all(transcript, " ");
        let without_filler = RE_LEADING_FILLER.replace(&without_time, "");
        let title = without_filler
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .trim_matches(|ch: char| ch.is_ascii_punctuation() || ch.is_whitespace())
            .to_string();

        if title.is_empty() {
            return Ok(None);
        }

        Ok(Some(ParsedTask {
            title: capitalize(&title),
            description: transcript.trim().to_string(),
            deadline_relative_seconds,
        }))
    }

    fn personalized_quote(&self, mentor_name: &str) -> Result<String, AppError> {
        let line = BUILT_IN_QUOTES
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(BUILT_IN_QUOTES[0]);
        Ok(format!("{line} - {mentor_name}"))
    }

    fn judge_deletion(
        &self,
        _title: &str,
        reason: &str,
        history: &[String],
    ) -> Result<JudgeResult, AppError> {
        let earlier = history.split_last().map(|(_, rest)| rest).unwrap_or(&[]);

        // The health question is asked exactly once; any answer to it passes.
        if earlier.iter().any(|previous| RE_HEALTH.is_match(previous)) {
            return Ok(JudgeResult::new(
                Verdict::Approved,
                "Rest and recover. The task is removed, but keep your promise.",
            ));
        }
        if RE_HEALTH.is_match(reason) {
            return Ok(JudgeResult::new(Verdict::Inquiry, HEALTH_INQUIRY));
        }

        if RE_LOGICAL.is_match(reason) {
            return Ok(JudgeResult::new(
                Verdict::Approved,
                "That is a legitimate reason. Deletion approved.",
            ));
        }

        if !earlier.is_empty() {
            return Ok(
                if !RE_LAZY.is_match(reason) && word_count(reason) >= REASONED_ANSWER_WORDS {
                    JudgeResult::new(
                        Verdict::Approved,
                        "You have thought it through. Deletion approved.",
                    )
                } else {
                    JudgeResult::new(
                        Verdict::Rejected,
                        "You failed to justify it. The task stays.",
                    )
                },
            );
        }

        if RE_LAZY.is_match(reason) || word_count(reason) < MIN_REASON_WORDS {
            return Ok(JudgeResult::new(
                Verdict::Rejected,
                "That is an excuse, not a reason. The task stays.",
            ));
        }

        Ok(JudgeResult::new(Verdict::Inquiry, "I am not convinced yet.").with_question(PROBE_QUESTION))
    }
}
