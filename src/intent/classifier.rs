use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::timeparse::{encode_recurrence, parse_schedule};
use super::types::{param, Intent, IntentKind};

/// Single tokens that are likely recognizer noise. An utterance made up
/// entirely of these is treated as unintelligible.
const NOISE_WORDS: &[&str] = &["um", "uh", "hmm", "er", "ah", "the", "a"];

/// Whole-utterance pause/resume synonyms.
const PAUSE_COMMANDS: &[&str] = &["pause", "stop", "hold on"];
const RESUME_COMMANDS: &[&str] = &["resume", "continue", "unpause"];

static REMINDER_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(please )?(remind me( to| that)?|set (a |an )?(reminder|alarm)( to| for| that)?)\s*")
        .expect("valid regex")
});
static CANCEL_REMINDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(cancel|delete|remove)( the| my)? reminders?( about| to| for)?\s*(?P<query>.*)$")
        .expect("valid regex")
});
static OPEN_APP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(open|launch|start)\s+(?P<app>.+)$").expect("valid regex"));
static WEB_SEARCH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(search( the web)?( for)?|look up|google)\s+(?P<query>.+)$")
        .expect("valid regex")
});
static REMEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^remember( that)?\s+(?P<key>.+?)\s+is\s+(?P<value>.+)$").expect("valid regex")
});

/// Classify a raw utterance into an [`Intent`]. Pure function of the text,
/// the keyword table, and the supplied reference time. Deterministic
/// pattern matches win; non-empty unmatched input falls back to `Chat`;
/// empty or noise-only input is `Unrecognized`.
pub fn classify(text: &str, now: DateTime<Utc>) -> Intent {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Intent::new(IntentKind::Unrecognized);
    }

    let lower = trimmed.to_lowercase();
    let stripped: String = lower
        .chars()
        .filter(|c| !".,!?".contains(*c))
        .collect();

    if stripped
        .split_whitespace()
        .all(|token| NOISE_WORDS.contains(&token))
    {
        return Intent::new(IntentKind::Unrecognized);
    }

    // Reminders before the pause synonyms so "remind me to stop ..." never
    // reads as a pause request.
    if lower.contains("remind me") || lower.contains("set a reminder") || lower.contains("set an alarm")
    {
        return reminder_intent(&lower, now);
    }

    if lower.contains("my reminders") || stripped == "list reminders" {
        return Intent::new(IntentKind::ListReminders);
    }

    if let Some(caps) = CANCEL_REMINDER.captures(&stripped) {
        let query = caps.name("query").map(|m| m.as_str().trim()).unwrap_or("");
        return Intent::new(IntentKind::CancelReminder).with(param::QUERY, query);
    }

    if PAUSE_COMMANDS.contains(&stripped.as_str()) {
        return Intent::new(IntentKind::Pause);
    }
    if RESUME_COMMANDS.contains(&stripped.as_str()) {
        return Intent::new(IntentKind::Resume);
    }

    if let Some(caps) = OPEN_APP.captures(&stripped) {
        if let Some(app) = caps.name("app") {
            return Intent::new(IntentKind::OpenApp).with(param::APP, app.as_str().trim());
        }
    }

    if let Some(caps) = WEB_SEARCH.captures(&stripped) {
        if let Some(query) = caps.name("query") {
            return Intent::new(IntentKind::WebSearch).with(param::QUERY, query.as_str().trim());
        }
    }

    if let Some(caps) = REMEMBER.captures(&stripped) {
        if let (Some(key), Some(value)) = (caps.name("key"), caps.name("value")) {
            return Intent::new(IntentKind::SetPreference)
                .with(param::KEY, key.as_str().trim())
                .with(param::VALUE, value.as_str().trim());
        }
    }

    if lower.contains("what have i been doing")
        || lower.contains("my activity")
        || lower.contains("my recent activity")
    {
        return Intent::new(IntentKind::RecallActivity);
    }

    if lower.contains("how am i feeling") || lower.contains("my mood") {
        return Intent::new(IntentKind::MoodQuery);
    }

    if lower.contains("daily summary")
        || lower.contains("summarize my day")
        || lower.contains("how was my day")
    {
        return Intent::new(IntentKind::DailySummary);
    }

    Intent::new(IntentKind::Chat).with(param::TEXT, trimmed)
}

fn reminder_intent(lower: &str, now: DateTime<Utc>) -> Intent {
    let parsed = parse_schedule(lower, now);
    let message = REMINDER_PREFIX
        .replace(&parsed.remainder, "")
        .trim()
        .trim_start_matches("to ")
        .trim()
        .to_string();

    Intent::new(IntentKind::SetReminder)
        .with(param::MESSAGE, message)
        .with(param::FIRE_AT, parsed.fire_at.to_rfc3339())
        .with(param::RECURRENCE, encode_recurrence(parsed.recurrence))
}
