use std::sync::LazyLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;

use crate::store::types::Recurrence;

static EVERY_N: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bevery (\d+) (second|minute|hour|day|week)s?\b").expect("valid regex")
});
static DAILY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(every day|daily)\b").expect("valid regex"));
static WEEKLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(every week|weekly)\b").expect("valid regex"));
static IN_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bin (\d+) (second|minute|hour|day)s?\b").expect("valid regex")
});
static AT_CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bat (\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").expect("valid regex")
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// A schedule phrase extracted from an utterance.
#[derive(Debug, Clone)]
pub struct ParsedSchedule {
    pub fire_at: DateTime<Utc>,
    pub recurrence: Recurrence,
    /// Utterance with the schedule phrases removed.
    pub remainder: String,
    /// False when no time phrase was present and the one-hour default applied.
    pub explicit_time: bool,
}

fn unit_secs(unit: &str) -> u64 {
    match unit {
        "second" => 1,
        "minute" => 60,
        "hour" => 3600,
        "day" => 86_400,
        "week" => 604_800,
        _ => 60,
    }
}

/// Extract recurrence and fire time from `text`, resolved against the
/// supplied `now` (never an implicit clock). Phrases understood:
/// "in N minutes/hours/...", "at H[:MM][am|pm]", "every day"/"daily",
/// "every week"/"weekly", "every N minutes/...". With no time phrase the
/// fire time defaults to one hour out; an "at" time already past today
/// rolls to tomorrow.
pub fn parse_schedule(text: &str, now: DateTime<Utc>) -> ParsedSchedule {
    let mut working = text.to_lowercase();
    let mut recurrence = Recurrence::None;

    if let Some(caps) = EVERY_N.captures(&working) {
        let n: u64 = caps[1].parse().unwrap_or(1);
        let secs = n.max(1) * unit_secs(&caps[2]);
        recurrence = Recurrence::Interval(secs);
        working = EVERY_N.replace(&working, "").into_owned();
    } else if DAILY.is_match(&working) {
        recurrence = Recurrence::Daily;
        working = DAILY.replace(&working, "").into_owned();
    } else if WEEKLY.is_match(&working) {
        recurrence = Recurrence::Weekly;
        working = WEEKLY.replace(&working, "").into_owned();
    }

    let mut fire_at = None;

    if let Some(caps) = IN_RELATIVE.captures(&working) {
        let n: i64 = caps[1].parse().unwrap_or(0);
        fire_at = Some(now + Duration::seconds(n * unit_secs(&caps[2]) as i64));
        working = IN_RELATIVE.replace(&working, "").into_owned();
    } else if let Some(caps) = AT_CLOCK.captures(&working) {
        let mut hour: u32 = caps[1].parse().unwrap_or(0);
        let minute: u32 = caps
            .get(2)
            .map(|m| m.as_str().parse().unwrap_or(0))
            .unwrap_or(0);
        match caps.get(3).map(|m| m.as_str()) {
            Some("pm") if hour < 12 => hour += 12,
            Some("am") if hour == 12 => hour = 0,
            _ => {}
        }
        if let Some(naive) = now.date_naive().and_hms_opt(hour, minute, 0) {
            let mut candidate = DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc);
            // A clock time already behind us means tomorrow.
            if candidate <= now {
                candidate += Duration::days(1);
            }
            fire_at = Some(candidate);
            working = AT_CLOCK.replace(&working, "").into_owned();
        }
    }

    let explicit_time = fire_at.is_some();
    let fire_at = fire_at.unwrap_or_else(|| match recurrence {
        // An interval template anchors its first firing one interval out.
        Recurrence::Interval(secs) => now + Duration::seconds(secs as i64),
        _ => now + Duration::hours(1),
    });

    let remainder = WHITESPACE
        .replace_all(working.trim(), " ")
        .trim_matches(|c: char| c.is_whitespace() || ".,!?".contains(c))
        .to_string();

    ParsedSchedule {
        fire_at,
        recurrence,
        remainder,
        explicit_time,
    }
}

/// Encoding of a [`Recurrence`] for intent parameters.
pub fn encode_recurrence(recurrence: Recurrence) -> String {
    match recurrence {
        Recurrence::None => "none".to_string(),
        Recurrence::Daily => "daily".to_string(),
        Recurrence::Weekly => "weekly".to_string(),
        Recurrence::Interval(secs) => format!("interval:{secs}"),
    }
}

pub fn decode_recurrence(raw: &str) -> Option<Recurrence> {
    match raw {
        "none" => Some(Recurrence::None),
        "daily" => Some(Recurrence::Daily),
        "weekly" => Some(Recurrence::Weekly),
        _ => raw
            .strip_prefix("interval:")
            .and_then(|secs| secs.parse().ok())
            .map(Recurrence::Interval),
    }
}
