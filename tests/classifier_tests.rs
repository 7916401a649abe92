use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use vesper::intent::classify;
use vesper::intent::types::{param, IntentKind};

fn reference_time() -> DateTime<Utc> {
    // 06:00, so "at 8am" lands later the same day.
    Utc.with_ymd_and_hms(2026, 3, 14, 6, 0, 0).unwrap()
}

fn fire_at_of(intent: &vesper::intent::Intent) -> DateTime<Utc> {
    let raw = intent.param(param::FIRE_AT).expect("fire_at param");
    DateTime::parse_from_rfc3339(raw).expect("valid rfc3339").with_timezone(&Utc)
}

#[test]
fn test_relative_reminder_phrase() {
    let t = reference_time();
    let intent = classify("remind me to call mom in 10 minutes", t);

    assert_eq!(intent.kind, IntentKind::SetReminder);
    assert_eq!(intent.param(param::MESSAGE), Some("call mom"));
    assert_eq!(fire_at_of(&intent), t + Duration::minutes(10));
    assert_eq!(intent.param(param::RECURRENCE), Some("none"));
}

#[test]
fn test_empty_and_noise_are_unrecognized() {
    let t = reference_time();
    assert_eq!(classify("", t).kind, IntentKind::Unrecognized);
    assert_eq!(classify("   ", t).kind, IntentKind::Unrecognized);
    assert_eq!(classify("um", t).kind, IntentKind::Unrecognized);
    assert_eq!(classify("uh the um", t).kind, IntentKind::Unrecognized);
}

#[test]
fn test_clock_time_reminder_same_day() {
    let t = reference_time();
    let intent = classify("remind me every day at 8am to take my medicine", t);

    assert_eq!(intent.kind, IntentKind::SetReminder);
    assert_eq!(intent.param(param::MESSAGE), Some("take my medicine"));
    assert_eq!(intent.param(param::RECURRENCE), Some("daily"));

    let fire_at = fire_at_of(&intent);
    assert_eq!(fire_at.date_naive(), t.date_naive());
    assert_eq!(fire_at.hour(), 8);
    assert_eq!(fire_at.minute(), 0);
}

#[test]
fn test_clock_time_already_past_rolls_to_tomorrow() {
    let t = reference_time();
    let intent = classify("remind me to stand up at 5am", t);

    let fire_at = fire_at_of(&intent);
    assert_eq!(fire_at.date_naive(), t.date_naive() + Duration::days(1));
    assert_eq!(fire_at.hour(), 5);
    assert_eq!(intent.param(param::MESSAGE), Some("stand up"));
}

#[test]
fn test_reminder_without_time_defaults_one_hour() {
    let t = reference_time();
    let intent = classify("remind me to hydrate", t);

    assert_eq!(intent.kind, IntentKind::SetReminder);
    assert_eq!(fire_at_of(&intent), t + Duration::hours(1));
}

#[test]
fn test_interval_recurrence_phrase() {
    let t = reference_time();
    let intent = classify("remind me to stretch every 30 minutes", t);

    assert_eq!(intent.param(param::RECURRENCE), Some("interval:1800"));
    assert_eq!(intent.param(param::MESSAGE), Some("stretch"));
    assert_eq!(fire_at_of(&intent), t + Duration::minutes(30));
}

#[test]
fn test_open_app() {
    let t = reference_time();
    let intent = classify("open spotify", t);
    assert_eq!(intent.kind, IntentKind::OpenApp);
    assert_eq!(intent.param(param::APP), Some("spotify"));

    let intent = classify("Launch the calculator", t);
    assert_eq!(intent.kind, IntentKind::OpenApp);
    assert_eq!(intent.param(param::APP), Some("the calculator"));
}

#[test]
fn test_web_search() {
    let t = reference_time();
    let intent = classify("search for rust borrow checker", t);
    assert_eq!(intent.kind, IntentKind::WebSearch);
    assert_eq!(intent.param(param::QUERY), Some("rust borrow checker"));

    let intent = classify("look up the tallest mountain", t);
    assert_eq!(intent.kind, IntentKind::WebSearch);
    assert_eq!(intent.param(param::QUERY), Some("the tallest mountain"));
}

#[test]
fn test_reminder_queries() {
    let t = reference_time();
    assert_eq!(
        classify("what are my reminders", t).kind,
        IntentKind::ListReminders
    );

    let intent = classify("cancel the reminder about the meeting", t);
    assert_eq!(intent.kind, IntentKind::CancelReminder);
    assert_eq!(intent.param(param::QUERY), Some("the meeting"));
}

#[test]
fn test_pause_and_resume() {
    let t = reference_time();
    assert_eq!(classify("pause", t).kind, IntentKind::Pause);
    assert_eq!(classify("stop", t).kind, IntentKind::Pause);
    assert_eq!(classify("resume", t).kind, IntentKind::Resume);
    assert_eq!(classify("continue", t).kind, IntentKind::Resume);

    // A reminder mentioning "stop" is still a reminder.
    assert_eq!(
        classify("remind me to stop the oven in 5 minutes", t).kind,
        IntentKind::SetReminder
    );
}

#[test]
fn test_preference_phrase() {
    let t = reference_time();
    let intent = classify("remember that my favorite color is blue", t);
    assert_eq!(intent.kind, IntentKind::SetPreference);
    assert_eq!(intent.param(param::KEY), Some("my favorite color"));
    assert_eq!(intent.param(param::VALUE), Some("blue"));
}

#[test]
fn test_activity_mood_and_summary_queries() {
    let t = reference_time();
    assert_eq!(
        classify("what have I been doing", t).kind,
        IntentKind::RecallActivity
    );
    assert_eq!(classify("how am I feeling", t).kind, IntentKind::MoodQuery);
    assert_eq!(
        classify("give me my daily summary", t).kind,
        IntentKind::DailySummary
    );
}

#[test]
fn test_unmatched_nonempty_defaults_to_chat() {
    let t = reference_time();
    let intent = classify("What's the capital of France?", t);
    assert_eq!(intent.kind, IntentKind::Chat);
    assert_eq!(
        intent.param(param::TEXT),
        Some("What's the capital of France?")
    );
}
