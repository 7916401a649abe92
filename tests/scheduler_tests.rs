use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use vesper::error::AssistantError;
use vesper::kernel::scheduler::ReminderScheduler;
use vesper::store::types::Recurrence;
use vesper::store::{JsonStore, MemStore, Store};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
}

fn scheduler() -> ReminderScheduler {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    ReminderScheduler::new(store)
}

#[test]
fn test_fires_exactly_once() {
    let mut scheduler = scheduler();
    let now = base_time();
    let fire_at = now + Duration::minutes(10);

    scheduler
        .add("call mom", fire_at, Recurrence::None, now)
        .expect("future reminder should be accepted");

    // Not due yet.
    assert!(scheduler.tick(fire_at - Duration::seconds(1)).is_empty());

    // Due exactly at fire_at, returned once.
    let fired = scheduler.tick(fire_at);
    assert_eq!(fired.len(), 1, "due reminder must fire");
    assert_eq!(fired[0].message, "call mom");
    assert_eq!(fired[0].fire_at, fire_at);

    // Never again, not even with the same now.
    assert!(scheduler.tick(fire_at).is_empty(), "same tick must not refire");
    assert!(
        scheduler.tick(fire_at + Duration::hours(1)).is_empty(),
        "later ticks must not refire"
    );
    assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn test_firing_order_ascending_with_insertion_tiebreak() {
    let mut scheduler = scheduler();
    let now = base_time();

    scheduler
        .add("first inserted", now + Duration::seconds(10), Recurrence::None, now)
        .unwrap();
    scheduler
        .add("earliest", now + Duration::seconds(5), Recurrence::None, now)
        .unwrap();
    scheduler
        .add("second inserted", now + Duration::seconds(10), Recurrence::None, now)
        .unwrap();

    let fired = scheduler.tick(now + Duration::seconds(20));
    let messages: Vec<&str> = fired.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages, vec!["earliest", "first inserted", "second inserted"]);
}

#[test]
fn test_past_fire_time_rejected() {
    let mut scheduler = scheduler();
    let now = base_time();

    let result = scheduler.add("too late", now - Duration::minutes(1), Recurrence::None, now);
    assert!(
        matches!(result, Err(AssistantError::InvalidSchedule(_))),
        "past fire time must be rejected"
    );
    assert_eq!(scheduler.pending_count(), 0);
}

#[test]
fn test_empty_message_rejected() {
    let mut scheduler = scheduler();
    let now = base_time();

    let result = scheduler.add("  ", now + Duration::minutes(1), Recurrence::None, now);
    assert!(matches!(result, Err(AssistantError::InvalidSchedule(_))));
}

#[test]
fn test_interval_template_reanchors() {
    let mut scheduler = scheduler();
    let now = base_time();

    // An interval template with a stale fire time re-anchors to now + interval.
    let reminder = scheduler
        .add(
            "drink water",
            now - Duration::hours(1),
            Recurrence::Interval(600),
            now,
        )
        .expect("interval template must be accepted");
    assert_eq!(reminder.fire_at, now + Duration::seconds(600));
}

#[test]
fn test_cancel_before_due_never_fires() {
    let mut scheduler = scheduler();
    let now = base_time();
    let reminder = scheduler
        .add("cancel me", now + Duration::minutes(5), Recurrence::None, now)
        .unwrap();

    scheduler.cancel(reminder.id).expect("pending cancel succeeds");
    assert!(scheduler.tick(now + Duration::hours(1)).is_empty());
}

#[test]
fn test_cancel_unknown_and_fired_ids_not_found() {
    let mut scheduler = scheduler();
    let now = base_time();

    assert!(matches!(
        scheduler.cancel(uuid::Uuid::new_v4()),
        Err(AssistantError::NotFound)
    ));

    let reminder = scheduler
        .add("one shot", now + Duration::seconds(1), Recurrence::None, now)
        .unwrap();
    assert_eq!(scheduler.tick(now + Duration::seconds(1)).len(), 1);

    // Fired and gone: cancelling is NotFound and changes nothing.
    assert!(matches!(
        scheduler.cancel(reminder.id),
        Err(AssistantError::NotFound)
    ));
}

#[test]
fn test_recurring_rearm() {
    let mut scheduler = scheduler();
    let now = base_time();
    let fire_at = now + Duration::minutes(1);

    scheduler
        .add("take medicine", fire_at, Recurrence::Daily, now)
        .unwrap();

    let fired = scheduler.tick(fire_at);
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].fire_at, fire_at, "firing reports the scheduled instant");

    // Still pending, re-armed for tomorrow.
    assert_eq!(scheduler.pending_count(), 1);
    assert!(scheduler.tick(fire_at + Duration::hours(1)).is_empty());

    let fired_again = scheduler.tick(fire_at + Duration::days(1));
    assert_eq!(fired_again.len(), 1);
    assert_eq!(fired_again[0].fire_at, fire_at + Duration::days(1));
}

#[test]
fn test_missed_recurrences_collapse_to_one_firing() {
    let mut scheduler = scheduler();
    let now = base_time();
    let fire_at = now + Duration::minutes(1);

    scheduler
        .add("daily standup", fire_at, Recurrence::Daily, now)
        .unwrap();

    // Three days of downtime: one catch-up firing, then the next future slot.
    let later = now + Duration::days(3);
    let fired = scheduler.tick(later);
    assert_eq!(fired.len(), 1, "backlog collapses into a single firing");

    let upcoming = scheduler.upcoming(1);
    assert_eq!(upcoming.len(), 1);
    assert!(
        upcoming[0].fire_at > later,
        "re-armed fire time must be in the future, got {}",
        upcoming[0].fire_at
    );
    assert!(scheduler.tick(later).is_empty());
}

#[test]
fn test_cancel_matching_by_message() {
    let mut scheduler = scheduler();
    let now = base_time();

    scheduler
        .add("water the plants", now + Duration::hours(1), Recurrence::None, now)
        .unwrap();
    scheduler
        .add("join the standup", now + Duration::hours(2), Recurrence::None, now)
        .unwrap();

    let cancelled = scheduler.cancel_matching("standup").unwrap();
    assert_eq!(cancelled.message, "join the standup");
    assert_eq!(scheduler.pending_count(), 1);

    assert!(matches!(
        scheduler.cancel_matching("standup"),
        Err(AssistantError::NotFound)
    ));

    // Empty query cancels the sole remaining reminder.
    let last = scheduler.cancel_matching("").unwrap();
    assert_eq!(last.message, "water the plants");
}

#[test]
fn test_restart_reloads_pending_reminders() {
    let dir = tempfile::tempdir().expect("tempdir");
    let now = base_time();

    {
        let store: Arc<dyn Store> = Arc::new(JsonStore::open(dir.path()).unwrap());
        let mut scheduler = ReminderScheduler::new(store);
        scheduler
            .add("one shot", now + Duration::minutes(5), Recurrence::None, now)
            .unwrap();
        scheduler
            .add("every week", now + Duration::minutes(10), Recurrence::Weekly, now)
            .unwrap();
    }

    // Simulated restart: a fresh store over the same directory.
    let store: Arc<dyn Store> = Arc::new(JsonStore::open(dir.path()).unwrap());
    let mut scheduler = ReminderScheduler::new(store);
    assert_eq!(scheduler.load().unwrap(), 2, "both pending reminders reload");

    let upcoming = scheduler.upcoming(10);
    assert_eq!(upcoming[0].message, "one shot");
    assert_eq!(upcoming[0].fire_at, now + Duration::minutes(5));
    assert_eq!(upcoming[1].message, "every week");
    assert_eq!(upcoming[1].recurrence, Recurrence::Weekly);

    // Fire the one-shot, restart again: only the weekly one remains.
    assert_eq!(scheduler.tick(now + Duration::minutes(5)).len(), 1);

    let store: Arc<dyn Store> = Arc::new(JsonStore::open(dir.path()).unwrap());
    let mut scheduler = ReminderScheduler::new(store);
    assert_eq!(scheduler.load().unwrap(), 1);
    assert_eq!(scheduler.upcoming(10)[0].message, "every week");
}
