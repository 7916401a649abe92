use chrono::NaiveDate;
use serde::Serialize;

use super::types::{ActivityRecord, EmotionSample, Reminder};
use super::{Collection, Store, StoreError};

/// Aggregate of one day's logs, surfaced through the daily-summary intent.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub activities: Vec<ActivityRecord>,
    pub emotions: Vec<EmotionSample>,
    pub app_usage: Vec<AppUsage>,
    pub reminders: Vec<Reminder>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppUsage {
    pub app_name: String,
    pub total_secs: u64,
}

pub fn daily_summary(store: &dyn Store, date: NaiveDate) -> Result<DailySummary, StoreError> {
    // Activity records and emotion samples share one log collection; the
    // record shape decides which side of the summary a row lands on.
    let mut activities = Vec::new();
    let mut emotions = Vec::new();
    for (_, body) in store.read_all(Collection::Activity)? {
        if let Ok(record) = serde_json::from_value::<ActivityRecord>(body.clone()) {
            if record.at.date_naive() == date {
                activities.push(record);
            }
        } else if let Ok(sample) = serde_json::from_value::<EmotionSample>(body) {
            if sample.at.date_naive() == date {
                emotions.push(sample);
            }
        }
    }

    let mut reminders = Vec::new();
    for (_, body) in store.read_all(Collection::Reminders)? {
        if let Ok(reminder) = serde_json::from_value::<Reminder>(body) {
            if reminder.fire_at.date_naive() == date {
                reminders.push(reminder);
            }
        }
    }

    let mut usage: Vec<AppUsage> = Vec::new();
    for record in &activities {
        match usage.iter_mut().find(|u| u.app_name == record.app_name) {
            Some(entry) => entry.total_secs += record.duration_secs,
            None => usage.push(AppUsage {
                app_name: record.app_name.clone(),
                total_secs: record.duration_secs,
            }),
        }
    }
    usage.sort_by(|a, b| b.total_secs.cmp(&a.total_secs));

    Ok(DailySummary {
        date,
        activities,
        emotions,
        app_usage: usage,
        reminders,
    })
}

/// Spoken rendering of a summary.
pub fn render(summary: &DailySummary) -> String {
    if summary.activities.is_empty() && summary.emotions.is_empty() && summary.reminders.is_empty()
    {
        return "I don't have anything logged for that day yet.".to_string();
    }

    let mut parts = Vec::new();
    if !summary.app_usage.is_empty() {
        let top: Vec<String> = summary
            .app_usage
            .iter()
            .take(3)
            .map(|u| format!("{} for {} minutes", u.app_name, u.total_secs / 60))
            .collect();
        parts.push(format!("You mostly used {}", top.join(", ")));
    }
    if let Some(dominant) = dominant_emotion(&summary.emotions) {
        parts.push(format!("you seemed {} for most of the day", dominant));
    }
    if !summary.reminders.is_empty() {
        parts.push(format!("{} reminder(s) were scheduled", summary.reminders.len()));
    }
    format!("{}.", parts.join("; "))
}

fn dominant_emotion(samples: &[EmotionSample]) -> Option<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for sample in samples {
        match counts.iter_mut().find(|(label, _)| *label == sample.emotion_label) {
            Some((_, n)) => *n += 1,
            None => counts.push((sample.emotion_label.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().next().map(|(label, _)| label)
}
