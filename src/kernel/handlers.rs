use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::AssistantError;
use crate::intent::types::{param, Intent, IntentKind};
use crate::intent::timeparse::decode_recurrence;
use crate::kernel::context::{PresenceRequest, SessionContext};
use crate::kernel::scheduler::ReminderScheduler;
use crate::store::summary;
use crate::store::types::{ActivityRecord, EmotionSample, Preference, Reminder};
use crate::store::{Collection, Store};

/// Outcome of dispatching one intent.
pub enum Dispatch {
    /// The handler finished synchronously; speak this.
    Reply(String),
    /// The handler needs an external collaborator; the driver runs it on a
    /// worker and reports back as an exchange event.
    Defer(DeferredCall),
}

#[derive(Debug, Clone)]
pub enum DeferredCall {
    Chat,
    LaunchApp { app: String },
    WebSearch { query: String },
}

pub struct HandlerEnv<'a> {
    pub store: &'a Arc<dyn Store>,
    pub scheduler: &'a mut ReminderScheduler,
    pub context: &'a mut SessionContext,
    pub now: DateTime<Utc>,
}

/// Total dispatch over [`IntentKind`]. Failures surface as
/// [`AssistantError`] and are converted to spoken responses at the
/// orchestrator boundary; they never escape further.
pub fn dispatch(intent: &Intent, env: &mut HandlerEnv<'_>) -> Result<Dispatch, AssistantError> {
    match intent.kind {
        IntentKind::Chat => Ok(Dispatch::Defer(DeferredCall::Chat)),

        IntentKind::OpenApp => {
            let app = intent
                .param(param::APP)
                .filter(|a| !a.trim().is_empty())
                .ok_or(AssistantError::RecognitionFailed)?;
            Ok(Dispatch::Defer(DeferredCall::LaunchApp {
                app: app.trim().to_string(),
            }))
        }

        IntentKind::WebSearch => {
            let query = intent
                .param(param::QUERY)
                .filter(|q| !q.trim().is_empty())
                .ok_or(AssistantError::RecognitionFailed)?;
            Ok(Dispatch::Defer(DeferredCall::WebSearch {
                query: query.trim().to_string(),
            }))
        }

        IntentKind::SetReminder => set_reminder(intent, env).map(Dispatch::Reply),

        IntentKind::ListReminders => {
            let upcoming = env.scheduler.upcoming(10);
            if upcoming.is_empty() {
                return Ok(Dispatch::Reply(
                    "You don't have any upcoming reminders.".to_string(),
                ));
            }
            let mut reply = String::from("Here are your upcoming reminders: ");
            for (i, reminder) in upcoming.iter().enumerate() {
                if i > 0 {
                    reply.push_str("; ");
                }
                reply.push_str(&format!(
                    "{}. {} at {}",
                    i + 1,
                    reminder.message,
                    reminder.fire_at.format("%I:%M %p on %A, %B %d")
                ));
            }
            reply.push('.');
            Ok(Dispatch::Reply(reply))
        }

        IntentKind::CancelReminder => {
            let query = intent.param(param::QUERY).unwrap_or("");
            let cancelled = env.scheduler.cancel_matching(query)?;
            Ok(Dispatch::Reply(format!(
                "Cancelled the reminder to {}.",
                cancelled.message
            )))
        }

        IntentKind::SetPreference => set_preference(intent, env).map(Dispatch::Reply),

        IntentKind::RecallActivity => Ok(Dispatch::Reply(recall_activity(env)?)),

        IntentKind::MoodQuery => Ok(Dispatch::Reply(mood_reply(env)?)),

        IntentKind::DailySummary => {
            let day = env.now.date_naive();
            let summary = summary::daily_summary(env.store.as_ref(), day)?;
            Ok(Dispatch::Reply(summary::render(&summary)))
        }

        IntentKind::Pause => {
            env.context.apply(PresenceRequest::PauseRequested);
            Ok(Dispatch::Reply(
                "I'll pause for now. Say 'resume' when you need me.".to_string(),
            ))
        }

        IntentKind::Resume => {
            env.context.apply(PresenceRequest::ResumeRequested);
            Ok(Dispatch::Reply("I'm back! How can I help you?".to_string()))
        }

        IntentKind::Unrecognized => Ok(Dispatch::Reply(
            "I didn't catch that. Could you rephrase?".to_string(),
        )),
    }
}

fn set_reminder(intent: &Intent, env: &mut HandlerEnv<'_>) -> Result<String, AssistantError> {
    let message = intent.param(param::MESSAGE).unwrap_or("");
    let fire_at = intent
        .param(param::FIRE_AT)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AssistantError::InvalidSchedule("no fire time".to_string()))?;
    let recurrence = intent
        .param(param::RECURRENCE)
        .and_then(decode_recurrence)
        .ok_or_else(|| AssistantError::InvalidSchedule("bad recurrence".to_string()))?;

    let reminder = env.scheduler.add(message, fire_at, recurrence, env.now)?;
    Ok(confirmation(&reminder))
}

fn confirmation(reminder: &Reminder) -> String {
    format!(
        "I'll remind you to {}{} at {}.",
        reminder.message,
        reminder.recurrence.spoken_suffix(),
        reminder.fire_at.format("%I:%M %p on %A, %B %d")
    )
}

fn set_preference(intent: &Intent, env: &mut HandlerEnv<'_>) -> Result<String, AssistantError> {
    let key = intent
        .param(param::KEY)
        .filter(|k| !k.is_empty())
        .ok_or(AssistantError::RecognitionFailed)?;
    let value = intent
        .param(param::VALUE)
        .filter(|v| !v.is_empty())
        .ok_or(AssistantError::RecognitionFailed)?;

    let preference = Preference {
        key: key.to_string(),
        value: value.to_string(),
        at: env.now,
    };
    let body = serde_json::to_value(&preference)
        .map_err(|_| AssistantError::StorageUnavailable)?;

    // Update in place when the key is already remembered.
    let existing = env
        .store
        .read_all(Collection::Preferences)?
        .into_iter()
        .find(|(_, v)| v.get("key").and_then(|k| k.as_str()) == Some(key));
    match existing {
        Some((id, _)) => {
            env.store
                .update(Collection::Preferences, &id, &|v| *v = body.clone())?
        }
        None => {
            env.store.append(Collection::Preferences, body.clone())?;
        }
    }
    Ok(format!("Okay, I'll remember that {key} is {value}."))
}

fn recall_activity(env: &mut HandlerEnv<'_>) -> Result<String, AssistantError> {
    let records: Vec<ActivityRecord> = env
        .store
        .read_all(Collection::Activity)?
        .into_iter()
        .filter_map(|(_, body)| serde_json::from_value(body).ok())
        .collect();
    if records.is_empty() {
        return Ok("I don't have any recent activity data yet.".to_string());
    }

    let mut reply = String::from("Here's what you've been up to recently: ");
    let recent = records.iter().rev().take(5).rev();
    for (i, record) in recent.enumerate() {
        if i > 0 {
            reply.push_str("; ");
        }
        reply.push_str(&format!(
            "{} - {}: {}",
            record.at.format("%I:%M %p"),
            record.app_name,
            record.window_title
        ));
    }
    reply.push('.');
    Ok(reply)
}

fn mood_reply(env: &mut HandlerEnv<'_>) -> Result<String, AssistantError> {
    let latest = env
        .store
        .read_all(Collection::Activity)?
        .into_iter()
        .filter_map(|(_, body)| serde_json::from_value::<EmotionSample>(body).ok())
        .last();

    let reply = match latest {
        Some(sample) if sample.confidence > 0.5 => {
            let description = match sample.emotion_label.as_str() {
                "happy" => "you look happy!",
                "sad" => "you seem a bit sad. Is everything okay?",
                "angry" => "you look a bit angry. Would you like to talk about it?",
                "surprise" => "you look surprised!",
                "fear" => "you seem a bit scared. Is everything alright?",
                "neutral" => "you seem neutral. How are you feeling?",
                other => return Ok(format!("Based on your expression, you seem {other}.")),
            };
            format!("Based on your facial expression, {description}")
        }
        _ => "I'm not sure how you're feeling. Could you tell me?".to_string(),
    };
    Ok(reply)
}
