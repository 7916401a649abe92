use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use vesper::monitor::BackgroundMonitor;
use vesper::services::desktop::{
    EmotionReading, EmotionSource, OcrSource, SourceError, UnavailableSource, WindowSample,
    WindowSource,
};
use vesper::store::types::{ActivityRecord, EmotionSample};
use vesper::store::{Collection, MemStore, Store};

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap()
}

/// Replays a fixed sequence of window samples, then repeats the last one.
struct ScriptedWindow {
    samples: Mutex<VecDeque<WindowSample>>,
    last: Mutex<Option<WindowSample>>,
}

impl ScriptedWindow {
    fn new(samples: Vec<(&str, &str)>) -> Self {
        Self {
            samples: Mutex::new(
                samples
                    .into_iter()
                    .map(|(app, title)| WindowSample {
                        app_name: app.to_string(),
                        window_title: title.to_string(),
                    })
                    .collect(),
            ),
            last: Mutex::new(None),
        }
    }
}

#[async_trait]
impl WindowSource for ScriptedWindow {
    async fn active_window(&self) -> Result<WindowSample, SourceError> {
        let next = self.samples.lock().unwrap().pop_front();
        match next {
            Some(sample) => {
                *self.last.lock().unwrap() = Some(sample.clone());
                Ok(sample)
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or(SourceError::Unavailable),
        }
    }
}

struct FixedEmotion;

#[async_trait]
impl EmotionSource for FixedEmotion {
    async fn sample(&self) -> Result<EmotionReading, SourceError> {
        Ok(EmotionReading {
            label: "happy".to_string(),
            confidence: 0.9,
        })
    }
}

struct FailingEmotion;

#[async_trait]
impl EmotionSource for FailingEmotion {
    async fn sample(&self) -> Result<EmotionReading, SourceError> {
        Err(SourceError::Failed("camera busy".to_string()))
    }
}

struct SlowOcr;

#[async_trait]
impl OcrSource for SlowOcr {
    async fn capture_text(&self) -> Result<String, SourceError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("never delivered".to_string())
    }
}

fn activity_records(store: &Arc<dyn Store>) -> Vec<ActivityRecord> {
    store
        .read_all(Collection::Activity)
        .unwrap()
        .into_iter()
        .filter_map(|(_, body)| serde_json::from_value(body).ok())
        .collect()
}

fn emotion_samples(store: &Arc<dyn Store>) -> Vec<EmotionSample> {
    store
        .read_all(Collection::Activity)
        .unwrap()
        .into_iter()
        .filter_map(|(_, body)| serde_json::from_value(body).ok())
        .collect()
}

#[tokio::test]
async fn test_focus_change_records_duration() {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    let window = Arc::new(ScriptedWindow::new(vec![
        ("editor", "main.rs"),
        ("browser", "docs"),
    ]));
    let mut monitor = BackgroundMonitor::new(
        store.clone(),
        window,
        Arc::new(UnavailableSource),
        Arc::new(UnavailableSource),
        200,
    );

    let t = base_time();
    monitor.tick(t).await;
    assert!(
        activity_records(&store).is_empty(),
        "an open focus span is not a record yet"
    );

    monitor.tick(t + ChronoDuration::seconds(5)).await;
    let records = activity_records(&store);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].app_name, "editor");
    assert_eq!(records[0].window_title, "main.rs");
    assert_eq!(records[0].duration_secs, 5);
    assert_eq!(records[0].at, t);

    // Shutdown flushes the open span.
    monitor.finish(t + ChronoDuration::seconds(9));
    let records = activity_records(&store);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].app_name, "browser");
    assert_eq!(records[1].duration_secs, 4);
}

#[tokio::test]
async fn test_emotion_samples_appended_each_tick() {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    let window = Arc::new(ScriptedWindow::new(vec![("editor", "main.rs")]));
    let mut monitor = BackgroundMonitor::new(
        store.clone(),
        window,
        Arc::new(UnavailableSource),
        Arc::new(FixedEmotion),
        200,
    );

    let t = base_time();
    monitor.tick(t).await;
    monitor.tick(t + ChronoDuration::seconds(5)).await;

    let samples = emotion_samples(&store);
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].emotion_label, "happy");
    assert!(samples[0].confidence > 0.8);
}

#[tokio::test]
async fn test_failing_source_skips_sample_only() {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    let window = Arc::new(ScriptedWindow::new(vec![
        ("editor", "main.rs"),
        ("terminal", "build"),
    ]));
    let mut monitor = BackgroundMonitor::new(
        store.clone(),
        window,
        Arc::new(UnavailableSource),
        Arc::new(FailingEmotion),
        200,
    );

    let t = base_time();
    monitor.tick(t).await;
    monitor.tick(t + ChronoDuration::seconds(3)).await;

    assert!(
        emotion_samples(&store).is_empty(),
        "failing emotion source contributes nothing"
    );
    assert_eq!(
        activity_records(&store).len(),
        1,
        "window sampling still works when another source fails"
    );
}

#[tokio::test]
async fn test_slow_source_is_timed_out() {
    let store: Arc<dyn Store> = Arc::new(MemStore::new());
    let window = Arc::new(ScriptedWindow::new(vec![("editor", "main.rs")]));
    let mut monitor = BackgroundMonitor::new(
        store.clone(),
        window,
        Arc::new(SlowOcr),
        Arc::new(UnavailableSource),
        50,
    );

    let started = std::time::Instant::now();
    let t = base_time();
    monitor.tick(t).await;
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "a slow source must not hold the tick hostage"
    );

    // The span exists without OCR text.
    monitor.finish(t + ChronoDuration::seconds(1));
    let records = activity_records(&store);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].ocr_text, "");
}
