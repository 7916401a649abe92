use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::services::desktop::{EmotionSource, OcrSource, SourceError, WindowSample, WindowSource};
use crate::store::types::{ActivityRecord, EmotionSample};
use crate::store::{Collection, Store};

struct FocusSpan {
    window: WindowSample,
    ocr_text: String,
    since: DateTime<Utc>,
}

/// Passive sidecar sampling the user's environment on a cadence. Each tick
/// polls the window, OCR, and emotion collaborators under a bounded
/// per-source timeout; a slow or failing source skips its sample for this
/// tick while the others still run. Appends are the monitor's only writes.
pub struct BackgroundMonitor {
    store: Arc<dyn Store>,
    window: Arc<dyn WindowSource>,
    ocr: Arc<dyn OcrSource>,
    emotion: Arc<dyn EmotionSource>,
    source_timeout: Duration,
    current: Option<FocusSpan>,
}

impl BackgroundMonitor {
    pub fn new(
        store: Arc<dyn Store>,
        window: Arc<dyn WindowSource>,
        ocr: Arc<dyn OcrSource>,
        emotion: Arc<dyn EmotionSource>,
        source_timeout_ms: u64,
    ) -> Self {
        Self {
            store,
            window,
            ocr,
            emotion,
            source_timeout: Duration::from_millis(source_timeout_ms),
            current: None,
        }
    }

    /// One sampling pass. Never blocks beyond the per-source budget and
    /// never fails the tick as a whole.
    pub async fn tick(&mut self, now: DateTime<Utc>) {
        let window = self.sample(self.window.active_window(), "window").await;
        if let Some(sample) = window {
            self.observe_window(sample, now).await;
        }

        if let Some(reading) = self.sample(self.emotion.sample(), "emotion").await {
            let record = EmotionSample {
                emotion_label: reading.label,
                confidence: reading.confidence,
                at: now,
            };
            self.append(&record);
        }
    }

    /// Flush the open focus span, e.g. on shutdown.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        if let Some(span) = self.current.take() {
            self.append_span(&span, now);
        }
    }

    async fn observe_window(&mut self, sample: WindowSample, now: DateTime<Utc>) {
        let changed = self
            .current
            .as_ref()
            .map(|span| span.window != sample)
            .unwrap_or(true);
        if !changed {
            return;
        }

        if let Some(span) = self.current.take() {
            self.append_span(&span, now);
        }

        // OCR is sampled once per focus change, not every tick.
        let ocr_text = self
            .sample(self.ocr.capture_text(), "ocr")
            .await
            .unwrap_or_default();
        self.current = Some(FocusSpan {
            window: sample,
            ocr_text,
            since: now,
        });
    }

    fn append_span(&self, span: &FocusSpan, now: DateTime<Utc>) {
        let record = ActivityRecord {
            app_name: span.window.app_name.clone(),
            window_title: span.window.window_title.clone(),
            ocr_text: span.ocr_text.clone(),
            at: span.since,
            duration_secs: (now - span.since).num_seconds().max(0) as u64,
        };
        self.append(&record);
    }

    fn append(&self, record: &impl serde::Serialize) {
        match serde_json::to_value(record) {
            Ok(body) => {
                if let Err(e) = self.store.append(Collection::Activity, body) {
                    warn!("monitor record not persisted: {e}");
                }
            }
            Err(e) => warn!("failed to serialize monitor record: {e}"),
        }
    }

    async fn sample<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, SourceError>>,
        source: &str,
    ) -> Option<T> {
        match timeout(self.source_timeout, fut).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(SourceError::Unavailable)) => {
                debug!(source, "sample source not configured");
                None
            }
            Ok(Err(e)) => {
                warn!(source, "sample failed: {e}");
                None
            }
            Err(_) => {
                warn!(source, "sample timed out");
                None
            }
        }
    }
}
