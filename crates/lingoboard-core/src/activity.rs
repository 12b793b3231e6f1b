//! Learning-activity reporting.
//!
//! Activity events are analytics, separate from diagnostic logging. The
//! whiteboard reports through an injected [`ActivityLogger`] and never waits
//! on or inspects the outcome.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;

/// Minimum time between two zoom reports.
pub const DEFAULT_ZOOM_LOG_INTERVAL_MS: f64 = 1000.0;

/// A discrete learning event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub category: String,
    pub concept: String,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ActivityEvent {
    pub fn new(category: impl Into<String>, concept: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            concept: concept.into(),
            duration_seconds: 0.0,
            score: None,
            attempts: None,
            errors: None,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = seconds;
        self
    }

    pub fn with_result(mut self, score: f64, attempts: u32, errors: u32) -> Self {
        self.score = Some(score);
        self.attempts = Some(attempts);
        self.errors = Some(errors);
        self
    }
}

/// High-frequency stream event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    PanStart,
    PanEnd,
    Zoom,
    Drop,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::PanStart => "pan_start",
            StreamKind::PanEnd => "pan_end",
            StreamKind::Zoom => "zoom",
            StreamKind::Drop => "drop",
        }
    }
}

/// Sink for learning-activity analytics.
pub trait ActivityLogger: Send + Sync {
    fn log_event(&self, event: &ActivityEvent);

    fn log_stream(&self, kind: StreamKind, payload: &Value);

    /// Open an activity bracket, e.g. when a block gains focus.
    fn start_activity(&self, id: &str, kind: &str, name: &str);

    /// Close the activity opened last.
    fn end_activity(&self);
}

/// Logger that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActivityLogger;

impl ActivityLogger for NullActivityLogger {
    fn log_event(&self, _event: &ActivityEvent) {}
    fn log_stream(&self, _kind: StreamKind, _payload: &Value) {}
    fn start_activity(&self, _id: &str, _kind: &str, _name: &str) {}
    fn end_activity(&self) {}
}

/// Forwards activity to the `log` facade under the `activity` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogActivityLogger;

impl ActivityLogger for LogActivityLogger {
    fn log_event(&self, event: &ActivityEvent) {
        log::info!(
            target: "activity",
            "{}/{} ({:.1}s){}",
            event.category,
            event.concept,
            event.duration_seconds,
            event.detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
        );
    }

    fn log_stream(&self, kind: StreamKind, payload: &Value) {
        log::debug!(target: "activity", "{} {}", kind.as_str(), payload);
    }

    fn start_activity(&self, id: &str, kind: &str, name: &str) {
        log::info!(target: "activity", "start {} [{}] {}", id, kind, name);
    }

    fn end_activity(&self) {
        log::info!(target: "activity", "end");
    }
}

/// A call received by [`RecordingActivityLogger`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityRecord {
    Event(ActivityEvent),
    Stream(StreamKind, Value),
    Start { id: String, kind: String, name: String },
    End,
}

/// Keeps every call in memory. Used by tests and the session summary.
#[derive(Debug, Default)]
pub struct RecordingActivityLogger {
    records: Mutex<Vec<ActivityRecord>>,
}

impl RecordingActivityLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, record: ActivityRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(e) => log::warn!("Activity recorder poisoned: {}", e),
        }
    }

    pub fn records(&self) -> Vec<ActivityRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of stream events of one kind.
    pub fn stream_count(&self, kind: StreamKind) -> usize {
        self.records()
            .iter()
            .filter(|r| matches!(r, ActivityRecord::Stream(k, _) if *k == kind))
            .count()
    }

    /// Concepts of the discrete events, in order.
    pub fn event_concepts(&self) -> Vec<String> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                ActivityRecord::Event(e) => Some(e.concept),
                _ => None,
            })
            .collect()
    }
}

impl ActivityLogger for RecordingActivityLogger {
    fn log_event(&self, event: &ActivityEvent) {
        self.push(ActivityRecord::Event(event.clone()));
    }

    fn log_stream(&self, kind: StreamKind, payload: &Value) {
        self.push(ActivityRecord::Stream(kind, payload.clone()));
    }

    fn start_activity(&self, id: &str, kind: &str, name: &str) {
        self.push(ActivityRecord::Start {
            id: id.to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
        });
    }

    fn end_activity(&self) {
        self.push(ActivityRecord::End);
    }
}

/// Activity reporting settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Minimum spacing of zoom reports in milliseconds.
    pub zoom_log_interval_ms: f64,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            zoom_log_interval_ms: DEFAULT_ZOOM_LOG_INTERVAL_MS,
        }
    }
}

/// Lets an event through at most once per interval of host time.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiter {
    interval_ms: f64,
    last_ms: Option<f64>,
}

impl RateLimiter {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms: interval_ms.max(0.0),
            last_ms: None,
        }
    }

    /// Returns `true` and records `now_ms` if enough time has passed.
    pub fn allow(&mut self, now_ms: f64) -> bool {
        match self.last_ms {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last_ms = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}
