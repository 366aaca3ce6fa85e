//! Diagnostic events and the sinks that receive them.
//!
//! On every positive detection the monitor builds one [`DiagnosticEvent`]
//! and hands it to each attached sink that supports structured metadata.
//! Sink calls are fire-and-forget: the monitor runs them inline with the
//! host's step loop and never retries, buffers, or batches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Kind of condition a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Consecutive-outlier streak exceeded the patience.
    LossSpike,
    /// Sustained fraction of the window above the loss cap.
    HighLoss,
}

impl DiagnosticKind {
    /// Stable key used when exporting the event to metadata stores.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::LossSpike => "loss_spike",
            DiagnosticKind::HighLoss => "high_loss",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured record of a detection, handed to every attached sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    /// The detected condition.
    pub kind: DiagnosticKind,

    /// Human-readable description of the detection.
    pub message: String,

    /// Snapshot of the rolling window at detection time, oldest first.
    pub loss_window: Vec<f64>,

    /// Timestamp when the detection fired.
    pub detected_at: DateTime<Utc>,

    /// Additional context about the detection.
    pub details: HashMap<String, String>,
}

impl DiagnosticEvent {
    /// Creates a new event with the given kind, message, and window snapshot.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, loss_window: Vec<f64>) -> Self {
        Self {
            kind,
            message: message.into(),
            loss_window,
            detected_at: Utc::now(),
            details: HashMap::new(),
        }
    }

    /// Adds a detail to this event.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Capability interface for telemetry destinations.
///
/// Any attached sink exposing [`record`](DiagnosticSink::record) receives
/// every diagnostic; sinks that report no structured-metadata support are
/// skipped without error. Implementations must be fast and non-blocking by
/// contract (local append, log record, or equivalent).
pub trait DiagnosticSink: Send + Sync {
    /// Records one diagnostic event.
    fn record(&self, event: &DiagnosticEvent);

    /// Whether this sink accepts structured metadata.
    ///
    /// Sinks answering false are silently skipped by the dispatch loop.
    fn supports_structured_metadata(&self) -> bool {
        true
    }
}

/// Sink that forwards diagnostics to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: &DiagnosticEvent) {
        let details = serde_json::to_string(&event.details).unwrap_or_default();
        warn!(
            kind = event.kind.as_str(),
            message = %event.message,
            window_len = event.loss_window.len(),
            details = %details,
            "Loss diagnostic"
        );
    }
}

/// In-memory sink for tests and local runs.
///
/// A cloneable handle over shared storage, so callers can keep a handle
/// after attaching the sink to a monitor and inspect recorded events later.
#[derive(Debug, Clone, Default)]
pub struct InMemorySink {
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
}

impl InMemorySink {
    /// Creates an empty in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events, in recording order.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// True if no events have been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discards all recorded events.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl DiagnosticSink for InMemorySink {
    fn record(&self, event: &DiagnosticEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}
