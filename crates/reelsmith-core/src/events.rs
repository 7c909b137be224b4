//! Pipeline events and the broadcast bus that carries them.
//!
//! Job lifecycle transitions and user-facing notifications (the short
//! success/error messages a UI shows as toasts) are published on one
//! [`EventBus`]. Consumers such as the CLI progress printer subscribe
//! independently; emitting with no subscribers is not an error.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::JobKind;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Domain payload of a pipeline event.
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"JobProgress","kind":"analysis","run_id":"...","percent":40.0,"message":"..."}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    /// A job start request was accepted for sending.
    JobSubmitted { kind: JobKind, run_id: Uuid },
    /// A poll tick reported progress.
    JobProgress {
        kind: JobKind,
        run_id: Uuid,
        percent: f64,
        message: String,
    },
    /// A job reached `Completed`.
    JobCompleted { kind: JobKind, run_id: Uuid },
    /// A job reached `Failed`.
    JobFailed {
        kind: JobKind,
        run_id: Uuid,
        message: String,
    },
    /// Short message for the user.
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

impl PipelineEvent {
    /// Dot-namespaced event name, e.g. `"job.progress"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::JobSubmitted { .. } => "job.submitted",
            Self::JobProgress { .. } => "job.progress",
            Self::JobCompleted { .. } => "job.completed",
            Self::JobFailed { .. } => "job.failed",
            Self::Notification { .. } => "notification",
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::Notification {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Notification {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Envelope stamped on every emitted event.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event identifier (UUIDv7 for temporal ordering).
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub occurred_at: DateTime<Utc>,
    pub payload: PipelineEvent,
}

impl EventEnvelope {
    pub fn new(event: PipelineEvent) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type(),
            occurred_at: Utc::now(),
            payload: event,
        }
    }
}

/// Broadcast bus for pipeline events. Cloning shares the channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Dropped silently when nobody listens.
    pub fn emit(&self, event: PipelineEvent) {
        let envelope = EventEnvelope::new(event);
        tracing::debug!(
            event_type = envelope.event_type,
            event_id = %envelope.event_id,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    /// Subscribe to receive events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}
