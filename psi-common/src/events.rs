//! Event types and the in-process event bus
//!
//! Long-running collector work (downloads) and tag mutations publish
//! [`PsiEvent`]s so that front ends can render progress without the producer
//! knowing who is listening.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events published by the collector and the tagger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PsiEvent {
    /// A download request was answered; `total_bytes` is `None` when the
    /// server did not announce a length
    DownloadStarted {
        file_name: String,
        total_bytes: Option<u64>,
        timestamp: DateTime<Utc>,
    },

    /// Incremental download progress
    DownloadProgress {
        file_name: String,
        bytes_received: u64,
        total_bytes: Option<u64>,
    },

    /// Download finished and the archive is in place
    DownloadCompleted {
        file_name: String,
        path: String,
        bytes: u64,
        timestamp: DateTime<Utc>,
    },

    /// A download attempt failed and will be retried after `retry_in_secs`
    DownloadRetrying {
        file_name: String,
        attempt: u32,
        error: String,
        retry_in_secs: u64,
    },

    /// A user's tag changed (`value` is `None` for a removal)
    TagChanged {
        image: String,
        user_id: String,
        tag: String,
        value: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A consensus query was answered
    ConsensusEvaluated {
        image: String,
        state: String,
        timestamp: DateTime<Utc>,
    },
}

impl PsiEvent {
    /// Short name of the event, used in log lines
    pub fn event_type(&self) -> &'static str {
        match self {
            PsiEvent::DownloadStarted { .. } => "DownloadStarted",
            PsiEvent::DownloadProgress { .. } => "DownloadProgress",
            PsiEvent::DownloadCompleted { .. } => "DownloadCompleted",
            PsiEvent::DownloadRetrying { .. } => "DownloadRetrying",
            PsiEvent::TagChanged { .. } => "TagChanged",
            PsiEvent::ConsensusEvaluated { .. } => "ConsensusEvaluated",
        }
    }
}

/// Broadcast event bus
///
/// Uses `tokio::sync::broadcast` internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use psi_common::events::{EventBus, PsiEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PsiEvent::DownloadProgress {
///     file_name: "20180916a_RGB".to_string(),
///     bytes_received: 1024,
///     total_bytes: Some(4096),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PsiEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PsiEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PsiEvent) {
        let _ = self.tx.send(event);
    }
}
