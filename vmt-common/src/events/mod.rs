//! Event system for VMT
//!
//! Provides the shared event definitions and the EventBus used to announce
//! ingest results to whoever is listening (chat bridges, dashboards).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::db::ReportStatistics;

/// VMT event types
///
/// Events are broadcast via EventBus and can be serialized for transmission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VmtEvent {
    /// A batch created or changed at least one issue
    ///
    /// Triggers:
    /// - Chat notification ("N new issues for template X in unit Y")
    IssuesDetected {
        template_name: String,
        template_display_name: String,
        unit_id: Uuid,
        /// Created + merged
        new_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// A template finished applying to a report
    TemplateApplied {
        report_id: Uuid,
        template_name: String,
        statistics: ReportStatistics,
        timestamp: DateTime<Utc>,
    },
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use vmt_common::events::{EventBus, VmtEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(VmtEvent::IssuesDetected {
///     template_name: "zap".to_string(),
///     template_display_name: "OWASP ZAP".to_string(),
///     unit_id: uuid::Uuid::new_v4(),
///     new_count: 2,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VmtEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering at most `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<VmtEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if nobody is listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: VmtEvent) -> Result<usize, broadcast::error::SendError<VmtEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: VmtEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
