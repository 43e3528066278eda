//! New-issue notifications
//!
//! The batch coordinator calls a `Notifier` once per batch that created or
//! merged something. Delivery is best effort: the coordinator logs and
//! discards any error returned here.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;
use vmt_common::db::Template;
use vmt_common::events::{EventBus, VmtEvent};
use vmt_common::{Error, Result};

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce `new_count` new or updated issues for `template` in `unit_id`
    async fn notify(&self, new_count: usize, template: &Template, unit_id: Uuid) -> Result<()>;
}

/// Publishes `VmtEvent::IssuesDetected` on the shared event bus
#[derive(Clone)]
pub struct EventBusNotifier {
    event_bus: EventBus,
}

impl EventBusNotifier {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

#[async_trait]
impl Notifier for EventBusNotifier {
    async fn notify(&self, new_count: usize, template: &Template, unit_id: Uuid) -> Result<()> {
        let event = VmtEvent::IssuesDetected {
            template_name: template.name.clone(),
            template_display_name: template.display_name.clone(),
            unit_id,
            new_count,
            timestamp: Utc::now(),
        };

        let receivers = self
            .event_bus
            .emit(event)
            .map_err(|_| Error::Internal("no subscribers for issue notifications".to_string()))?;

        tracing::debug!(
            template = %template.name,
            unit_id = %unit_id,
            new_count,
            receivers,
            "Issue notification published"
        );
        Ok(())
    }
}
