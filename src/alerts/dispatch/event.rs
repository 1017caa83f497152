use super::{DispatchError, DispatchKind, Dispatcher};
use crate::alerts::object::TransitionRecord;
use crate::alerts::sink::{Notification, NotificationSink, Severity};
use crate::alerts::types::{STATUS_CHANGED_REASON, STATUS_TRANSITION_ACTION};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Emits a notification regarding the owning `StatusAlert`
pub struct EventDispatcher {
    sink: Arc<dyn NotificationSink>,
}

impl EventDispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    pub fn notification(record: &TransitionRecord) -> Notification {
        Notification {
            severity: if record.is_failure() {
                Severity::Warning
            } else {
                Severity::Normal
            },
            reason: STATUS_CHANGED_REASON.to_string(),
            action: STATUS_TRANSITION_ACTION.to_string(),
            note: record.describe(),
        }
    }
}

#[async_trait]
impl Dispatcher for EventDispatcher {
    fn kind(&self) -> DispatchKind {
        DispatchKind::Event
    }

    async fn dispatch(&self, record: &TransitionRecord) -> Result<(), DispatchError> {
        let notification = Self::notification(record);
        debug!(
            severity = ?notification.severity,
            object = %record.object_name,
            "Publishing transition event"
        );
        self.sink.publish(notification).await
    }
}
