use super::{DispatchError, DispatchKind, Dispatcher};
use crate::alerts::object::TransitionRecord;
use async_trait::async_trait;
use chrono::SecondsFormat;
use tracing::info;

/// Writes one structured record per transition to the diagnostic stream
pub struct LogDispatcher;

#[async_trait]
impl Dispatcher for LogDispatcher {
    fn kind(&self) -> DispatchKind {
        DispatchKind::Log
    }

    async fn dispatch(&self, record: &TransitionRecord) -> Result<(), DispatchError> {
        info!(
            target: "status_alerts::transition",
            status_alert = %record.alert.name,
            object = %record.object_name,
            namespace = %record.object_namespace,
            previous_state = %record.previous_state,
            current_state = %record.current_state,
            status_message = %record.message,
            timestamp = %record.detected_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "{} status changed",
            record.alert.watch_kind
        );
        Ok(())
    }
}
