//! Notification sink used by the event dispatcher

use super::dispatch::DispatchError;
use crate::crds::StatusAlert;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};

/// Severity of a transition notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
}

/// One outbound notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub reason: String,
    pub action: String,
    pub note: String,
}

/// Outbound notification transport, bound to the subject it reports on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Hand the notification to the transport. `Err` means it was rejected synchronously.
    async fn publish(&self, notification: Notification) -> Result<(), DispatchError>;
}

/// Kubernetes Events regarding a single `StatusAlert`
pub struct KubeEventSink {
    recorder: Recorder,
    regarding: ObjectReference,
}

impl KubeEventSink {
    pub fn for_alert(client: Client, reporter: Reporter, alert: &StatusAlert) -> Self {
        Self {
            recorder: Recorder::new(client, reporter),
            regarding: alert.object_ref(&()),
        }
    }
}

#[async_trait]
impl NotificationSink for KubeEventSink {
    async fn publish(&self, notification: Notification) -> Result<(), DispatchError> {
        let type_ = match notification.severity {
            Severity::Normal => EventType::Normal,
            Severity::Warning => EventType::Warning,
        };

        self.recorder
            .publish(
                &Event {
                    type_,
                    reason: notification.reason,
                    note: Some(notification.note),
                    action: notification.action,
                    secondary: None,
                },
                &self.regarding,
            )
            .await
            .map_err(|e| DispatchError::Sink(e.to_string()))
    }
}
