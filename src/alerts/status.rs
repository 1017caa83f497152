//! Status aggregation
//!
//! Folds a cycle's counts into the cumulative `StatusAlert` status. Cycles
//! that dispatched nothing leave the status untouched and skip the write.

use super::cycle::CycleCounts;
use super::types::Result;
use crate::crds::{AlertPhase, StatusAlert, StatusAlertStatus};
use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;

/// Summary written to `status.message` for one cycle
pub fn cycle_message(counts: &CycleCounts) -> String {
    format!(
        "Events: {}, Logs: {}, Files: {}",
        counts.events, counts.logs, counts.files
    )
}

/// New status after folding `counts` in, or `None` when nothing was dispatched
pub fn apply_counts(status: &StatusAlertStatus, counts: &CycleCounts) -> Option<StatusAlertStatus> {
    if !counts.has_dispatches() {
        return None;
    }

    Some(StatusAlertStatus {
        watched_objects: counts.watched,
        events_generated: status.events_generated.saturating_add(counts.events),
        logs_generated: status.logs_generated.saturating_add(counts.logs),
        file_logs_written: status.file_logs_written.saturating_add(counts.files),
        status: Some(AlertPhase::Active),
        message: Some(cycle_message(counts)),
    })
}

/// Merge patch carrying the full status, pinned to the resourceVersion the
/// totals were computed from. A stale cache makes the write fail with a
/// conflict instead of lowering the counters.
pub fn status_patch(alert: &StatusAlert, status: &StatusAlertStatus) -> serde_json::Value {
    let mut patch = json!({ "status": status });
    if let Some(resource_version) = alert.resource_version() {
        patch["metadata"] = json!({ "resourceVersion": resource_version });
    }
    patch
}

/// Persistence for the `StatusAlert` status
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn persist(&self, alert: &StatusAlert, status: &StatusAlertStatus) -> Result<()>;
}

/// Writes through the `status` subresource
pub struct KubeStatusStore {
    client: Client,
}

impl KubeStatusStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatusStore for KubeStatusStore {
    async fn persist(&self, alert: &StatusAlert, status: &StatusAlertStatus) -> Result<()> {
        let api: Api<StatusAlert> = match alert.namespace() {
            Some(namespace) => Api::namespaced(self.client.clone(), &namespace),
            None => Api::all(self.client.clone()),
        };

        let status_patch = status_patch(alert, status);

        // Status subresource so the write does not bump the spec generation
        api.patch_status(
            &alert.name_any(),
            &PatchParams::default(),
            &Patch::Merge(&status_patch),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(events: u64, logs: u64, files: u64) -> CycleCounts {
        CycleCounts {
            watched: 5,
            transitions: 2,
            events,
            logs,
            files,
            marker_failures: 0,
        }
    }

    #[test]
    fn test_all_zero_counts_leave_status_unchanged() {
        let status = StatusAlertStatus {
            events_generated: 7,
            ..StatusAlertStatus::default()
        };
        assert!(apply_counts(&status, &counts(0, 0, 0)).is_none());
    }

    #[test]
    fn test_counts_are_added_and_message_overwritten() {
        let status = StatusAlertStatus {
            watched_objects: 1,
            events_generated: 3,
            logs_generated: 4,
            file_logs_written: 5,
            status: None,
            message: Some("Events: 9, Logs: 9, Files: 9".to_string()),
        };

        let updated = apply_counts(&status, &counts(2, 0, 1)).unwrap();
        assert_eq!(updated.watched_objects, 5);
        assert_eq!(updated.events_generated, 5);
        assert_eq!(updated.logs_generated, 4);
        assert_eq!(updated.file_logs_written, 6);
        assert_eq!(updated.status, Some(AlertPhase::Active));
        assert_eq!(updated.message.as_deref(), Some("Events: 2, Logs: 0, Files: 1"));
    }

    #[test]
    fn test_counters_saturate() {
        let status = StatusAlertStatus {
            logs_generated: u64::MAX - 1,
            ..StatusAlertStatus::default()
        };
        let updated = apply_counts(&status, &counts(0, 5, 0)).unwrap();
        assert_eq!(updated.logs_generated, u64::MAX);
    }

    #[test]
    fn test_status_patch_pins_resource_version() {
        let mut alert = StatusAlert::new(
            "watch-tests",
            crate::crds::StatusAlertSpec {
                watch_kind: "TestObject".to_string(),
                watch_namespace: String::new(),
                watch_api_version: None,
                enable_events: false,
                enable_logging: true,
                enable_file_log: false,
                log_file_path: None,
            },
        );
        let status = apply_counts(&StatusAlertStatus::default(), &counts(0, 2, 0)).unwrap();

        let unversioned = status_patch(&alert, &status);
        assert!(unversioned.get("metadata").is_none());
        assert_eq!(unversioned["status"]["logsGenerated"], 2);

        alert.metadata.resource_version = Some("4711".to_string());
        let patch = status_patch(&alert, &status);
        assert_eq!(patch["metadata"]["resourceVersion"], "4711");
        assert_eq!(patch["status"]["message"], "Events: 0, Logs: 2, Files: 0");
    }

    #[test]
    fn test_counters_never_decrease_over_cycles() {
        let cycles = [
            counts(1, 0, 0),
            counts(0, 0, 0),
            counts(0, 3, 2),
            counts(0, 0, 0),
            counts(4, 4, 4),
        ];

        let mut status = StatusAlertStatus::default();
        for cycle in &cycles {
            if let Some(next) = apply_counts(&status, cycle) {
                assert!(next.events_generated >= status.events_generated);
                assert!(next.logs_generated >= status.logs_generated);
                assert!(next.file_logs_written >= status.file_logs_written);
                status = next;
            }
        }
        assert_eq!(status.events_generated, 5);
        assert_eq!(status.logs_generated, 7);
        assert_eq!(status.file_logs_written, 6);
    }
}
