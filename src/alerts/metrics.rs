//! Process-wide controller counters served on `/metrics`

use super::cycle::CycleCounts;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct ControllerMetrics {
    cycles_succeeded: AtomicU64,
    cycles_failed: AtomicU64,
    objects_watched: AtomicU64,
    transitions_detected: AtomicU64,
    events_dispatched: AtomicU64,
    logs_dispatched: AtomicU64,
    files_written: AtomicU64,
    marker_failures: AtomicU64,
    status_update_failures: AtomicU64,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub cycles_succeeded: u64,
    pub cycles_failed: u64,
    /// Objects enumerated by the most recent cycle across all alerts
    pub objects_watched: u64,
    pub transitions_detected: u64,
    pub events_dispatched: u64,
    pub logs_dispatched: u64,
    pub files_written: u64,
    pub marker_failures: u64,
    pub status_update_failures: u64,
}

impl ControllerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, counts: &CycleCounts) {
        self.cycles_succeeded.fetch_add(1, Ordering::Relaxed);
        self.objects_watched.store(counts.watched, Ordering::Relaxed);
        self.transitions_detected
            .fetch_add(counts.transitions, Ordering::Relaxed);
        self.events_dispatched.fetch_add(counts.events, Ordering::Relaxed);
        self.logs_dispatched.fetch_add(counts.logs, Ordering::Relaxed);
        self.files_written.fetch_add(counts.files, Ordering::Relaxed);
        self.marker_failures
            .fetch_add(counts.marker_failures, Ordering::Relaxed);
    }

    pub fn record_cycle_failure(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_status_update_failure(&self) {
        self.status_update_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cycles_succeeded: self.cycles_succeeded.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            objects_watched: self.objects_watched.load(Ordering::Relaxed),
            transitions_detected: self.transitions_detected.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            logs_dispatched: self.logs_dispatched.load(Ordering::Relaxed),
            files_written: self.files_written.load(Ordering::Relaxed),
            marker_failures: self.marker_failures.load(Ordering::Relaxed),
            status_update_failures: self.status_update_failures.load(Ordering::Relaxed),
        }
    }
}
