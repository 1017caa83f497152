//! `StatusAlert` controller
//!
//! Wires the cycle orchestrator into the kube-rs controller runtime. Every
//! reconcile runs one full cycle for the alert and asks to be requeued after
//! the long interval; failed cycles go through `error_policy`, which picks
//! the short interval for transient failures.

use super::cycle::{CycleCounts, CycleOrchestrator};
use super::dispatch::DispatcherSet;
use super::metrics::ControllerMetrics;
use super::schedule::Scheduler;
use super::sink::{KubeEventSink, NotificationSink};
use super::status::{apply_counts, KubeStatusStore, StatusStore};
use super::store::{resolve_kind, KubeObjectStore};
use super::types::{Context, Error, Result};
use crate::crds::StatusAlert;
use futures::StreamExt;
use kube::api::ListParams;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher::Config;
use kube::{Api, ResourceExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn, Instrument};

/// Run the `StatusAlert` controller until its watch stream ends.
///
/// `ready` is set once the `StatusAlert` API has answered a list call and is
/// cleared again when the controller stops.
pub async fn run_alert_controller(context: Arc<Context>, ready: Arc<AtomicBool>) -> Result<()> {
    let alerts: Api<StatusAlert> = match std::env::var("WATCH_NAMESPACE") {
        Ok(namespace) if !namespace.trim().is_empty() => {
            info!(namespace = %namespace, "Starting StatusAlert controller for a single namespace");
            Api::namespaced(context.client.clone(), namespace.trim())
        }
        _ => {
            info!("Starting StatusAlert controller for all namespaces");
            Api::all(context.client.clone())
        }
    };

    mark_ready_after(
        async {
            alerts.list(&ListParams::default().limit(1)).await?;
            Ok::<(), Error>(())
        },
        &ready,
    )
    .await?;
    info!("StatusAlert API reachable, controller ready");

    Controller::new(alerts, Config::default().any_semantic())
        .run(reconcile_status_alert, error_policy, context)
        .for_each(|reconciliation_result| {
            let span = tracing::info_span!("status_alert_reconciliation_result");
            async move {
                match reconciliation_result {
                    Ok(resource) => {
                        debug!(resource = ?resource, "StatusAlert reconciliation successful");
                    }
                    Err(reconciliation_err) => {
                        error!(error = ?reconciliation_err, "StatusAlert reconciliation error");
                    }
                }
            }
            .instrument(span)
        })
        .await;

    ready.store(false, Ordering::SeqCst);
    info!("StatusAlert controller shutting down");
    Ok(())
}

/// Set `ready` only after `check` succeeds
pub async fn mark_ready_after<F>(check: F, ready: &AtomicBool) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    check.await?;
    ready.store(true, Ordering::SeqCst);
    Ok(())
}

/// Run one cycle for `alert` against the cluster
#[instrument(skip(alert, ctx), fields(status_alert = %alert.name_any(), namespace = %alert.namespace().unwrap_or_default()))]
pub async fn reconcile_status_alert(alert: Arc<StatusAlert>, ctx: Arc<Context>) -> Result<Action> {
    let config = &ctx.config;
    let api_version = alert
        .spec
        .effective_api_version(&config.watch.default_api_version)
        .to_string();

    let kind = match resolve_kind(
        &ctx.client,
        &ctx.resolved_kinds,
        &api_version,
        &alert.spec.watch_kind,
    )
    .await
    {
        Ok(kind) => kind,
        Err(e) => {
            ctx.metrics.record_cycle_failure();
            return Err(e);
        }
    };

    let store = Arc::new(KubeObjectStore::new(
        ctx.client.clone(),
        kind,
        config.watch.page_size,
    ));
    let dispatchers = DispatcherSet::from_spec(&alert.spec, &config.file_log.default_path, || {
        Arc::new(KubeEventSink::for_alert(
            ctx.client.clone(),
            ctx.reporter.clone(),
            &alert,
        )) as Arc<dyn NotificationSink>
    });
    debug!(dispatchers = ?dispatchers.kinds(), "Selected dispatchers");

    let orchestrator = CycleOrchestrator::new(store, dispatchers)
        .with_concurrency(config.watch.object_concurrency);
    let status_store = KubeStatusStore::new(ctx.client.clone());

    execute_cycle(
        &alert,
        &orchestrator,
        &status_store,
        &ctx.metrics,
        &Scheduler::from_config(&config.schedule),
        config.schedule.cycle_timeout(),
    )
    .await
}

/// Cycle, status fold and scheduling for one alert.
///
/// A status write failure is logged and does not fail the cycle: the next
/// successful cycle writes the cumulative total again.
pub async fn execute_cycle(
    alert: &StatusAlert,
    orchestrator: &CycleOrchestrator,
    status_store: &dyn StatusStore,
    metrics: &ControllerMetrics,
    scheduler: &Scheduler,
    cycle_timeout: Duration,
) -> Result<Action> {
    let counts = match tokio::time::timeout(cycle_timeout, orchestrator.run_cycle(alert)).await {
        Ok(Ok(counts)) => counts,
        Ok(Err(e)) => {
            metrics.record_cycle_failure();
            return Err(e);
        }
        Err(_) => {
            metrics.record_cycle_failure();
            return Err(Error::CycleTimeout(cycle_timeout));
        }
    };
    metrics.record_cycle(&counts);

    persist_counts(alert, &counts, status_store, metrics).await;
    Ok(scheduler.on_success())
}

async fn persist_counts(
    alert: &StatusAlert,
    counts: &CycleCounts,
    status_store: &dyn StatusStore,
    metrics: &ControllerMetrics,
) {
    let current = alert.status.clone().unwrap_or_default();
    let Some(updated) = apply_counts(&current, counts) else {
        debug!("Nothing dispatched this cycle, status left as is");
        return;
    };

    match status_store.persist(alert, &updated).await {
        Ok(()) => info!(
            events_generated = updated.events_generated,
            logs_generated = updated.logs_generated,
            file_logs_written = updated.file_logs_written,
            "Updated StatusAlert status"
        ),
        Err(Error::KubeError(kube::Error::Api(response))) if response.code == 409 => {
            metrics.record_status_update_failure();
            warn!(
                resource_version = ?alert.resource_version(),
                "StatusAlert changed since it was read, dropping this cycle's increments"
            );
        }
        Err(e) => {
            metrics.record_status_update_failure();
            warn!(error = %e, "Failed to update StatusAlert status");
        }
    }
}

/// Short requeue for transient failures, long requeue otherwise
fn error_policy(alert: Arc<StatusAlert>, err: &Error, ctx: Arc<Context>) -> Action {
    let scheduler = Scheduler::from_config(&ctx.config.schedule);
    let action = scheduler.on_failure(err);
    error!(
        error = %err,
        status_alert = %alert.name_any(),
        retryable = err.is_retryable(),
        "StatusAlert cycle failed"
    );
    action
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::dispatch::LogDispatcher;
    use crate::alerts::object::WatchedObject;
    use crate::alerts::store::{InMemoryObjectStore, WatchedObjectStore};
    use crate::crds::{AlertPhase, StatusAlertSpec, StatusAlertStatus};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    fn alert(status: Option<StatusAlertStatus>) -> StatusAlert {
        let mut alert = StatusAlert::new(
            "watch-tests",
            StatusAlertSpec {
                watch_kind: "TestObject".to_string(),
                watch_namespace: String::new(),
                watch_api_version: None,
                enable_events: false,
                enable_logging: true,
                enable_file_log: false,
                log_file_path: None,
            },
        );
        alert.metadata.namespace = Some("default".to_string());
        alert.status = status;
        alert
    }

    #[derive(Default)]
    struct RecordingStatusStore {
        written: Mutex<Vec<StatusAlertStatus>>,
        fail: bool,
    }

    #[async_trait]
    impl StatusStore for RecordingStatusStore {
        async fn persist(&self, _alert: &StatusAlert, status: &StatusAlertStatus) -> Result<()> {
            if self.fail {
                return Err(Error::Store("conflict".to_string()));
            }
            self.written.lock().unwrap().push(status.clone());
            Ok(())
        }
    }

    struct HangingStore;

    #[async_trait]
    impl WatchedObjectStore for HangingStore {
        async fn list(&self, _namespace: Option<&str>) -> Result<Vec<WatchedObject>> {
            futures::future::pending().await
        }

        async fn patch_annotations(
            &self,
            _object: &WatchedObject,
            _annotations: BTreeMap<String, String>,
        ) -> Result<()> {
            Ok(())
        }
    }

    /// Accepts a write only when it was computed from the latest resourceVersion
    struct VersionedStatusStore {
        current: Mutex<(u64, StatusAlertStatus)>,
    }

    impl VersionedStatusStore {
        fn new() -> Self {
            Self {
                current: Mutex::new((1, StatusAlertStatus::default())),
            }
        }

        fn status(&self) -> StatusAlertStatus {
            self.current.lock().unwrap().1.clone()
        }
    }

    #[async_trait]
    impl StatusStore for VersionedStatusStore {
        async fn persist(&self, alert: &StatusAlert, status: &StatusAlertStatus) -> Result<()> {
            let mut current = self.current.lock().unwrap();
            if alert.resource_version() != Some(current.0.to_string()) {
                return Err(Error::Store("resourceVersion conflict".to_string()));
            }
            let next_version = current.0 + 1;
            *current = (next_version, status.clone());
            Ok(())
        }
    }

    fn assert_send<T: Send>(_: T) {}

    fn orchestrator(store: Arc<dyn WatchedObjectStore>) -> CycleOrchestrator {
        CycleOrchestrator::new(store, DispatcherSet::new().with(Arc::new(LogDispatcher)))
    }

    #[tokio::test]
    async fn test_successful_cycle_persists_and_requeues_long() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert(WatchedObject::new("default", "a", "Running", "up"));
        store.insert(WatchedObject::new("default", "b", "Pending", ""));
        let status_store = RecordingStatusStore::default();
        let metrics = ControllerMetrics::new();
        let scheduler = Scheduler::default();

        let existing = StatusAlertStatus {
            logs_generated: 10,
            ..StatusAlertStatus::default()
        };
        let action = execute_cycle(
            &alert(Some(existing)),
            &orchestrator(store),
            &status_store,
            &metrics,
            &scheduler,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(action, Action::requeue(Duration::from_secs(300)));
        let written = status_store.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].logs_generated, 12);
        assert_eq!(written[0].watched_objects, 2);
        assert_eq!(written[0].status, Some(AlertPhase::Active));
        assert_eq!(metrics.snapshot().cycles_succeeded, 1);
    }

    #[tokio::test]
    async fn test_quiet_cycle_skips_status_write() {
        let store = Arc::new(InMemoryObjectStore::new());
        let status_store = RecordingStatusStore::default();
        let metrics = ControllerMetrics::new();

        let action = execute_cycle(
            &alert(None),
            &orchestrator(store),
            &status_store,
            &metrics,
            &Scheduler::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(action, Action::requeue(Duration::from_secs(300)));
        assert!(status_store.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_write_failure_does_not_fail_cycle() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert(WatchedObject::new("default", "a", "Running", ""));
        let status_store = RecordingStatusStore {
            fail: true,
            ..RecordingStatusStore::default()
        };
        let metrics = ControllerMetrics::new();

        let result = execute_cycle(
            &alert(None),
            &orchestrator(store.clone()),
            &status_store,
            &metrics,
            &Scheduler::default(),
            Duration::from_secs(5),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(metrics.snapshot().status_update_failures, 1);
        assert_eq!(store.get("default", "a").unwrap().previous_state(), "Running");
    }

    #[tokio::test]
    async fn test_slow_enumeration_times_out() {
        let status_store = RecordingStatusStore::default();
        let metrics = ControllerMetrics::new();

        let err = execute_cycle(
            &alert(None),
            &orchestrator(Arc::new(HangingStore)),
            &status_store,
            &metrics,
            &Scheduler::default(),
            Duration::from_millis(20),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::CycleTimeout(_)));
        assert_eq!(
            Scheduler::default().on_failure(&err),
            Action::requeue(Duration::from_secs(60))
        );
        assert_eq!(metrics.snapshot().cycles_failed, 1);
        assert!(status_store.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_future_is_send() {
        let _reconcile = |alert: Arc<StatusAlert>, ctx: Arc<Context>| {
            assert_send(reconcile_status_alert(alert, ctx));
        };
        let _cycle = |orchestrator: CycleOrchestrator, alert: StatusAlert| {
            assert_send(async move { orchestrator.run_cycle(&alert).await });
        };
    }

    #[tokio::test]
    async fn test_stale_alert_never_lowers_counters() {
        let store = Arc::new(InMemoryObjectStore::new());
        store.insert(WatchedObject::new("default", "a", "Running", ""));
        store.insert(WatchedObject::new("default", "b", "Running", ""));
        let status_store = VersionedStatusStore::new();
        let metrics = ControllerMetrics::new();
        let orchestrator = orchestrator(store.clone());

        let mut cached = alert(None);
        cached.metadata.resource_version = Some("1".to_string());

        execute_cycle(
            &cached,
            &orchestrator,
            &status_store,
            &metrics,
            &Scheduler::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(status_store.status().logs_generated, 2);

        // Reconciled again before the first write came back through the watch
        store.set_state("default", "a", "Failed");
        execute_cycle(
            &cached,
            &orchestrator,
            &status_store,
            &metrics,
            &Scheduler::default(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(status_store.status().logs_generated, 2);
        assert_eq!(metrics.snapshot().status_update_failures, 1);
    }

    #[tokio::test]
    async fn test_ready_only_after_check_succeeds() {
        let ready = AtomicBool::new(false);
        let result = mark_ready_after(
            async { Err::<(), Error>(Error::Store("forbidden".to_string())) },
            &ready,
        )
        .await;
        assert!(result.is_err());
        assert!(!ready.load(Ordering::SeqCst));

        mark_ready_after(async { Ok::<(), Error>(()) }, &ready)
            .await
            .unwrap();
        assert!(ready.load(Ordering::SeqCst));
    }
}
