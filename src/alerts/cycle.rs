//! Cycle orchestration
//!
//! One cycle enumerates the watched objects of a `StatusAlert`, and for each
//! object runs detect, then the enabled dispatchers, then the state marker.
//! Objects are independent: a failure on one object is logged and the cycle
//! moves on. Only an enumeration failure aborts the cycle, before any object
//! is touched.

use super::detector::has_transitioned;
use super::dispatch::{DispatchKind, DispatcherSet};
use super::marker::StateMarker;
use super::object::{AlertIdentity, TransitionRecord, WatchedObject};
use super::store::WatchedObjectStore;
use super::types::{Error, Result};
use crate::crds::StatusAlert;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tally of one cycle. `events`, `logs` and `files` count successful
/// dispatches over the objects that changed this cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleCounts {
    /// Objects enumerated
    pub watched: u64,
    /// Objects whose state changed
    pub transitions: u64,
    pub events: u64,
    pub logs: u64,
    pub files: u64,
    /// Changed objects whose new state could not be recorded
    pub marker_failures: u64,
}

impl CycleCounts {
    /// Whether any dispatcher succeeded this cycle
    pub fn has_dispatches(&self) -> bool {
        self.events > 0 || self.logs > 0 || self.files > 0
    }

    fn absorb(&mut self, outcome: ObjectOutcome) {
        let ObjectOutcome::Transitioned { dispatched, marked } = outcome else {
            return;
        };

        self.transitions += 1;
        for kind in dispatched {
            match kind {
                DispatchKind::Event => self.events += 1,
                DispatchKind::Log => self.logs += 1,
                DispatchKind::File => self.files += 1,
            }
        }
        if !marked {
            self.marker_failures += 1;
        }
    }
}

#[derive(Debug)]
enum ObjectOutcome {
    Unchanged,
    Transitioned {
        dispatched: Vec<DispatchKind>,
        marked: bool,
    },
}

/// Runs cycles for one `StatusAlert`
pub struct CycleOrchestrator {
    store: Arc<dyn WatchedObjectStore>,
    marker: StateMarker,
    dispatchers: DispatcherSet,
    concurrency: usize,
}

impl CycleOrchestrator {
    pub fn new(store: Arc<dyn WatchedObjectStore>, dispatchers: DispatcherSet) -> Self {
        Self {
            marker: StateMarker::new(store.clone()),
            store,
            dispatchers,
            concurrency: 1,
        }
    }

    /// Process up to `concurrency` objects at once. Each object's own
    /// detect, dispatch and mark steps stay sequential.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[instrument(skip(self, alert), fields(status_alert = %alert.metadata.name.as_deref().unwrap_or_default()))]
    pub async fn run_cycle(&self, alert: &StatusAlert) -> Result<CycleCounts> {
        let identity = AlertIdentity::from(alert);
        let namespace = alert.spec.namespace_filter();

        let objects = self
            .store
            .list(namespace)
            .await
            .map_err(|e| Error::Enumeration {
                kind: identity.watch_kind.clone(),
                source: Box::new(e),
            })?;

        debug!(
            kind = %identity.watch_kind,
            namespace = namespace.unwrap_or("<all>"),
            count = objects.len(),
            "Enumerated watched objects"
        );

        let mut counts = CycleCounts {
            watched: u64::try_from(objects.len()).unwrap_or(u64::MAX),
            ..CycleCounts::default()
        };

        // Collected before streaming so the reconcile future stays `Send`
        let pending: Vec<_> = objects
            .iter()
            .map(|object| self.process_object(&identity, object))
            .collect();
        let outcomes: Vec<ObjectOutcome> = stream::iter(pending)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            counts.absorb(outcome);
        }

        info!(
            watched = counts.watched,
            transitions = counts.transitions,
            events = counts.events,
            logs = counts.logs,
            files = counts.files,
            "Cycle complete"
        );
        Ok(counts)
    }

    #[instrument(skip(self, alert, object), fields(object = %object.qualified_name()))]
    async fn process_object(&self, alert: &AlertIdentity, object: &WatchedObject) -> ObjectOutcome {
        if !has_transitioned(object) {
            return ObjectOutcome::Unchanged;
        }

        let record = TransitionRecord::new(alert, object, Utc::now());
        let dispatched = self.dispatchers.dispatch_all(&record).await;

        // Marking is independent of delivery: it runs even when every dispatcher failed.
        let marked = match self.marker.mark(object, &object.state).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    object = %object.qualified_name(),
                    error = %e,
                    "Failed to record processed state; transition will be re-evaluated next cycle"
                );
                false
            }
        };

        ObjectOutcome::Transitioned { dispatched, marked }
    }
}
