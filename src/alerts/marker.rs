//! State marker
//!
//! Records the state most recently processed for a watched object on the
//! object itself, so the next cycle compares against it.

use super::object::WatchedObject;
use super::store::WatchedObjectStore;
use super::types::{Result, LAST_PROCESSED_ANNOTATION, PREVIOUS_STATE_ANNOTATION};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

pub struct StateMarker {
    store: Arc<dyn WatchedObjectStore>,
}

impl StateMarker {
    pub fn new(store: Arc<dyn WatchedObjectStore>) -> Self {
        Self { store }
    }

    /// Annotation set written for `current_state` processed at `at`
    pub fn annotations(current_state: &str, at: DateTime<Utc>) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                PREVIOUS_STATE_ANNOTATION.to_string(),
                current_state.to_string(),
            ),
            (
                LAST_PROCESSED_ANNOTATION.to_string(),
                at.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ])
    }

    /// Persist `current_state` as the object's previous state
    pub async fn mark(&self, object: &WatchedObject, current_state: &str) -> Result<()> {
        debug!(
            object = %object.qualified_name(),
            state = %current_state,
            "Marking state as processed"
        );
        self.store
            .patch_annotations(object, Self::annotations(current_state, Utc::now()))
            .await
    }
}
