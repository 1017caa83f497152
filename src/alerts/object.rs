//! Watched object view and transition records

use super::types::{Error, Result, PREVIOUS_STATE_ANNOTATION};
use crate::crds::StatusAlert;
use chrono::{DateTime, Utc};
use kube::api::DynamicObject;
use kube::ResourceExt;
use std::collections::BTreeMap;

/// State the controller reads from a watched object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedObject {
    pub name: String,
    /// Empty for cluster-scoped objects
    pub namespace: String,
    /// `.status.state`, empty when absent
    pub state: String,
    /// `.status.message`, empty when absent
    pub message: String,
    pub annotations: BTreeMap<String, String>,
}

impl WatchedObject {
    pub fn new(namespace: &str, name: &str, state: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            state: state.to_string(),
            message: message.to_string(),
            annotations: BTreeMap::new(),
        }
    }

    /// Build the view from a dynamically typed object
    pub fn from_dynamic(object: &DynamicObject) -> Result<Self> {
        let name = object.metadata.name.clone().ok_or(Error::MissingObjectKey)?;
        let status = object.data.get("status");
        let status_field = |field: &str| {
            status
                .and_then(|s| s.get(field))
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Self {
            name,
            namespace: object.namespace().unwrap_or_default(),
            state: status_field("state"),
            message: status_field("message"),
            annotations: object.annotations().clone(),
        })
    }

    /// Previously recorded state; an object never processed reports ""
    pub fn previous_state(&self) -> &str {
        self.annotations
            .get(PREVIOUS_STATE_ANNOTATION)
            .map_or("", String::as_str)
    }

    /// `namespace/name`
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Identity of the `StatusAlert` that owns a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertIdentity {
    pub name: String,
    pub namespace: String,
    pub watch_kind: String,
}

impl From<&StatusAlert> for AlertIdentity {
    fn from(alert: &StatusAlert) -> Self {
        Self {
            name: alert.name_any(),
            namespace: alert.namespace().unwrap_or_default(),
            watch_kind: alert.spec.watch_kind.clone(),
        }
    }
}

/// One detected transition, handed to every enabled dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub alert: AlertIdentity,
    pub object_name: String,
    pub object_namespace: String,
    pub previous_state: String,
    pub current_state: String,
    pub message: String,
    pub detected_at: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn new(alert: &AlertIdentity, object: &WatchedObject, detected_at: DateTime<Utc>) -> Self {
        Self {
            alert: alert.clone(),
            object_name: object.name.clone(),
            object_namespace: object.namespace.clone(),
            previous_state: object.previous_state().to_string(),
            current_state: object.state.clone(),
            message: object.message.clone(),
            detected_at,
        }
    }

    /// Transitions into `Failed` are reported with warning severity
    pub fn is_failure(&self) -> bool {
        self.current_state == "Failed"
    }

    /// Human readable sentence used as the event note
    pub fn describe(&self) -> String {
        format!(
            "{} {} status changed from '{}' to '{}': {}",
            self.alert.watch_kind,
            self.object_name,
            self.previous_state,
            self.current_state,
            self.message
        )
    }
}
