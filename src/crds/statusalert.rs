//! `StatusAlert` Custom Resource Definition for status transition alerting

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `StatusAlert` CRD describing what to watch and which side effects to enable
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, JsonSchema)]
#[kube(group = "example.example.com", version = "v1", kind = "StatusAlert")]
#[kube(namespaced)]
#[kube(status = "StatusAlertStatus")]
#[kube(printcolumn = r#"{"name":"WatchKind","type":"string","jsonPath":".spec.watchKind"}"#)]
#[kube(printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#)]
#[kube(printcolumn = r#"{"name":"Events","type":"integer","jsonPath":".status.eventsGenerated"}"#)]
#[kube(printcolumn = r#"{"name":"Logs","type":"integer","jsonPath":".status.logsGenerated"}"#)]
#[kube(printcolumn = r#"{"name":"Files","type":"integer","jsonPath":".status.fileLogsWritten"}"#)]
#[kube(printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#)]
pub struct StatusAlertSpec {
    /// Kind of the watched objects (e.g. "TestObject")
    #[serde(rename = "watchKind")]
    pub watch_kind: String,

    /// Namespace to watch; empty means all namespaces
    #[serde(default, rename = "watchNamespace")]
    pub watch_namespace: String,

    /// API version of the watched kind (e.g. "example.com/v1"); falls back to the controller default
    #[serde(
        default,
        rename = "watchApiVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub watch_api_version: Option<String>,

    /// Emit Kubernetes events on transitions
    #[serde(default, rename = "enableEvents")]
    pub enable_events: bool,

    /// Write a structured log record on transitions
    #[serde(default, rename = "enableLogging")]
    pub enable_logging: bool,

    /// Append a line to a local file on transitions
    #[serde(default, rename = "enableFileLog")]
    pub enable_file_log: bool,

    /// File used when `enableFileLog` is set
    #[serde(default, rename = "logFilePath", skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
}

impl StatusAlertSpec {
    /// Namespace filter for enumeration, `None` when every namespace is watched
    pub fn namespace_filter(&self) -> Option<&str> {
        let namespace = self.watch_namespace.trim();
        if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        }
    }

    /// Resolve the append target, using `default` when no path is configured
    pub fn effective_log_file_path<'a>(&'a self, default: &'a str) -> &'a str {
        self.log_file_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .unwrap_or(default)
    }

    /// Resolve the watched API version, using `default` when none is configured
    pub fn effective_api_version<'a>(&'a self, default: &'a str) -> &'a str {
        self.watch_api_version
            .as_deref()
            .filter(|version| !version.is_empty())
            .unwrap_or(default)
    }
}

/// Summarized health of a `StatusAlert`
#[derive(Deserialize, Serialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum AlertPhase {
    Active,
    Error,
    Stopped,
}

impl fmt::Display for AlertPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Active => "Active",
            Self::Error => "Error",
            Self::Stopped => "Stopped",
        };
        f.write_str(value)
    }
}

/// Status of the `StatusAlert`, owned by the controller
#[derive(Deserialize, Serialize, Clone, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusAlertStatus {
    /// Objects enumerated during the last persisted cycle
    #[serde(default)]
    pub watched_objects: u64,

    /// Cumulative number of events emitted
    #[serde(default)]
    pub events_generated: u64,

    /// Cumulative number of log records written
    #[serde(default)]
    pub logs_generated: u64,

    /// Cumulative number of file lines appended
    #[serde(default)]
    pub file_logs_written: u64,

    /// Current status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AlertPhase>,

    /// Human readable summary of the last cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_defaults_from_minimal_manifest() {
        let spec: StatusAlertSpec =
            serde_json::from_value(serde_json::json!({ "watchKind": "TestObject" })).unwrap();

        assert_eq!(spec.watch_kind, "TestObject");
        assert!(spec.namespace_filter().is_none());
        assert!(!spec.enable_events);
        assert!(!spec.enable_logging);
        assert!(!spec.enable_file_log);
        assert_eq!(
            spec.effective_log_file_path("/var/log/status-alerts.log"),
            "/var/log/status-alerts.log"
        );
        assert_eq!(
            spec.effective_api_version("example.com/v1"),
            "example.com/v1"
        );
    }

    #[test]
    fn test_empty_log_path_falls_back_to_default() {
        let spec: StatusAlertSpec = serde_json::from_value(serde_json::json!({
            "watchKind": "TestObject",
            "watchNamespace": "default",
            "enableFileLog": true,
            "logFilePath": ""
        }))
        .unwrap();

        assert_eq!(spec.namespace_filter(), Some("default"));
        assert_eq!(spec.effective_log_file_path("/tmp/fallback.log"), "/tmp/fallback.log");
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = StatusAlertStatus {
            watched_objects: 3,
            events_generated: 2,
            logs_generated: 1,
            file_logs_written: 0,
            status: Some(AlertPhase::Active),
            message: Some("Events: 2, Logs: 1, Files: 0".to_string()),
        };

        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["watchedObjects"], 3);
        assert_eq!(value["eventsGenerated"], 2);
        assert_eq!(value["fileLogsWritten"], 0);
        assert_eq!(value["status"], "Active");
    }
}
