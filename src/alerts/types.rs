use super::config::ControllerConfig;
use super::metrics::ControllerMetrics;
use super::store::ResolvedKind;
use dashmap::DashMap;
use kube::runtime::events::Reporter;
use kube::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Annotation holding the last state the controller processed
pub const PREVIOUS_STATE_ANNOTATION: &str = "status-alert/previous-state";

/// Annotation holding the RFC3339 time the last transition was processed
pub const LAST_PROCESSED_ANNOTATION: &str = "status-alert/last-processed";

/// Reason code attached to every transition event
pub const STATUS_CHANGED_REASON: &str = "StatusChanged";

/// Action attached to every transition event
pub const STATUS_TRANSITION_ACTION: &str = "StatusTransition";

/// Shared controller context
#[derive(Clone)]
pub struct Context {
    pub client: Client,
    pub config: Arc<ControllerConfig>,
    pub reporter: Reporter,
    pub metrics: Arc<ControllerMetrics>,
    /// Watched kinds resolved through discovery, keyed by `apiVersion/kind`
    pub resolved_kinds: Arc<DashMap<String, ResolvedKind>>,
}

impl Context {
    pub fn new(client: Client, config: Arc<ControllerConfig>, metrics: Arc<ControllerMetrics>) -> Self {
        let instance = std::env::var("POD_NAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .ok();

        Self {
            client,
            reporter: Reporter {
                controller: config.events.reporting_controller.clone(),
                instance,
            },
            config,
            metrics,
            resolved_kinds: Arc::new(DashMap::new()),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Object is missing a name")]
    MissingObjectKey,

    #[error("Failed to discover {kind} in {api_version}: {source}")]
    Discovery {
        api_version: String,
        kind: String,
        #[source]
        source: kube::Error,
    },

    #[error("Failed to enumerate {kind} objects: {source}")]
    Enumeration {
        kind: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Cycle did not finish within {0:?}")]
    CycleTimeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),
}

impl Error {
    /// Whether the failure is transient and should use the short requeue
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::KubeError(_)
            | Self::Discovery { .. }
            | Self::Enumeration { .. }
            | Self::CycleTimeout(_)
            | Self::Store(_) => true,
            Self::ConfigError(_) | Self::MissingObjectKey | Self::Serialization(_) => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
