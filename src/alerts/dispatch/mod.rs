//! Side-effect dispatchers
//!
//! Each dispatcher performs one best-effort write per transition. The set of
//! dispatchers for a cycle is selected once from the `StatusAlert` toggles, so
//! a disabled dispatcher is never constructed, let alone invoked.

pub mod event;
pub mod file;
pub mod log;

pub use event::EventDispatcher;
pub use file::FileDispatcher;
pub use log::LogDispatcher;

use super::object::TransitionRecord;
use super::sink::NotificationSink;
use crate::crds::StatusAlertSpec;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Capability tag of a dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchKind {
    Event,
    Log,
    File,
}

impl fmt::Display for DispatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Event => "event",
            Self::Log => "log",
            Self::File => "file",
        };
        f.write_str(value)
    }
}

/// Errors a dispatcher can report
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Notification sink rejected the event: {0}")]
    Sink(String),

    #[error("Failed to open log file {path}: {source}")]
    FileOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to log file {path}: {source}")]
    FileWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A side effect fired for every detected transition
#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn kind(&self) -> DispatchKind;

    async fn dispatch(&self, record: &TransitionRecord) -> Result<(), DispatchError>;
}

/// Dispatchers enabled for one cycle, in firing order
#[derive(Default)]
pub struct DispatcherSet {
    dispatchers: Vec<Arc<dyn Dispatcher>>,
}

impl DispatcherSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatchers.push(dispatcher);
        self
    }

    /// Select dispatchers from the toggles: events, then log, then file.
    /// `make_sink` is only called when events are enabled.
    pub fn from_spec<F>(spec: &StatusAlertSpec, default_log_path: &str, make_sink: F) -> Self
    where
        F: FnOnce() -> Arc<dyn NotificationSink>,
    {
        let mut set = Self::new();
        if spec.enable_events {
            set = set.with(Arc::new(EventDispatcher::new(make_sink())));
        }
        if spec.enable_logging {
            set = set.with(Arc::new(LogDispatcher));
        }
        if spec.enable_file_log {
            set = set.with(Arc::new(FileDispatcher::new(
                spec.effective_log_file_path(default_log_path),
            )));
        }
        set
    }

    pub fn kinds(&self) -> Vec<DispatchKind> {
        self.dispatchers.iter().map(|d| d.kind()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }

    /// Fire every dispatcher in order and return the kinds that succeeded.
    /// A failing dispatcher is logged and does not stop the ones after it.
    pub async fn dispatch_all(&self, record: &TransitionRecord) -> Vec<DispatchKind> {
        let mut succeeded = Vec::with_capacity(self.dispatchers.len());
        for dispatcher in &self.dispatchers {
            let kind = dispatcher.kind();
            match dispatcher.dispatch(record).await {
                Ok(()) => succeeded.push(kind),
                Err(e) => {
                    warn!(
                        dispatcher = %kind,
                        object = %record.object_name,
                        namespace = %record.object_namespace,
                        status_alert = %record.alert.name,
                        error = %e,
                        "Dispatcher failed, continuing"
                    );
                }
            }
        }
        succeeded
    }
}
