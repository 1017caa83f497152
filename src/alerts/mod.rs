//! Status transition alerting
//!
//! The control loop for `StatusAlert` resources. Each cycle enumerates the
//! watched objects, detects state transitions against the previous state
//! recorded on each object, fans transitions out to the enabled dispatchers,
//! records the new state and folds the per-cycle counts into the
//! `StatusAlert` status.

pub mod config;
pub mod controller;
pub mod cycle;
pub mod detector;
pub mod dispatch;
pub mod marker;
pub mod metrics;
pub mod object;
pub mod schedule;
pub mod sink;
pub mod status;
pub mod store;
pub mod types;

// Re-export commonly used items
pub use config::ControllerConfig;
pub use controller::{reconcile_status_alert, run_alert_controller};
pub use types::{Context, Error, Result};
