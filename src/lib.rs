/*
 * 5D Labs Status Alerts - Kubernetes Controller for Status Transition Alerts
 * Copyright (C) 2025 5D Labs
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::doc_markdown)]

//! Status alerts controller library
//!
//! This crate provides the `StatusAlert` custom resource and the control loop
//! that watches other resources for status transitions, fans each transition
//! out to events, logs and files, and keeps cumulative counters on the
//! `StatusAlert` status.

pub mod alerts;
pub mod crds;

// Re-export commonly used types
pub use alerts::config::ControllerConfig;
pub use alerts::cycle::{CycleCounts, CycleOrchestrator};
pub use alerts::detector::detect;
pub use alerts::schedule::Scheduler;
pub use crds::{AlertPhase, StatusAlert, StatusAlertSpec, StatusAlertStatus};
