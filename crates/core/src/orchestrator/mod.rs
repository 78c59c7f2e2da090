//! Test orchestrator.
//!
//! Runs many test cases against one shared remote service:
//! - **Dispatch**: disabled cases are skipped, the rest go into a shared queue
//! - **Workers**: at most `max_workers` cases execute at once
//! - **Collection**: a single collector builds the report in completion order

mod config;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::{Orchestrator, ProgressCallback};
pub use types::{AggregateReport, FailureRecord, OrchestratorError};
