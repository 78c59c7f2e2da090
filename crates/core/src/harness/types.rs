//! Outcome types for a single test case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::job_run::JobRun;

/// Why a test case did not pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestFailure {
    /// Asset or preset missing before any job was created.
    #[error("{message}")]
    Preflight { message: String },

    /// Job creation was refused or returned no job id.
    #[error("{message}")]
    Submission { message: String },

    /// Job reached a terminal state other than Complete/Pass.
    #[error("{message}")]
    JobExecution { message: String, trace_uri: String },

    /// Lookup budget ran out before the job reached a terminal state.
    #[error("{message}")]
    PollTimeout {
        message: String,
        trace_uri: String,
        attempts: u32,
    },

    /// Network failure, undecodable payload, or a panic in the worker.
    #[error("{message}")]
    Transport { message: String },
}

impl TestFailure {
    pub fn kind(&self) -> FailureKind {
        match self {
            TestFailure::Preflight { .. } => FailureKind::Preflight,
            TestFailure::Submission { .. } => FailureKind::Submission,
            TestFailure::JobExecution { .. } => FailureKind::JobExecution,
            TestFailure::PollTimeout { .. } => FailureKind::PollTimeout,
            TestFailure::Transport { .. } => FailureKind::Transport,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TestFailure::Preflight { message }
            | TestFailure::Submission { message }
            | TestFailure::JobExecution { message, .. }
            | TestFailure::PollTimeout { message, .. }
            | TestFailure::Transport { message } => message,
        }
    }

    /// Only failures of an existing job can be traced.
    pub fn trace_uri(&self) -> Option<&str> {
        match self {
            TestFailure::JobExecution { trace_uri, .. }
            | TestFailure::PollTimeout { trace_uri, .. } => Some(trace_uri),
            _ => None,
        }
    }
}

/// Tag of a `TestFailure`, for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Preflight,
    Submission,
    JobExecution,
    PollTimeout,
    Transport,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Preflight => "preflight",
            FailureKind::Submission => "submission",
            FailureKind::JobExecution => "job_execution",
            FailureKind::PollTimeout => "poll_timeout",
            FailureKind::Transport => "transport",
        };
        f.write_str(name)
    }
}

/// Final, immutable record of one executed test case.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub preset_name: String,
    pub asset_name: String,
    pub job: JobRun,
    pub result: Result<(), TestFailure>,
    /// Human-readable steps, oldest first.
    pub log: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TestOutcome {
    /// Outcome for a test case that panicked before it could report.
    pub fn aborted(
        preset_name: impl Into<String>,
        asset_name: impl Into<String>,
        started_at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Self {
        let message = reason.into();
        Self {
            preset_name: preset_name.into(),
            asset_name: asset_name.into(),
            job: JobRun::new(),
            log: vec![message.clone()],
            result: Err(TestFailure::Transport { message }),
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// True iff the job finished Complete with result Pass.
    pub fn completed(&self) -> bool {
        self.result.is_ok()
    }

    pub fn failure(&self) -> Option<&TestFailure> {
        self.result.as_ref().err()
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.failure().map(TestFailure::kind)
    }

    /// Empty on success.
    pub fn error_message(&self) -> &str {
        self.failure().map(TestFailure::message).unwrap_or("")
    }

    /// Empty unless the failure happened after the job was created.
    pub fn error_trace_uri(&self) -> &str {
        self.failure().and_then(TestFailure::trace_uri).unwrap_or("")
    }

    pub fn duration_ms(&self) -> u64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .try_into()
            .unwrap_or(0)
    }
}
