//! Types for the test orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::harness::{FailureKind, TestOutcome};

/// Errors that can occur while setting up a run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A run needs at least one worker.
    #[error("max_workers must be at least 1")]
    NoWorkers,
}

/// One failed test in the aggregate report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Preset name.
    pub name: String,
    pub asset: String,
    /// First line of the remote error, or a local diagnosis.
    pub error: String,
    /// Error artifact URI; empty when no job was created.
    pub trace: String,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Wall time of the test case.
    #[serde(default)]
    pub duration_ms: u64,
    /// Diagnostic steps of the test case, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub log: Vec<String>,
}

impl FailureRecord {
    /// `None` when the outcome passed.
    pub fn from_outcome(outcome: &TestOutcome) -> Option<Self> {
        let failure = outcome.failure()?;
        Some(Self {
            name: outcome.preset_name.clone(),
            asset: outcome.asset_name.clone(),
            error: failure.message().to_string(),
            trace: failure.trace_uri().unwrap_or_default().to_string(),
            kind: failure.kind(),
            job_id: outcome.job.job_id().map(str::to_owned),
            duration_ms: outcome.duration_ms(),
            log: outcome.log.clone(),
        })
    }
}

/// Counts and failure details for one run.
///
/// `passed + failures.len() == total`, where `total` counts dispatched
/// tests only. Skipped tests are counted separately.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub total: usize,
    pub passed: usize,
    pub skipped: usize,
    /// In completion order, which varies between runs.
    pub failures: Vec<FailureRecord>,
    pub duration_ms: u64,
}

impl AggregateReport {
    /// Account for one finished test case.
    pub fn record(&mut self, outcome: &TestOutcome) {
        self.total += 1;
        match FailureRecord::from_outcome(outcome) {
            Some(record) => self.failures.push(record),
            None => self.passed += 1,
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// True when every dispatched test passed. An empty run succeeds.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Process exit status for this report.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn failed_outcome() -> TestOutcome {
        TestOutcome::aborted("QC Profile A", "test_movie_1", Utc::now(), "worker died")
    }

    #[test]
    fn test_empty_report_succeeds() {
        let report = AggregateReport::default();
        assert!(report.is_success());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.total, 0);
    }

    #[test]
    fn test_record_failure() {
        let mut report = AggregateReport::default();
        report.record(&failed_outcome());

        assert_eq!(report.total, 1);
        assert_eq!(report.passed, 0);
        assert_eq!(report.failed(), 1);
        assert!(!report.is_success());
        assert_eq!(report.exit_code(), 1);

        let record = &report.failures[0];
        assert_eq!(record.name, "QC Profile A");
        assert_eq!(record.asset, "test_movie_1");
        assert_eq!(record.error, "worker died");
        assert_eq!(record.trace, "");
        assert_eq!(record.kind, FailureKind::Transport);
        assert!(record.job_id.is_none());
    }

    #[test]
    fn test_record_carries_duration() {
        let started = Utc::now() - chrono::Duration::milliseconds(1500);
        let outcome = TestOutcome::aborted("QC Profile A", "test_movie_1", started, "slow");
        let record = FailureRecord::from_outcome(&outcome).unwrap();
        assert_eq!(record.duration_ms, outcome.duration_ms());
        assert!(record.duration_ms >= 1500);
    }

    #[test]
    fn test_failure_record_serialization() {
        let record = FailureRecord::from_outcome(&failed_outcome()).unwrap();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["name"], "QC Profile A");
        assert_eq!(json["kind"], "transport");
        assert_eq!(json["trace"], "");
        assert!(json.get("job_id").is_none());

        let parsed: FailureRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            OrchestratorError::NoWorkers.to_string(),
            "max_workers must be at least 1"
        );
    }
}
