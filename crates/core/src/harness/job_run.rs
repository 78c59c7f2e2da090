//! State of one submitted job as observed by its owning test case.

use serde::Serialize;
use thiserror::Error;

use crate::service::{JobResult, JobSnapshot, JobStatus};

/// Invalid transitions on a `JobRun`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobRunError {
    #[error("job already created with id {0}")]
    AlreadyCreated(String),

    #[error("job has not been created")]
    NotCreated,

    #[error("snapshot for job {actual} applied to job {expected}")]
    JobIdMismatch { expected: String, actual: String },
}

/// One job's life from creation to a terminal state.
///
/// Transitions only happen through `record_created` and `observe`, both fed
/// with snapshots from the remote service. Nothing is inferred locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobRun {
    job_id: Option<String>,
    status: JobStatus,
    result: Option<JobResult>,
    poll_attempts: u32,
}

impl JobRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id assigned by the service; `None` means creation never succeeded.
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result(&self) -> Option<JobResult> {
        self.result
    }

    pub fn poll_attempts(&self) -> u32 {
        self.poll_attempts
    }

    pub fn is_submitted(&self) -> bool {
        self.job_id.is_some()
    }

    /// Record the creation response. The id can only be set once.
    pub fn record_created(&mut self, snapshot: &JobSnapshot) -> Result<(), JobRunError> {
        if let Some(existing) = &self.job_id {
            return Err(JobRunError::AlreadyCreated(existing.clone()));
        }
        self.job_id = Some(snapshot.id.clone());
        self.status = snapshot.status;
        self.result = snapshot.result;
        Ok(())
    }

    /// Count one status lookup, successful or not.
    pub fn record_poll_attempt(&mut self) {
        self.poll_attempts += 1;
    }

    /// Apply a polled snapshot.
    ///
    /// Returns whether the visible state changed. Once terminal, later
    /// snapshots are ignored.
    pub fn observe(&mut self, snapshot: &JobSnapshot) -> Result<bool, JobRunError> {
        let Some(job_id) = &self.job_id else {
            return Err(JobRunError::NotCreated);
        };
        if *job_id != snapshot.id {
            return Err(JobRunError::JobIdMismatch {
                expected: job_id.clone(),
                actual: snapshot.id.clone(),
            });
        }
        if self.is_terminal() {
            return Ok(false);
        }

        let changed = self.status != snapshot.status || self.result != snapshot.result;
        self.status = snapshot.status;
        self.result = snapshot.result;
        Ok(changed)
    }

    /// No further polling is useful.
    ///
    /// `Complete` and `Error` are final statuses. `Cancelled` and `Retried`
    /// jobs are recognised by carrying a result. `Hold` and `Active` have
    /// no result and keep being polled.
    pub fn is_terminal(&self) -> bool {
        self.status.is_final() || self.result.is_some()
    }

    /// The only passing combination.
    pub fn is_passed(&self) -> bool {
        self.status == JobStatus::Complete && self.result == Some(JobResult::Pass)
    }

    /// "status Complete, result Pass" style summary for messages.
    pub fn describe_state(&self) -> String {
        match self.result {
            Some(result) => format!("status {}, result {}", self.status, result),
            None => format!("status {}, no result", self.status),
        }
    }
}
