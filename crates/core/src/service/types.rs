//! Typed records exchanged with the remote service.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Job status as reported by the platform.
///
/// `Unsubmitted` is local only: a job run that was never created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Unsubmitted,
    Queued,
    Active,
    Hold,
    Complete,
    Error,
    Cancelled,
    Retried,
    #[serde(other)]
    Unknown,
}

impl JobStatus {
    /// Statuses the platform never leaves once reached.
    pub fn is_final(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Unsubmitted => "Unsubmitted",
            JobStatus::Queued => "Queued",
            JobStatus::Active => "Active",
            JobStatus::Hold => "Hold",
            JobStatus::Complete => "Complete",
            JobStatus::Error => "Error",
            JobStatus::Cancelled => "Cancelled",
            JobStatus::Retried => "Retried",
            JobStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job result; absent (`None`) while the job is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobResult {
    Pass,
    Error,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobResult::Pass => f.write_str("Pass"),
            JobResult::Error => f.write_str("Error"),
            JobResult::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
    pub result: Option<JobResult>,
}

impl JobSnapshot {
    pub fn new(id: impl Into<String>, status: JobStatus, result: Option<JobResult>) -> Self {
        Self {
            id: id.into(),
            status,
            result,
        }
    }
}

/// A (preset, asset, dynamic parameters) triple to submit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub preset_name: String,
    pub asset_name: String,
    #[serde(default)]
    pub dynamic_preset_data: Map<String, Value>,
}

impl CreateJobRequest {
    /// JSON:API document for `POST /jobs`.
    pub fn to_payload(&self) -> Value {
        json!({
            "data": {
                "type": "jobs",
                "attributes": {
                    "dynamicPresetData": self.dynamic_preset_data,
                },
                "relationships": {
                    "asset": {
                        "data": {
                            "type": "assets",
                            "attributes": { "name": self.asset_name },
                        }
                    },
                    "preset": {
                        "data": {
                            "type": "presets",
                            "attributes": { "name": self.preset_name },
                        }
                    }
                }
            }
        })
    }
}
