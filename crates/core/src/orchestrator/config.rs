//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the test orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of test cases executing at once (K).
    /// Each worker runs one test case to completion before taking the next.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

fn default_max_workers() -> usize {
    5
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_workers(max_workers: usize) -> Self {
        Self { max_workers }
    }
}
