//! Test orchestrator implementation.
//!
//! A fixed pool of workers drains a shared queue of test cases. Outcomes
//! flow back over a channel to the caller's task, which is the only place
//! the report is mutated.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::harness::{PollPolicy, TestCase, TestOutcome};
use crate::service::RemoteService;

use super::config::OrchestratorConfig;
use super::types::{AggregateReport, OrchestratorError};

/// Called once per finished test case, in completion order.
pub type ProgressCallback = Arc<dyn Fn(&TestOutcome) + Send + Sync>;

type WorkQueue = Arc<Mutex<VecDeque<TestCase>>>;

/// Runs test cases with bounded concurrency against one shared service.
pub struct Orchestrator {
    config: OrchestratorConfig,
    service: Arc<dyn RemoteService>,
    policy: PollPolicy,
    on_progress: Option<ProgressCallback>,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        service: Arc<dyn RemoteService>,
        policy: PollPolicy,
    ) -> Result<Self, OrchestratorError> {
        if config.max_workers == 0 {
            return Err(OrchestratorError::NoWorkers);
        }
        Ok(Self {
            config,
            service,
            policy,
            on_progress: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    /// Execute every enabled case and aggregate the outcomes.
    ///
    /// Never fails. A panicking test case is reported as a failure of that
    /// test and its worker moves on to the next case.
    pub async fn run(&self, cases: Vec<TestCase>) -> AggregateReport {
        let started = Instant::now();
        let mut report = AggregateReport::default();

        let (enabled, disabled): (Vec<TestCase>, Vec<TestCase>) =
            cases.into_iter().partition(TestCase::enabled);
        for case in &disabled {
            info!("Skipping {}, not enabled", case.preset_name());
        }
        report.skipped = disabled.len();

        if enabled.is_empty() {
            info!("No enabled tests to run");
            report.duration_ms = elapsed_ms(started);
            return report;
        }

        let dispatched = enabled.len();
        let worker_count = self.config.max_workers.min(enabled.len());
        info!(
            "Running {} tests with {} workers ({} skipped)",
            enabled.len(),
            worker_count,
            report.skipped
        );

        let queue: WorkQueue = Arc::new(Mutex::new(enabled.into_iter().collect()));
        let (tx, mut rx) = mpsc::channel::<TestOutcome>(worker_count);

        let workers: Vec<JoinHandle<()>> = (0..worker_count)
            .map(|worker_id| self.spawn_worker(worker_id, Arc::clone(&queue), tx.clone()))
            .collect();
        drop(tx);

        while let Some(outcome) = rx.recv().await {
            report.record(&outcome);
            if let Some(callback) = &self.on_progress {
                callback(&outcome);
            }
        }

        for (worker_id, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!("Worker {} ended abnormally: {}", worker_id, e);
            }
        }

        // Panics are caught per case, so every dispatched case reports once.
        debug_assert_eq!(report.total, dispatched);

        report.duration_ms = elapsed_ms(started);
        info!(
            "Run finished: {} passed, {} failed, {} skipped in {}ms",
            report.passed,
            report.failed(),
            report.skipped,
            report.duration_ms
        );
        report
    }

    /// Spawn one worker task.
    fn spawn_worker(
        &self,
        worker_id: usize,
        queue: WorkQueue,
        tx: mpsc::Sender<TestOutcome>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let policy = self.policy.clone();

        tokio::spawn(async move {
            debug!("Worker {} started", worker_id);
            loop {
                let next = queue.lock().await.pop_front();
                let Some(case) = next else {
                    break;
                };

                let preset_name = case.preset_name().to_string();
                let asset_name = case.asset_name().to_string();
                let started_at = Utc::now();

                let outcome = match AssertUnwindSafe(case.run(service.as_ref(), &policy))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(payload) => {
                        let reason = panic_message(payload.as_ref());
                        error!(
                            "Worker {} panicked running preset {}: {}",
                            worker_id, preset_name, reason
                        );
                        TestOutcome::aborted(
                            preset_name,
                            asset_name,
                            started_at,
                            format!("Test case panicked: {}", reason),
                        )
                    }
                };

                if tx.send(outcome).await.is_err() {
                    break;
                }
            }
            debug!("Worker {} stopped", worker_id);
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}
