//! Drives one (preset, asset) job through pre-checks, submission and polling.

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError, TestEntry};
use crate::service::{CreateJobRequest, RemoteService, ServiceError};

use super::job_run::JobRun;
use super::policy::PollPolicy;
use super::types::{TestFailure, TestOutcome};

/// First line of a remote error text, which is all a report shows.
pub fn curate_error(raw: &str) -> &str {
    raw.split('\n').next().unwrap_or("").trim_end_matches('\r')
}

/// One configured preset run.
///
/// Names are validated at construction. `run` consumes the case, so each one
/// executes at most once.
#[derive(Debug, Clone)]
pub struct TestCase {
    preset_name: String,
    asset_name: String,
    dynamic_parameters: Map<String, Value>,
    enabled: bool,
}

impl TestCase {
    /// Create an enabled test case with no dynamic parameters.
    pub fn new(
        preset_name: impl Into<String>,
        asset_name: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let preset_name = preset_name.into();
        let asset_name = asset_name.into();

        if preset_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Must specify a test preset name".to_string(),
            ));
        }
        if asset_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Must specify an asset to run preset '{}' on",
                preset_name
            )));
        }

        Ok(Self {
            preset_name,
            asset_name,
            dynamic_parameters: Map::new(),
            enabled: true,
        })
    }

    /// Build from a config entry, falling back to `default_asset`.
    pub fn from_entry(entry: &TestEntry, default_asset: Option<&str>) -> Result<Self, ConfigError> {
        let asset = entry
            .asset
            .as_deref()
            .filter(|a| !a.is_empty())
            .or(default_asset)
            .unwrap_or_default();

        Ok(Self::new(entry.name.as_str(), asset)?
            .with_dynamic_parameters(entry.dynamic_preset_data.clone().unwrap_or_default())
            .with_enabled(entry.enabled))
    }

    /// Build every configured test, in config order.
    pub fn from_config(config: &Config) -> Result<Vec<Self>, ConfigError> {
        config
            .tests
            .iter()
            .map(|entry| Self::from_entry(entry, config.default_test_asset.as_deref()))
            .collect()
    }

    pub fn with_dynamic_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.dynamic_parameters = parameters;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn preset_name(&self) -> &str {
        &self.preset_name
    }

    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }

    pub fn dynamic_parameters(&self) -> &Map<String, Value> {
        &self.dynamic_parameters
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn describe(&self) -> String {
        format!("PRESET: '{}' ASSET: '{}'", self.preset_name, self.asset_name)
    }

    /// Execute the test against `service`.
    ///
    /// Never fails: every error ends up in the returned outcome.
    pub async fn run(self, service: &dyn RemoteService, policy: &PollPolicy) -> TestOutcome {
        let started_at = Utc::now();
        info!("START: {} via {}", self.describe(), service.name());

        let mut progress = Progress::default();
        let result = self.execute(service, policy, &mut progress).await;

        match &result {
            Ok(()) => info!("PASS: {}", self.describe()),
            Err(failure) => warn!(
                "FAIL: {} [{}] {}",
                self.describe(),
                failure.kind(),
                failure
            ),
        }

        TestOutcome {
            preset_name: self.preset_name,
            asset_name: self.asset_name,
            job: progress.job,
            result,
            log: progress.log,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn execute(
        &self,
        service: &dyn RemoteService,
        policy: &PollPolicy,
        progress: &mut Progress,
    ) -> Result<(), TestFailure> {
        self.preflight(service, progress).await?;
        self.submit(service, progress).await?;
        self.follow(service, policy, progress).await?;
        self.evaluate(service, policy, progress).await
    }

    /// Asset and preset must exist before anything is submitted.
    async fn preflight(
        &self,
        service: &dyn RemoteService,
        progress: &mut Progress,
    ) -> Result<(), TestFailure> {
        let env = service.endpoint();

        let asset_found = service
            .asset_exists(&self.asset_name)
            .await
            .map_err(|e| {
                classify(e, |e| TestFailure::Preflight {
                    message: format!(
                        "Looking up test asset {} in env {} failed: {}",
                        self.asset_name, env, e
                    ),
                })
            })?;
        if !asset_found {
            return Err(TestFailure::Preflight {
                message: format!(
                    "The test asset {} was not found in env {}",
                    self.asset_name, env
                ),
            });
        }

        let preset_found = service
            .preset_exists(&self.preset_name)
            .await
            .map_err(|e| {
                classify(e, |e| TestFailure::Preflight {
                    message: format!(
                        "Looking up test preset {} in env {} failed: {}",
                        self.preset_name, env, e
                    ),
                })
            })?;
        if !preset_found {
            return Err(TestFailure::Preflight {
                message: format!(
                    "The test preset {} was not found in env {}",
                    self.preset_name, env
                ),
            });
        }

        progress.note(format!(
            "Pre-test: found asset '{}' and preset '{}' in env {}",
            self.asset_name, self.preset_name, env
        ));
        Ok(())
    }

    async fn submit(
        &self,
        service: &dyn RemoteService,
        progress: &mut Progress,
    ) -> Result<(), TestFailure> {
        let request = CreateJobRequest {
            preset_name: self.preset_name.clone(),
            asset_name: self.asset_name.clone(),
            dynamic_preset_data: self.dynamic_parameters.clone(),
        };

        let snapshot = service.create_job(&request).await.map_err(|e| {
            classify(e, |e| TestFailure::Submission {
                message: format!("Failed creating job for test {}: {}", self.preset_name, e),
            })
        })?;

        progress
            .job
            .record_created(&snapshot)
            .map_err(|e| TestFailure::Transport {
                message: e.to_string(),
            })?;
        progress.note(format!(
            "Created job {} ({})",
            snapshot.id,
            progress.job.describe_state()
        ));
        Ok(())
    }

    /// Poll until terminal or out of attempts. Running out is not an error
    /// here; `evaluate` judges whatever was last seen.
    async fn follow(
        &self,
        service: &dyn RemoteService,
        policy: &PollPolicy,
        progress: &mut Progress,
    ) -> Result<(), TestFailure> {
        let job_id = progress.job_id()?;
        debug!(
            "Following job {} for up to {} lookups ({:?})",
            job_id,
            policy.max_attempts,
            policy.total_budget()
        );

        while !progress.job.is_terminal() && progress.job.poll_attempts() < policy.max_attempts {
            let delay = policy.delay_before(progress.job.poll_attempts());
            tokio::time::sleep(delay).await;
            progress.job.record_poll_attempt();
            let attempt = progress.job.poll_attempts();

            match service.get_job(&job_id).await {
                Ok(snapshot) => {
                    let changed = progress
                        .job
                        .observe(&snapshot)
                        .map_err(|e| TestFailure::Transport {
                            message: e.to_string(),
                        })?;
                    if changed {
                        progress.note(format!(
                            "Lookup {}: job {} now {}",
                            attempt,
                            job_id,
                            progress.job.describe_state()
                        ));
                    } else {
                        debug!(
                            "Lookup {}: job {} unchanged ({})",
                            attempt,
                            job_id,
                            progress.job.describe_state()
                        );
                    }
                }
                Err(e) if e.is_transport() => {
                    return Err(TestFailure::Transport {
                        message: format!("Polling job {} failed: {}", job_id, e),
                    });
                }
                Err(e) => {
                    warn!("Lookup {} for job {} failed: {}", attempt, job_id, e);
                    progress.note(format!("Lookup {}: failed: {}", attempt, e));
                }
            }
        }
        Ok(())
    }

    async fn evaluate(
        &self,
        service: &dyn RemoteService,
        policy: &PollPolicy,
        progress: &mut Progress,
    ) -> Result<(), TestFailure> {
        if progress.job.is_passed() {
            progress.note("Job passed".to_string());
            return Ok(());
        }

        let job_id = progress.job_id()?;
        let trace_uri = format!("{}/jobs/{}/artifacts/error", service.endpoint(), job_id);
        let timed_out = !progress.job.is_terminal();

        let fallback = if timed_out {
            format!(
                "Job {} still {} after {} lookups",
                job_id,
                progress.job.describe_state(),
                policy.max_attempts
            )
        } else {
            format!("Job {} ended with {}", job_id, progress.job.describe_state())
        };

        let message = match service.get_job_error(&job_id).await {
            Ok(raw) => {
                let headline = curate_error(&raw);
                if headline.trim().is_empty() {
                    fallback
                } else {
                    headline.to_string()
                }
            }
            Err(e) => {
                warn!("Could not fetch error artifact for job {}: {}", job_id, e);
                format!("{} (error artifact unavailable: {})", fallback, e)
            }
        };

        progress.note(format!("Job failed: {}", message));

        if timed_out {
            Err(TestFailure::PollTimeout {
                message,
                trace_uri,
                attempts: progress.job.poll_attempts(),
            })
        } else {
            Err(TestFailure::JobExecution { message, trace_uri })
        }
    }
}

/// Transport errors keep their own kind; everything else is a failure of
/// the phase that saw it.
fn classify(error: ServiceError, phase: impl FnOnce(ServiceError) -> TestFailure) -> TestFailure {
    if error.is_transport() {
        TestFailure::Transport {
            message: error.to_string(),
        }
    } else {
        phase(error)
    }
}

/// Mutable state owned by a running test case.
#[derive(Debug, Default)]
struct Progress {
    job: JobRun,
    log: Vec<String>,
}

impl Progress {
    fn note(&mut self, message: String) {
        debug!("{}", message);
        self.log.push(message);
    }

    fn job_id(&self) -> Result<String, TestFailure> {
        self.job
            .job_id()
            .map(str::to_owned)
            .ok_or_else(|| TestFailure::Transport {
                message: "No job ID was attached to this test, but the job was created."
                    .to_string(),
            })
    }
}
