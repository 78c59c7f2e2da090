//! Mock remote service for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::service::{
    CreateJobRequest, JobResult, JobSnapshot, JobStatus, RemoteService, ServiceError,
};

const MOCK_ENDPOINT: &str = "https://mock.example.com/api/v2";

/// A call made against the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    AssetExists(String),
    PresetExists(String),
    CreateJob(CreateJobRequest),
    GetJob(String),
    GetJobError(String),
}

/// Operation targeted by `set_next_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOperation {
    AssetExists,
    PresetExists,
    CreateJob,
    GetJob,
    GetJobError,
}

/// Scripted life of every job created for one preset.
///
/// The creation response carries the initial state. Each lookup returns the
/// next scripted state; the last one repeats forever. With no scripted
/// lookups the initial state repeats.
#[derive(Debug, Clone)]
pub struct JobScript {
    initial: (JobStatus, Option<JobResult>),
    polls: Vec<(JobStatus, Option<JobResult>)>,
    error_text: String,
}

impl JobScript {
    pub fn new(initial_status: JobStatus) -> Self {
        Self {
            initial: (initial_status, None),
            polls: Vec::new(),
            error_text: String::new(),
        }
    }

    /// Queued, then Complete/Pass on the first lookup.
    pub fn passing() -> Self {
        Self::new(JobStatus::Queued).then(JobStatus::Complete, Some(JobResult::Pass))
    }

    /// Queued, then Error/Error with `error_text` on the first lookup.
    pub fn failing(error_text: impl Into<String>) -> Self {
        Self::new(JobStatus::Queued)
            .then(JobStatus::Error, Some(JobResult::Error))
            .with_error_text(error_text)
    }

    pub fn then(mut self, status: JobStatus, result: Option<JobResult>) -> Self {
        self.polls.push((status, result));
        self
    }

    pub fn with_initial_result(mut self, result: Option<JobResult>) -> Self {
        self.initial.1 = result;
        self
    }

    /// Text served by the error artifact endpoint.
    pub fn with_error_text(mut self, text: impl Into<String>) -> Self {
        self.error_text = text.into();
        self
    }

    fn state_after(&self, lookups: usize) -> (JobStatus, Option<JobResult>) {
        if lookups == 0 {
            return self.initial;
        }
        self.polls
            .get(lookups - 1)
            .or(self.polls.last())
            .copied()
            .unwrap_or(self.initial)
    }
}

impl Default for JobScript {
    fn default() -> Self {
        Self::passing()
    }
}

#[derive(Debug, Clone)]
struct MockJob {
    preset_name: String,
    lookups: usize,
}

/// Mock implementation of the RemoteService trait.
///
/// Provides controllable behavior for testing:
/// - Register assets and presets for the pre-test lookups
/// - Script job state sequences per preset
/// - Inject one-shot errors per operation
/// - Observe how many calls were in flight at once
///
/// # Example
///
/// ```rust,ignore
/// let service = MockRemoteService::new();
/// service.add_asset("test_movie_1").await;
/// service.add_preset("QC Profile A").await;
/// service
///     .script_preset("QC Profile A", JobScript::failing("Timeout on step 3"))
///     .await;
///
/// let outcome = case.run(&service, &PollPolicy::default()).await;
/// assert_eq!(service.create_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockRemoteService {
    assets: Arc<RwLock<HashSet<String>>>,
    presets: Arc<RwLock<HashSet<String>>>,
    scripts: Arc<RwLock<HashMap<String, JobScript>>>,
    jobs: Arc<RwLock<HashMap<String, MockJob>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
    next_errors: Arc<RwLock<HashMap<MockOperation, ServiceError>>>,
    /// Presets whose job creation panics, for worker containment tests.
    panicking_presets: Arc<RwLock<HashSet<String>>>,
    latency: Arc<RwLock<Duration>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockRemoteService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemoteService {
    /// Create an empty mock service with no latency.
    pub fn new() -> Self {
        Self {
            assets: Arc::new(RwLock::new(HashSet::new())),
            presets: Arc::new(RwLock::new(HashSet::new())),
            scripts: Arc::new(RwLock::new(HashMap::new())),
            jobs: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_errors: Arc::new(RwLock::new(HashMap::new())),
            panicking_presets: Arc::new(RwLock::new(HashSet::new())),
            latency: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn add_asset(&self, name: impl Into<String>) {
        self.assets.write().await.insert(name.into());
    }

    pub async fn add_preset(&self, name: impl Into<String>) {
        self.presets.write().await.insert(name.into());
    }

    /// Register a preset together with the script its jobs follow.
    pub async fn script_preset(&self, name: impl Into<String>, script: JobScript) {
        let name = name.into();
        self.presets.write().await.insert(name.clone());
        self.scripts.write().await.insert(name, script);
    }

    /// Make `create_job` panic for this preset.
    pub async fn panic_on_preset(&self, name: impl Into<String>) {
        self.panicking_presets.write().await.insert(name.into());
    }

    /// Delay applied to every call.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    /// Configure the next call of `operation` to fail with the given error.
    pub async fn set_next_error(&self, operation: MockOperation, error: ServiceError) {
        self.next_errors.write().await.insert(operation, error);
    }

    /// All calls so far, including failed ones.
    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    pub async fn create_count(&self) -> usize {
        self.count_calls(|call| matches!(call, RecordedCall::CreateJob(_)))
            .await
    }

    pub async fn poll_count(&self) -> usize {
        self.count_calls(|call| matches!(call, RecordedCall::GetJob(_)))
            .await
    }

    /// Job ids whose error artifact was requested.
    pub async fn error_lookups(&self) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                RecordedCall::GetJobError(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Highest number of concurrent calls observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn count_calls(&self, predicate: impl Fn(&RecordedCall) -> bool) -> usize {
        self.calls.read().await.iter().filter(|c| predicate(c)).count()
    }

    /// Record the call, simulate latency and take any injected error.
    async fn enter(
        &self,
        operation: MockOperation,
        call: RecordedCall,
    ) -> Result<InFlight, ServiceError> {
        let guard = InFlight::new(&self.in_flight, &self.max_in_flight);
        self.calls.write().await.push(call);

        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match self.next_errors.write().await.remove(&operation) {
            Some(err) => Err(err),
            None => Ok(guard),
        }
    }

    async fn script_for(&self, preset_name: &str) -> JobScript {
        self.scripts
            .read()
            .await
            .get(preset_name)
            .cloned()
            .unwrap_or_default()
    }
}

/// Counts a call as in flight until dropped, unwinding included.
struct InFlight {
    counter: Arc<AtomicUsize>,
}

impl InFlight {
    fn new(counter: &Arc<AtomicUsize>, max: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        max.fetch_max(now, Ordering::SeqCst);
        Self {
            counter: Arc::clone(counter),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteService for MockRemoteService {
    fn name(&self) -> &str {
        "mock"
    }

    fn endpoint(&self) -> &str {
        MOCK_ENDPOINT
    }

    async fn asset_exists(&self, name: &str) -> Result<bool, ServiceError> {
        let _guard = self
            .enter(
                MockOperation::AssetExists,
                RecordedCall::AssetExists(name.to_string()),
            )
            .await?;
        Ok(self.assets.read().await.contains(name))
    }

    async fn preset_exists(&self, name: &str) -> Result<bool, ServiceError> {
        let _guard = self
            .enter(
                MockOperation::PresetExists,
                RecordedCall::PresetExists(name.to_string()),
            )
            .await?;
        Ok(self.presets.read().await.contains(name))
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobSnapshot, ServiceError> {
        let _guard = self
            .enter(
                MockOperation::CreateJob,
                RecordedCall::CreateJob(request.clone()),
            )
            .await?;

        if self
            .panicking_presets
            .read()
            .await
            .contains(&request.preset_name)
        {
            panic!("mock service crashed creating {}", request.preset_name);
        }

        let script = self.script_for(&request.preset_name).await;
        let id = Uuid::new_v4().to_string();
        self.jobs.write().await.insert(
            id.clone(),
            MockJob {
                preset_name: request.preset_name.clone(),
                lookups: 0,
            },
        );

        let (status, result) = script.state_after(0);
        Ok(JobSnapshot::new(id, status, result))
    }

    async fn get_job(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        let _guard = self
            .enter(MockOperation::GetJob, RecordedCall::GetJob(job_id.to_string()))
            .await?;

        let (preset_name, lookups) = {
            let mut jobs = self.jobs.write().await;
            let job = jobs.get_mut(job_id).ok_or_else(|| ServiceError::ApiError {
                status: 404,
                message: format!("job {} not found", job_id),
            })?;
            job.lookups += 1;
            (job.preset_name.clone(), job.lookups)
        };

        let (status, result) = self.script_for(&preset_name).await.state_after(lookups);
        Ok(JobSnapshot::new(job_id, status, result))
    }

    async fn get_job_error(&self, job_id: &str) -> Result<String, ServiceError> {
        let _guard = self
            .enter(
                MockOperation::GetJobError,
                RecordedCall::GetJobError(job_id.to_string()),
            )
            .await?;

        let preset_name = self
            .jobs
            .read()
            .await
            .get(job_id)
            .map(|job| job.preset_name.clone())
            .ok_or_else(|| ServiceError::ApiError {
                status: 404,
                message: format!("job {} not found", job_id),
            })?;

        Ok(self.script_for(&preset_name).await.error_text)
    }
}
