pub mod config;
pub mod harness;
pub mod orchestrator;
pub mod service;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use harness::{FailureKind, PollPolicy, TestCase, TestFailure, TestOutcome};
pub use orchestrator::{
    AggregateReport, FailureRecord, Orchestrator, OrchestratorConfig, OrchestratorError,
    ProgressCallback,
};
pub use service::{HttpServiceClient, RemoteService, ServiceError};
