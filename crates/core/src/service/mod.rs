//! Remote media platform boundary.
//!
//! The harness only ever talks to the platform through the `RemoteService`
//! trait. `HttpServiceClient` is the production implementation; tests use
//! `testing::MockRemoteService`.

mod http;
mod types;

pub use http::HttpServiceClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the remote service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP request failed (connection, timeout, TLS...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status code.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// The payload decoded but lacks a field the harness relies on.
    #[error("Response is missing {0}")]
    MissingField(String),

    /// The payload could not be decoded.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Client not configured (missing hostname, API key...).
    #[error("Client not configured: {0}")]
    NotConfigured(String),
}

impl ServiceError {
    /// Whether the error happened below the API contract (network or an
    /// undecodable body) rather than as a well-formed "no" from the service.
    pub fn is_transport(&self) -> bool {
        matches!(self, ServiceError::Http(_) | ServiceError::ParseError(_))
    }
}

/// Request/response operations the harness needs from the platform.
///
/// Implementations are shared read-only across all workers.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Base URL of the API; trace URIs are composed from it.
    fn endpoint(&self) -> &str;

    /// Whether an asset with this exact name is registered.
    async fn asset_exists(&self, name: &str) -> Result<bool, ServiceError>;

    /// Whether a preset with this exact name is registered.
    async fn preset_exists(&self, name: &str) -> Result<bool, ServiceError>;

    /// Submit a job. The returned snapshot always carries a job id.
    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobSnapshot, ServiceError>;

    /// Current status/result of a job.
    async fn get_job(&self, job_id: &str) -> Result<JobSnapshot, ServiceError>;

    /// Raw, possibly multi-line, error text for a failed job.
    async fn get_job_error(&self, job_id: &str) -> Result<String, ServiceError>;
}
