//! reqwest-backed client for the platform's v2 JSON:API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::ServiceConfig;

use super::types::{CreateJobRequest, JobResult, JobSnapshot, JobStatus};
use super::{RemoteService, ServiceError};

const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// HTTP implementation of `RemoteService`.
///
/// Holds only immutable settings, so one instance is shared by every worker.
pub struct HttpServiceClient {
    client: Client,
    endpoint: String,
}

impl HttpServiceClient {
    /// Create a new client from the `[service]` section.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        if config.hostname.is_empty() {
            return Err(ServiceError::NotConfigured(
                "hostname is required, like yourcompany-uat.example.com (without https://)"
                    .to_string(),
            ));
        }
        if config.api_key.is_empty() {
            return Err(ServiceError::NotConfigured(
                "API key is required".to_string(),
            ));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| ServiceError::NotConfigured(format!("invalid API key: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_API_CONTENT_TYPE));
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Turn a non-success response into `ApiError`, keeping the body as message.
    async fn ensure_success(response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ServiceError::ApiError {
            status: status.as_u16(),
            message: body,
        })
    }

    /// `GET <collection>?filter=name=<name>` and report whether anything matched.
    async fn lookup_by_name(&self, collection: &str, name: &str) -> Result<bool, ServiceError> {
        let url = self.url(collection);

        debug!("Looking up {} named '{}'", collection, name);

        let response = self
            .client
            .get(&url)
            .query(&[("filter", format!("name={}", name))])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let response = Self::ensure_success(response).await?;

        let lookup: ApiDocument<Value> = response.json().await.map_err(|e| {
            ServiceError::ParseError(format!("Failed to parse {} lookup: {}", collection, e))
        })?;

        Ok(lookup.data.as_ref().is_some_and(has_matches))
    }
}

#[async_trait]
impl RemoteService for HttpServiceClient {
    fn name(&self) -> &str {
        "http"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn asset_exists(&self, name: &str) -> Result<bool, ServiceError> {
        self.lookup_by_name("/assets", name).await
    }

    async fn preset_exists(&self, name: &str) -> Result<bool, ServiceError> {
        self.lookup_by_name("/presets", name).await
    }

    async fn create_job(&self, request: &CreateJobRequest) -> Result<JobSnapshot, ServiceError> {
        let url = self.url("/jobs");

        debug!(
            "Creating job: preset='{}', asset='{}'",
            request.preset_name, request.asset_name
        );

        let response = self
            .client
            .post(&url)
            .json(&request.to_payload())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let document: ApiDocument<JobResource> = response.json().await.map_err(|e| {
            ServiceError::ParseError(format!("Failed to parse job creation response: {}", e))
        })?;

        document.into_snapshot()
    }

    async fn get_job(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        let url = self.url(&format!("/jobs/{}", job_id));

        debug!("Getting job: id={}", job_id);

        let response = Self::ensure_success(self.client.get(&url).send().await?).await?;

        let document: ApiDocument<JobResource> = response.json().await.map_err(|e| {
            ServiceError::ParseError(format!("Failed to parse job response: {}", e))
        })?;

        document.into_snapshot()
    }

    async fn get_job_error(&self, job_id: &str) -> Result<String, ServiceError> {
        let url = self.url(&format!("/jobs/{}/artifacts/error", job_id));

        debug!("Getting job error artifact: id={}", job_id);

        let response = Self::ensure_success(self.client.get(&url).send().await?).await?;

        response
            .text()
            .await
            .map_err(|e| ServiceError::ParseError(format!("Failed to read error artifact: {}", e)))
    }
}

/// A filter lookup matched if `data` holds at least one resource.
fn has_matches(data: &Value) -> bool {
    match data {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
        _ => true,
    }
}

// ============================================================================
// API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiDocument<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct JobResource {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    attributes: Option<JobAttributes>,
}

#[derive(Debug, Deserialize)]
struct JobAttributes {
    #[serde(default)]
    status: Option<JobStatus>,
    #[serde(default)]
    result: Option<JobResult>,
}

impl ApiDocument<JobResource> {
    fn into_snapshot(self) -> Result<JobSnapshot, ServiceError> {
        let resource = self
            .data
            .ok_or_else(|| ServiceError::MissingField("data".to_string()))?;
        let id = resource
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::MissingField("data.id".to_string()))?;
        let attributes = resource
            .attributes
            .ok_or_else(|| ServiceError::MissingField("data.attributes".to_string()))?;
        let status = attributes
            .status
            .ok_or_else(|| ServiceError::MissingField("data.attributes.status".to_string()))?;

        Ok(JobSnapshot {
            id,
            status,
            result: attributes.result,
        })
    }
}
