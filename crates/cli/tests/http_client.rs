//! HttpServiceClient against the in-process fake platform.

mod common;

use rample_core::config::ServiceConfig;
use rample_core::service::{CreateJobRequest, JobResult, JobStatus};
use rample_core::{HttpServiceClient, RemoteService, ServiceError};
use serde_json::{Map, Value};

use common::{FakePlatform, API_KEY};

fn client_for(platform: &FakePlatform, api_key: &str) -> HttpServiceClient {
    let config = ServiceConfig {
        hostname: "localhost".to_string(),
        api_key: api_key.to_string(),
        base_url: Some(platform.endpoint()),
        timeout_secs: 5,
    };
    HttpServiceClient::new(&config).expect("client should build")
}

fn request(preset: &str) -> CreateJobRequest {
    CreateJobRequest {
        preset_name: preset.to_string(),
        asset_name: "test_movie_1".to_string(),
        dynamic_preset_data: Map::new(),
    }
}

#[tokio::test]
async fn test_lookups() {
    let platform = FakePlatform::start(&["test_movie_1"], &["QC Profile A"]).await;
    let client = client_for(&platform, API_KEY);

    assert!(client.asset_exists("test_movie_1").await.unwrap());
    assert!(!client.asset_exists("missing_movie").await.unwrap());
    assert!(client.preset_exists("QC Profile A").await.unwrap());
    assert!(!client.preset_exists("Nonexistent Preset").await.unwrap());
    assert_eq!(client.name(), "http");
}

#[tokio::test]
async fn test_bad_api_key_is_api_error() {
    let platform = FakePlatform::start(&["test_movie_1"], &[]).await;
    let client = client_for(&platform, "wrong-key");

    let err = client.asset_exists("test_movie_1").await.unwrap_err();
    assert!(matches!(err, ServiceError::ApiError { status: 401, .. }));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn test_job_lifecycle() {
    let platform = FakePlatform::start(&["test_movie_1"], &["QC Profile A"]).await;
    let client = client_for(&platform, API_KEY);

    let mut parameters = Map::new();
    parameters.insert("loudness".to_string(), Value::from(-23));
    let mut req = request("QC Profile A");
    req.dynamic_preset_data = parameters;

    let created = client.create_job(&req).await.unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(created.status, JobStatus::Queued);
    assert_eq!(created.result, None);

    let polled = client.get_job(&created.id).await.unwrap();
    assert_eq!(polled.id, created.id);
    assert_eq!(polled.status, JobStatus::Complete);
    assert_eq!(polled.result, Some(JobResult::Pass));

    let submitted = platform.submissions();
    assert_eq!(submitted.len(), 1);
    assert_eq!(
        submitted[0]["data"]["attributes"]["dynamicPresetData"]["loudness"],
        -23
    );
    assert_eq!(
        submitted[0]["data"]["relationships"]["asset"]["data"]["attributes"]["name"],
        "test_movie_1"
    );
}

#[tokio::test]
async fn test_rejected_job_creation() {
    let platform = FakePlatform::start(&["test_movie_1"], &[]).await;
    let client = client_for(&platform, API_KEY);

    let err = client.create_job(&request("Unknown")).await.unwrap_err();
    match err {
        ServiceError::ApiError { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "unknown preset");
        }
        other => panic!("expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_job_error_artifact() {
    let platform = FakePlatform::start(&["test_movie_1"], &["Fail Profile"]).await;
    let client = client_for(&platform, API_KEY);

    let created = client.create_job(&request("Fail Profile")).await.unwrap();
    let polled = client.get_job(&created.id).await.unwrap();
    assert_eq!(polled.status, JobStatus::Error);

    let text = client.get_job_error(&created.id).await.unwrap();
    assert!(text.starts_with("Timeout on step 3\n"));

    let err = client.get_job("no-such-job").await.unwrap_err();
    assert!(matches!(err, ServiceError::ApiError { status: 404, .. }));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let config = ServiceConfig {
        hostname: "localhost".to_string(),
        api_key: API_KEY.to_string(),
        // Port 9 (discard) is not listening locally
        base_url: Some("http://127.0.0.1:9/api/v2".to_string()),
        timeout_secs: 2,
    };
    let client = HttpServiceClient::new(&config).unwrap();

    let err = client.asset_exists("test_movie_1").await.unwrap_err();
    assert!(err.is_transport());
}
