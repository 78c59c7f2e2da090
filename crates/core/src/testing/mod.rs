//! Testing utilities and mock implementations.
//!
//! `MockRemoteService` stands in for the media platform so test cases and
//! the orchestrator can be exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use rample_core::testing::{fixtures, JobScript, MockRemoteService};
//!
//! let service = fixtures::service_with("test_movie_1", &["QC Profile A"]).await;
//! service
//!     .script_preset("QC Profile A", JobScript::failing("Timeout on step 3"))
//!     .await;
//! ```

mod mock_service;

pub use mock_service::{JobScript, MockOperation, MockRemoteService, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use super::MockRemoteService;
    use crate::config::{Config, ServiceConfig, TestEntry};
    use crate::harness::TestCase;

    /// Enabled config entry for `name` on `asset`.
    pub fn test_entry(name: &str, asset: Option<&str>) -> TestEntry {
        TestEntry {
            name: name.to_string(),
            asset: asset.map(str::to_string),
            enabled: true,
            dynamic_preset_data: None,
        }
    }

    /// Valid config with the given tests and a default asset.
    pub fn config(tests: Vec<TestEntry>) -> Config {
        Config {
            service: ServiceConfig {
                hostname: "uat.example.com".to_string(),
                api_key: "test-api-key".to_string(),
                ..Default::default()
            },
            default_test_asset: Some("test_movie_1".to_string()),
            orchestrator: Default::default(),
            polling: Default::default(),
            tests,
            env_hostname: None,
            api_key: None,
        }
    }

    /// `count` enabled cases named "Preset 0", "Preset 1"... on `asset`.
    pub fn numbered_cases(count: usize, asset: &str) -> Vec<TestCase> {
        (0..count)
            .filter_map(|i| TestCase::new(format!("Preset {}", i), asset).ok())
            .collect()
    }

    /// Mock service that knows `asset` and every preset in `presets`.
    pub async fn service_with(asset: &str, presets: &[&str]) -> MockRemoteService {
        let service = MockRemoteService::new();
        service.add_asset(asset).await;
        for preset in presets {
            service.add_preset(*preset).await;
        }
        service
    }
}
