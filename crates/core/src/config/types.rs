use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    /// Asset used by tests that don't name one.
    #[serde(default)]
    pub default_test_asset: Option<String>,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub tests: Vec<TestEntry>,
    /// Flat hostname key used by older JSON configs.
    #[serde(default, skip_serializing)]
    pub env_hostname: Option<String>,
    /// Flat API key used by older JSON configs.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl Config {
    /// Fold the flat `env_hostname` / `api_key` keys into `[service]`.
    ///
    /// Values already present in `[service]` win.
    pub fn normalize(mut self) -> Self {
        if let Some(hostname) = self.env_hostname.take() {
            if self.service.hostname.is_empty() {
                self.service.hostname = hostname;
            }
        }
        if let Some(api_key) = self.api_key.take() {
            if self.service.api_key.is_empty() {
                self.service.api_key = api_key;
            }
        }
        self
    }

    /// Asset a test entry will run against, falling back to `default_test_asset`.
    pub fn resolve_asset<'a>(&'a self, entry: &'a TestEntry) -> Option<&'a str> {
        entry
            .asset
            .as_deref()
            .filter(|a| !a.is_empty())
            .or_else(|| self.default_test_asset.as_deref())
            .filter(|a| !a.is_empty())
    }

    /// Number of entries with `enabled = true`.
    pub fn enabled_count(&self) -> usize {
        self.tests.iter().filter(|t| t.enabled).count()
    }
}

/// Remote service connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Bare hostname, e.g. "yourcompany-uat.example.com" (no scheme).
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub api_key: String,
    /// Overrides the derived `https://<hostname>/api/v2` endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Per-request timeout in seconds (default: 10)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            api_key: String::new(),
            base_url: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ServiceConfig {
    /// API endpoint all request paths are appended to.
    pub fn endpoint(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}/api/v2", self.hostname),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

/// Job polling settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    /// Maximum number of status lookups per job.
    #[serde(default = "default_lookup_tries")]
    pub job_lookup_tries: u32,
    /// Seconds to wait before the first lookup.
    #[serde(default = "default_lookup_secs")]
    pub job_lookup_secs: u64,
    /// Growth factor applied to the wait after every lookup (1.0 = fixed).
    #[serde(default = "default_backoff")]
    pub backoff_multiplier: f64,
    /// Upper bound on a single wait, in seconds.
    #[serde(default = "default_max_interval")]
    pub max_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            job_lookup_tries: default_lookup_tries(),
            job_lookup_secs: default_lookup_secs(),
            backoff_multiplier: default_backoff(),
            max_interval_secs: default_max_interval(),
        }
    }
}

fn default_lookup_tries() -> u32 {
    6
}

fn default_lookup_secs() -> u64 {
    10
}

fn default_backoff() -> f64 {
    1.0
}

fn default_max_interval() -> u64 {
    60
}

/// One configured preset run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestEntry {
    /// Preset name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(
        default,
        rename = "dynamicPresetData",
        alias = "dynamic_preset_data",
        skip_serializing_if = "Option::is_none"
    )]
    pub dynamic_preset_data: Option<Map<String, Value>>,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub service: SanitizedServiceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_test_asset: Option<String>,
    pub orchestrator: OrchestratorConfig,
    pub polling: PollingConfig,
    pub tests_total: usize,
    pub tests_enabled: usize,
}

/// Sanitized service config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServiceConfig {
    pub hostname: String,
    pub endpoint: String,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            service: SanitizedServiceConfig {
                hostname: config.service.hostname.clone(),
                endpoint: config.service.endpoint(),
                api_key_configured: !config.service.api_key.is_empty(),
                timeout_secs: config.service.timeout_secs,
            },
            default_test_asset: config.default_test_asset.clone(),
            orchestrator: config.orchestrator.clone(),
            polling: config.polling.clone(),
            tests_total: config.tests.len(),
            tests_enabled: config.enabled_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
default_test_asset = "test_movie_1"

[service]
hostname = "acme-uat.example.com"
api_key = "secret"

[orchestrator]
max_workers = 3

[polling]
job_lookup_tries = 4
job_lookup_secs = 2

[[tests]]
name = "QC Profile A"
enabled = true

[[tests]]
name = "Evaluate B"
asset = "test_movie_2"
dynamicPresetData = { language = "en", loudness = -23 }
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.service.hostname, "acme-uat.example.com");
        assert_eq!(config.service.timeout_secs, 10);
        assert_eq!(config.orchestrator.max_workers, 3);
        assert_eq!(config.polling.job_lookup_tries, 4);
        assert_eq!(config.polling.backoff_multiplier, 1.0);
        assert_eq!(config.tests.len(), 2);
        assert!(config.tests[0].enabled);
        assert!(!config.tests[1].enabled); // default
        let dynamic = config.tests[1].dynamic_preset_data.as_ref().unwrap();
        assert_eq!(dynamic["language"], "en");
        assert_eq!(dynamic["loudness"], -23);
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.service.hostname.is_empty());
        assert_eq!(config.orchestrator.max_workers, 5);
        assert_eq!(config.polling.job_lookup_tries, 6);
        assert_eq!(config.polling.job_lookup_secs, 10);
        assert!(config.tests.is_empty());
    }

    #[test]
    fn test_normalize_legacy_keys() {
        let json = r#"{
            "env_hostname": "acme-uat.example.com",
            "api_key": "legacy-key",
            "default_test_asset": "test_movie_1",
            "tests": [{"name": "QC Profile A", "enabled": true}]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let config = config.normalize();
        assert_eq!(config.service.hostname, "acme-uat.example.com");
        assert_eq!(config.service.api_key, "legacy-key");
        assert!(config.env_hostname.is_none());
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_normalize_prefers_service_section() {
        let json = r#"{
            "env_hostname": "old.example.com",
            "service": {"hostname": "new.example.com", "api_key": "k"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let config = config.normalize();
        assert_eq!(config.service.hostname, "new.example.com");
    }

    #[test]
    fn test_endpoint() {
        let mut service = ServiceConfig {
            hostname: "acme.example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(service.endpoint(), "https://acme.example.com/api/v2");

        service.base_url = Some("http://127.0.0.1:9000/api/v2/".to_string());
        assert_eq!(service.endpoint(), "http://127.0.0.1:9000/api/v2");
    }

    #[test]
    fn test_resolve_asset() {
        let config: Config = toml::from_str(
            r#"
default_test_asset = "fallback"

[[tests]]
name = "a"

[[tests]]
name = "b"
asset = "own"

[[tests]]
name = "c"
asset = ""
"#,
        )
        .unwrap();
        assert_eq!(config.resolve_asset(&config.tests[0]), Some("fallback"));
        assert_eq!(config.resolve_asset(&config.tests[1]), Some("own"));
        assert_eq!(config.resolve_asset(&config.tests[2]), Some("fallback"));
    }

    #[test]
    fn test_sanitized_config() {
        let config: Config = toml::from_str(
            r#"
[service]
hostname = "acme.example.com"
api_key = "secret-key"

[[tests]]
name = "a"
enabled = true

[[tests]]
name = "b"
"#,
        )
        .unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.service.api_key_configured);
        assert_eq!(sanitized.service.endpoint, "https://acme.example.com/api/v2");
        assert_eq!(sanitized.tests_total, 2);
        assert_eq!(sanitized.tests_enabled, 1);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }
}
