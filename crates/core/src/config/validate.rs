use super::{types::Config, ConfigError};

/// Validate configuration.
///
/// Everything checked here is a setup mistake that no amount of retrying
/// will fix, so the run stops before any request is made.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let service = &config.service;
    if service.hostname.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "service.hostname is required (e.g. yourcompany-uat.example.com)".to_string(),
        ));
    }
    if service.hostname.contains("://") {
        return Err(ConfigError::ValidationError(format!(
            "service.hostname must not include a scheme: {}",
            service.hostname
        )));
    }
    if service.api_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "service.api_key is required".to_string(),
        ));
    }

    if config.orchestrator.max_workers == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.max_workers cannot be 0".to_string(),
        ));
    }

    let polling = &config.polling;
    if polling.job_lookup_tries == 0 {
        return Err(ConfigError::ValidationError(
            "polling.job_lookup_tries cannot be 0".to_string(),
        ));
    }
    if polling.backoff_multiplier.is_nan() || polling.backoff_multiplier < 1.0 {
        return Err(ConfigError::ValidationError(format!(
            "polling.backoff_multiplier must be >= 1.0, got {}",
            polling.backoff_multiplier
        )));
    }

    for (idx, entry) in config.tests.iter().enumerate() {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "tests[{}]: name is required",
                idx
            )));
        }
        if config.resolve_asset(entry).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "tests[{}] ({}): no asset given and no default_test_asset configured",
                idx, entry.name
            )));
        }
    }

    Ok(())
}
