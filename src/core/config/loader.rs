use super::{ConfigValidator, EngineConfig};
use crate::core::error::EngineError;
use std::env;
use std::path::Path;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/shipwright.toml)
    /// Environment variables override config file values, and the merged
    /// result is validated before it is returned
    pub fn load_from_workspace(workspace_path: &Path) -> Result<EngineConfig, EngineError> {
        let config_path = workspace_path.join("shipwright.toml");
        let config_file = Self::load_from_file(&config_path)?;

        let mut config = config_file.unwrap_or_default();

        // Apply environment variable overrides
        Self::apply_env_overrides(&mut config);

        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<EngineConfig>, EngineError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            EngineError::Config(format!(
                "failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    /// Environment variables take precedence over config file values;
    /// values that fail to parse are ignored
    fn apply_env_overrides(config: &mut EngineConfig) {
        // Scheduler overrides
        if let Ok(raw) = env::var("SHIPWRIGHT_MAX_CONCURRENCY") {
            if let Ok(max_concurrency) = raw.parse::<usize>() {
                config.scheduler.max_concurrency = max_concurrency;
            }
        }

        if let Ok(raw) = env::var("SHIPWRIGHT_MEMORY_THRESHOLD_MB") {
            if let Ok(threshold) = raw.parse::<u64>() {
                config.scheduler.memory_threshold_mb = threshold;
            }
        }

        if let Ok(raw) = env::var("SHIPWRIGHT_SHUTDOWN_GRACE_MS") {
            if let Ok(grace) = raw.parse::<u64>() {
                config.scheduler.shutdown_grace_ms = grace;
            }
        }

        // Runner overrides
        if let Ok(raw) = env::var("SHIPWRIGHT_DEFAULT_TIMEOUT_MS") {
            if let Ok(timeout) = raw.parse::<u64>() {
                config.runner.default_timeout_ms = timeout;
            }
        }

        if let Ok(raw) = env::var("SHIPWRIGHT_ENVIRONMENT_MULTIPLIER") {
            if let Ok(multiplier) = raw.parse::<f64>() {
                config.runner.environment_multiplier = multiplier;
            }
        }

        if let Ok(raw) = env::var("SHIPWRIGHT_RETRY_JITTER_MS") {
            if let Ok(jitter) = raw.parse::<u64>() {
                config.runner.retry_jitter_ms = jitter;
            }
        }

        // Recovery overrides
        if let Ok(raw) = env::var("SHIPWRIGHT_MAX_RETRY_ATTEMPTS") {
            if let Ok(attempts) = raw.parse::<u32>() {
                config.recovery.max_retry_attempts = attempts;
            }
        }

        if let Ok(raw) = env::var("SHIPWRIGHT_BACKOFF_BASE_MS") {
            if let Ok(base) = raw.parse::<u64>() {
                config.recovery.backoff_base_ms = base;
            }
        }

        if let Ok(raw) = env::var("SHIPWRIGHT_RATE_LIMIT_DELAY_SECS") {
            if let Ok(delay) = raw.parse::<u64>() {
                config.recovery.rate_limit_delay_secs = delay;
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "SHIPWRIGHT_MAX_CONCURRENCY - Override scheduler max concurrency (default: 4)",
            "SHIPWRIGHT_MEMORY_THRESHOLD_MB - Override declared-memory capacity in MB (default: 1000)",
            "SHIPWRIGHT_SHUTDOWN_GRACE_MS - Override shutdown grace period in ms (default: 5000)",
            "SHIPWRIGHT_DEFAULT_TIMEOUT_MS - Override default operation timeout in ms (default: 30000)",
            "SHIPWRIGHT_ENVIRONMENT_MULTIPLIER - Override agent-host timeout multiplier (default: 1.0)",
            "SHIPWRIGHT_RETRY_JITTER_MS - Override retry jitter upper bound in ms (default: 0)",
            "SHIPWRIGHT_MAX_RETRY_ATTEMPTS - Override default retry attempt ceiling (default: 3)",
            "SHIPWRIGHT_BACKOFF_BASE_MS - Override exponential backoff base in ms (default: 500)",
            "SHIPWRIGHT_RATE_LIMIT_DELAY_SECS - Override rate limit pause in seconds (default: 60)",
            "SHIPWRIGHT_AGENT_HOST - Set to 1 to enable the environment timeout multiplier",
        ]
    }
}
