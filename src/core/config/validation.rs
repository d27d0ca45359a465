use super::EngineConfig;
use crate::core::error::EngineError;
use crate::core::runner::timeout::MAX_TIMEOUT;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &EngineConfig) -> Result<(), EngineError> {
        let max_timeout_ms = MAX_TIMEOUT.as_millis() as u64;

        // Scheduler rules
        if config.scheduler.max_concurrency == 0 {
            return Err(EngineError::Config(
                "scheduler.max_concurrency must be at least 1".to_string(),
            ));
        }

        if config.scheduler.memory_threshold_mb == 0 {
            return Err(EngineError::Config(
                "scheduler.memory_threshold_mb must be at least 1".to_string(),
            ));
        }

        if !ratio_in_range(config.scheduler.batch_memory_ratio) {
            return Err(EngineError::Config(format!(
                "scheduler.batch_memory_ratio must be in (0.0, 1.0], got {}",
                config.scheduler.batch_memory_ratio
            )));
        }

        if !ratio_in_range(config.scheduler.reclaim_ratio) {
            return Err(EngineError::Config(format!(
                "scheduler.reclaim_ratio must be in (0.0, 1.0], got {}",
                config.scheduler.reclaim_ratio
            )));
        }

        if config.scheduler.monitor_interval_ms == 0 {
            return Err(EngineError::Config(
                "scheduler.monitor_interval_ms must be at least 1".to_string(),
            ));
        }

        if config.scheduler.shutdown_grace_ms < config.scheduler.monitor_interval_ms {
            return Err(EngineError::Config(
                "scheduler.shutdown_grace_ms must not be shorter than the monitor interval"
                    .to_string(),
            ));
        }

        // Runner rules
        if config.runner.default_timeout_ms == 0 || config.runner.default_timeout_ms > max_timeout_ms
        {
            return Err(EngineError::Config(format!(
                "runner.default_timeout_ms must be in 1..={}, got {}",
                max_timeout_ms, config.runner.default_timeout_ms
            )));
        }

        for (operation, timeout_ms) in &config.runner.operation_timeouts {
            if *timeout_ms == 0 || *timeout_ms > max_timeout_ms {
                return Err(EngineError::Config(format!(
                    "runner.operation_timeouts.{} must be in 1..={}, got {}",
                    operation, max_timeout_ms, timeout_ms
                )));
            }
        }

        if config.runner.environment_multiplier <= 0.0 {
            return Err(EngineError::Config(format!(
                "runner.environment_multiplier must be positive, got {}",
                config.runner.environment_multiplier
            )));
        }

        if config.runner.adaptive_headroom < 1.0 {
            return Err(EngineError::Config(format!(
                "runner.adaptive_headroom must be at least 1.0, got {}",
                config.runner.adaptive_headroom
            )));
        }

        // Recovery rules
        if config.recovery.max_retry_attempts == 0 {
            return Err(EngineError::Config(
                "recovery.max_retry_attempts must be at least 1".to_string(),
            ));
        }

        if config.recovery.rate_limit_max_attempts == 0 {
            return Err(EngineError::Config(
                "recovery.rate_limit_max_attempts must be at least 1".to_string(),
            ));
        }

        if config.recovery.backoff_cap_ms < config.recovery.backoff_base_ms {
            return Err(EngineError::Config(format!(
                "recovery.backoff_cap_ms ({}) must not be below recovery.backoff_base_ms ({})",
                config.recovery.backoff_cap_ms, config.recovery.backoff_base_ms
            )));
        }

        Ok(())
    }
}

fn ratio_in_range(ratio: f64) -> bool {
    ratio > 0.0 && ratio <= 1.0
}
