use crate::core::config::RunnerConfig;
use crate::core::performance::TimingHistory;
use crate::core::types::TaskPriority;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Hard ceiling applied after every other factor.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Environment flag marking constrained agent hosts whose timeouts are
/// scaled by the configured environment multiplier.
pub const AGENT_HOST_ENV: &str = "SHIPWRIGHT_AGENT_HOST";

/// Computes the effective timeout for one attempt of an operation.
///
/// Factors combine in a fixed order: base (explicit override, per-operation
/// table, or default; adaptively replaced from history when asked), then the
/// priority multiplier, then the retry multiplier, then the environment
/// multiplier, and finally the [`MAX_TIMEOUT`] cap.
#[derive(Debug, Clone)]
pub struct TimeoutPolicy {
    default_timeout: Duration,
    operation_timeouts: HashMap<String, Duration>,
    environment_multiplier: f64,
    environment_scaling: bool,
    adaptive_headroom: f64,
    adaptive_min_samples: usize,
}

impl TimeoutPolicy {
    pub fn from_config(config: &RunnerConfig) -> Self {
        TimeoutPolicy {
            default_timeout: Duration::from_millis(config.default_timeout_ms),
            operation_timeouts: config
                .operation_timeouts
                .iter()
                .map(|(name, ms)| (name.clone(), Duration::from_millis(*ms)))
                .collect(),
            environment_multiplier: config.environment_multiplier,
            environment_scaling: agent_host_flag_set(),
            adaptive_headroom: config.adaptive_headroom,
            adaptive_min_samples: config.adaptive_min_samples,
        }
    }

    /// Force environment scaling on or off, bypassing the env flag.
    pub fn with_environment_scaling(mut self, enabled: bool) -> Self {
        self.environment_scaling = enabled;
        self
    }

    pub fn effective(
        &self,
        base_override: Option<Duration>,
        operation: &str,
        priority: TaskPriority,
        attempt: u32,
        history: Option<&TimingHistory>,
        adaptive: bool,
    ) -> Duration {
        let mut base = base_override
            .or_else(|| self.operation_timeouts.get(operation).copied())
            .unwrap_or(self.default_timeout);

        if adaptive {
            if let Some(history) = history {
                if history.sample_count(operation) >= self.adaptive_min_samples {
                    if let Some(average) = history.average(operation) {
                        let derived = average.mul_f64(self.adaptive_headroom);
                        // Adaptive bases widen, never shrink below the
                        // configured base, and respect the cap.
                        base = derived.max(base).min(MAX_TIMEOUT);
                    }
                }
            }
        }

        let scaled = base
            .mul_f64(priority.timeout_multiplier())
            .mul_f64(retry_multiplier(attempt));
        let scaled = if self.environment_scaling {
            scaled.mul_f64(self.environment_multiplier)
        } else {
            scaled
        };
        scaled.min(MAX_TIMEOUT)
    }
}

/// Later attempts get longer budgets: 1.0, 1.5, 2.0, ...
fn retry_multiplier(attempt: u32) -> f64 {
    1.0 + 0.5 * f64::from(attempt.max(1) - 1)
}

fn agent_host_flag_set() -> bool {
    env::var(AGENT_HOST_ENV)
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
