use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Main engine configuration loaded from shipwright.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Recovery policy configuration
    #[serde(default)]
    pub recovery: RecoveryConfig,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of tasks running concurrently within one batch
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Declared-memory capacity in megabytes
    #[serde(default = "default_memory_threshold_mb")]
    pub memory_threshold_mb: u64,

    /// Standing charge attributed to the process before any task runs
    #[serde(default)]
    pub baseline_memory_mb: u64,

    /// Fraction of the threshold a single batch may declare
    #[serde(default = "default_batch_memory_ratio")]
    pub batch_memory_ratio: f64,

    /// Usage ratio at which the background monitor starts reclaiming
    #[serde(default = "default_reclaim_ratio")]
    pub reclaim_ratio: f64,

    /// Background monitor tick interval in milliseconds
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,

    /// Pause between batches, giving reclamation a chance to land
    #[serde(default = "default_inter_batch_pause_ms")]
    pub inter_batch_pause_ms: u64,

    /// How long shutdown waits for in-flight tasks before cancelling them
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

/// Runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Base timeout applied when neither the task nor the operation table
    /// provides one, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Per-operation base timeouts in milliseconds, keyed by operation name
    #[serde(default)]
    pub operation_timeouts: HashMap<String, u64>,

    /// Timeout multiplier applied on constrained agent hosts
    #[serde(default = "default_environment_multiplier")]
    pub environment_multiplier: f64,

    /// Factor applied to the rolling average when sizing adaptive timeouts
    #[serde(default = "default_adaptive_headroom")]
    pub adaptive_headroom: f64,

    /// Samples required before adaptive sizing kicks in
    #[serde(default = "default_adaptive_min_samples")]
    pub adaptive_min_samples: usize,

    /// Upper bound of random extra delay added to retry pauses
    #[serde(default)]
    pub retry_jitter_ms: u64,
}

/// Recovery policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Default attempt ceiling for retryable categories
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,

    /// Exponential backoff starting delay in milliseconds
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Exponential backoff ceiling in milliseconds
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Fixed pause after a provider rate limit, in seconds
    #[serde(default = "default_rate_limit_delay_secs")]
    pub rate_limit_delay_secs: u64,

    /// Attempt ceiling once a rate limit has been hit
    #[serde(default = "default_rate_limit_max_attempts")]
    pub rate_limit_max_attempts: u32,

    /// Fixed delay before retrying version control failures, in milliseconds
    #[serde(default = "default_vcs_retry_delay_ms")]
    pub vcs_retry_delay_ms: u64,

    /// Fixed delay before retrying filesystem failures, in milliseconds
    #[serde(default = "default_fs_retry_delay_ms")]
    pub fs_retry_delay_ms: u64,

    /// Age past which resolved error reports are dropped during reclamation,
    /// in seconds
    #[serde(default = "default_report_retention_secs")]
    pub report_retention_secs: u64,
}

// Default functions
fn default_max_concurrency() -> usize {
    4
}

fn default_memory_threshold_mb() -> u64 {
    1000
}

fn default_batch_memory_ratio() -> f64 {
    0.7
}

fn default_reclaim_ratio() -> f64 {
    0.6
}

fn default_monitor_interval_ms() -> u64 {
    500
}

fn default_inter_batch_pause_ms() -> u64 {
    100
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_environment_multiplier() -> f64 {
    1.0
}

fn default_adaptive_headroom() -> f64 {
    2.0
}

fn default_adaptive_min_samples() -> usize {
    3
}

fn default_max_retry_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_cap_ms() -> u64 {
    30_000
}

fn default_rate_limit_delay_secs() -> u64 {
    60
}

fn default_rate_limit_max_attempts() -> u32 {
    2
}

fn default_vcs_retry_delay_ms() -> u64 {
    1_000
}

fn default_fs_retry_delay_ms() -> u64 {
    250
}

fn default_report_retention_secs() -> u64 {
    86_400
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_concurrency: default_max_concurrency(),
            memory_threshold_mb: default_memory_threshold_mb(),
            baseline_memory_mb: 0,
            batch_memory_ratio: default_batch_memory_ratio(),
            reclaim_ratio: default_reclaim_ratio(),
            monitor_interval_ms: default_monitor_interval_ms(),
            inter_batch_pause_ms: default_inter_batch_pause_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            default_timeout_ms: default_timeout_ms(),
            operation_timeouts: HashMap::new(),
            environment_multiplier: default_environment_multiplier(),
            adaptive_headroom: default_adaptive_headroom(),
            adaptive_min_samples: default_adaptive_min_samples(),
            retry_jitter_ms: 0,
        }
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            max_retry_attempts: default_max_retry_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            rate_limit_delay_secs: default_rate_limit_delay_secs(),
            rate_limit_max_attempts: default_rate_limit_max_attempts(),
            vcs_retry_delay_ms: default_vcs_retry_delay_ms(),
            fs_retry_delay_ms: default_fs_retry_delay_ms(),
            report_retention_secs: default_report_retention_secs(),
        }
    }
}

impl RecoveryConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap_ms)
    }

    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_secs(self.rate_limit_delay_secs)
    }

    pub fn vcs_retry_delay(&self) -> Duration {
        Duration::from_millis(self.vcs_retry_delay_ms)
    }

    pub fn fs_retry_delay(&self) -> Duration {
        Duration::from_millis(self.fs_retry_delay_ms)
    }

    pub fn report_retention(&self) -> Duration {
        Duration::from_secs(self.report_retention_secs)
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
