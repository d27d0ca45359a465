use crate::core::config::RecoveryConfig;
use crate::core::entities::ErrorContext;
use crate::core::types::{ErrorCategory, ErrorSeverity, RecoveryDisposition};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recovery decision produced by the policy table.
///
/// Pure data: fallback implementations are looked up by operation name in
/// the runner's registry rather than carried here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryAction {
    Retry { max_attempts: u32, delay: Duration },
    Fallback,
    Skip,
    Abort,
    Manual,
}

impl RecoveryAction {
    pub fn disposition(&self) -> RecoveryDisposition {
        match self {
            RecoveryAction::Retry { .. } => RecoveryDisposition::Retry,
            RecoveryAction::Fallback => RecoveryDisposition::Fallback,
            RecoveryAction::Skip => RecoveryDisposition::Skip,
            RecoveryAction::Abort => RecoveryDisposition::Abort,
            RecoveryAction::Manual => RecoveryDisposition::Manual,
        }
    }
}

/// Resolve the recovery action for a classified failure.
///
/// Critical severity short-circuits to `Abort` before the category table is
/// consulted; everything else follows the per-category rules with delays and
/// caps taken from `config`.
pub fn resolve(
    category: ErrorCategory,
    severity: ErrorSeverity,
    context: &ErrorContext,
    config: &RecoveryConfig,
) -> RecoveryAction {
    if severity == ErrorSeverity::Critical {
        return RecoveryAction::Abort;
    }

    match category {
        ErrorCategory::Network => RecoveryAction::Retry {
            max_attempts: config.max_retry_attempts,
            delay: backoff_delay(context.attempt, config.backoff_base(), config.backoff_cap()),
        },
        ErrorCategory::ExternalApi if severity == ErrorSeverity::High => RecoveryAction::Retry {
            max_attempts: config.rate_limit_max_attempts,
            delay: config.rate_limit_delay(),
        },
        ErrorCategory::ExternalApi => RecoveryAction::Fallback,
        ErrorCategory::VersionControl if severity == ErrorSeverity::High => RecoveryAction::Manual,
        ErrorCategory::VersionControl => RecoveryAction::Retry {
            max_attempts: config.max_retry_attempts,
            delay: config.vcs_retry_delay(),
        },
        ErrorCategory::Filesystem => RecoveryAction::Retry {
            max_attempts: config.max_retry_attempts,
            delay: config.fs_retry_delay(),
        },
        ErrorCategory::SubAgent => RecoveryAction::Fallback,
        ErrorCategory::Permission | ErrorCategory::Configuration => RecoveryAction::Abort,
        ErrorCategory::Validation => RecoveryAction::Skip,
    }
}

/// Exponential backoff delay for the given 1-based attempt.
///
/// Doubles per attempt starting from `base` and never exceeds `cap`, so the
/// sequence is non-decreasing.
pub fn backoff_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    let exponent = attempt.max(1).saturating_sub(1).min(16);
    let factor = 1u32 << exponent;
    base.saturating_mul(factor).min(cap)
}
