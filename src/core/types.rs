use serde::{Deserialize, Serialize};

/// Task priority enumeration.
///
/// Ordered so that sorting ascending yields critical work first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl TaskPriority {
    /// Timeout scaling applied to the base timeout for this priority.
    pub fn timeout_multiplier(self) -> f64 {
        match self {
            TaskPriority::Critical => 2.0,
            TaskPriority::High => 1.5,
            TaskPriority::Medium => 1.0,
            TaskPriority::Low => 0.7,
        }
    }
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPriority::Critical => write!(f, "critical"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Medium => write!(f, "medium"),
            TaskPriority::Low => write!(f, "low"),
        }
    }
}

/// Error category enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Network,
    ExternalApi,
    VersionControl,
    Filesystem,
    Permission,
    SubAgent,
    Configuration,
    Validation,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::ExternalApi => write!(f, "external_api"),
            ErrorCategory::VersionControl => write!(f, "version_control"),
            ErrorCategory::Filesystem => write!(f, "filesystem"),
            ErrorCategory::Permission => write!(f, "permission"),
            ErrorCategory::SubAgent => write!(f, "sub_agent"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Validation => write!(f, "validation"),
        }
    }
}

/// Error severity enumeration, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Low => write!(f, "low"),
            ErrorSeverity::Medium => write!(f, "medium"),
            ErrorSeverity::High => write!(f, "high"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Terminal status carried by every execution result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Succeeded,
    Failed,
    Skipped,
    Cancelled,
    Manual,
}

impl TaskStatus {
    pub fn is_terminal_failure(self) -> bool {
        matches!(
            self,
            TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::Manual
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Succeeded => write!(f, "succeeded"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Skipped => write!(f, "skipped"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
            TaskStatus::Manual => write!(f, "manual"),
        }
    }
}

/// Flat recovery decision recorded on error reports and log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryDisposition {
    Retry,
    Fallback,
    Skip,
    Abort,
    Manual,
}

impl std::fmt::Display for RecoveryDisposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoveryDisposition::Retry => write!(f, "retry"),
            RecoveryDisposition::Fallback => write!(f, "fallback"),
            RecoveryDisposition::Skip => write!(f, "skip"),
            RecoveryDisposition::Abort => write!(f, "abort"),
            RecoveryDisposition::Manual => write!(f, "manual"),
        }
    }
}

/// Final outcome attached to a resolved error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionOutcome {
    Success,
    Failure,
    Partial,
}

/// Engine health derived from recent operation timings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    #[default]
    Optimal,
    Good,
    Warning,
    Critical,
}

impl std::fmt::Display for HealthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthLevel::Optimal => write!(f, "optimal"),
            HealthLevel::Good => write!(f, "good"),
            HealthLevel::Warning => write!(f, "warning"),
            HealthLevel::Critical => write!(f, "critical"),
        }
    }
}
