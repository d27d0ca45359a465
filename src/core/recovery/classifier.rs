use crate::core::entities::ErrorContext;
use crate::core::types::{ErrorCategory, ErrorSeverity};

/// Category and severity assigned to a single failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
}

/// Keywords that always force critical severity regardless of category.
const SECURITY_KEYWORDS: &[&str] = &["secret", "credential", "destructive", "unauthorized"];

/// Operation names that imply a repository write when paired with a
/// permission failure.
const WRITE_OPERATIONS: &[&str] = &["commit", "push", "merge", "stage", "write", "delete", "tag"];

const NETWORK_KEYWORDS: &[&str] = &[
    "network",
    "connection refused",
    "connection reset",
    "timed out",
    "timeout",
    "dns",
    "unreachable",
    "broken pipe",
    "tls handshake",
];

const EXTERNAL_API_KEYWORDS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "too many requests",
    "429",
    "403",
    "401",
    "api",
    "graphql",
    "quota",
    "abuse detection",
];

const RATE_LIMIT_KEYWORDS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "too many requests",
    "429",
    "quota",
    "abuse detection",
];

const VERSION_CONTROL_KEYWORDS: &[&str] = &[
    "git",
    "merge conflict",
    "rebase",
    "detached head",
    "non-fast-forward",
    "index.lock",
    "refusing to merge",
    "working tree",
];

const FILESYSTEM_KEYWORDS: &[&str] = &[
    "no such file",
    "file not found",
    "not a directory",
    "is a directory",
    "disk",
    "enoent",
    "read-only file system",
    "file exists",
];

const PERMISSION_KEYWORDS: &[&str] = &[
    "permission denied",
    "access denied",
    "eacces",
    "eperm",
    "operation not permitted",
    "forbidden",
];

const SUB_AGENT_KEYWORDS: &[&str] = &[
    "agent",
    "sub-agent",
    "subagent",
    "model",
    "prompt",
    "completion",
    "context window",
];

const CONFIGURATION_KEYWORDS: &[&str] = &[
    "config",
    "configuration",
    "missing setting",
    "invalid value",
    "unsupported option",
    "malformed",
];

/// Classify a rendered error message into a category and severity.
///
/// Pure and deterministic: the same message and context always yield the
/// same classification. Matching is case-insensitive and rule order is
/// fixed, so a message hitting several keyword families lands in the first
/// matching category.
pub fn classify(message: &str, context: &ErrorContext) -> Classification {
    let lowered = message.to_lowercase();
    let category = categorize(&lowered);
    let severity = assess_severity(category, &lowered, context);
    Classification { category, severity }
}

fn categorize(lowered: &str) -> ErrorCategory {
    if contains_any(lowered, NETWORK_KEYWORDS) {
        ErrorCategory::Network
    } else if contains_any(lowered, EXTERNAL_API_KEYWORDS) {
        ErrorCategory::ExternalApi
    } else if contains_any(lowered, VERSION_CONTROL_KEYWORDS) {
        ErrorCategory::VersionControl
    } else if contains_any(lowered, FILESYSTEM_KEYWORDS) {
        ErrorCategory::Filesystem
    } else if contains_any(lowered, PERMISSION_KEYWORDS) {
        ErrorCategory::Permission
    } else if contains_any(lowered, SUB_AGENT_KEYWORDS) {
        ErrorCategory::SubAgent
    } else if contains_any(lowered, CONFIGURATION_KEYWORDS) {
        ErrorCategory::Configuration
    } else {
        ErrorCategory::Validation
    }
}

fn assess_severity(category: ErrorCategory, lowered: &str, context: &ErrorContext) -> ErrorSeverity {
    // Security wording wins over every other rule.
    if contains_any(lowered, SECURITY_KEYWORDS) {
        return ErrorSeverity::Critical;
    }
    if category == ErrorCategory::Permission && is_write_operation(&context.operation) {
        return ErrorSeverity::Critical;
    }
    if category == ErrorCategory::ExternalApi && contains_any(lowered, RATE_LIMIT_KEYWORDS) {
        return ErrorSeverity::High;
    }
    if category == ErrorCategory::VersionControl && context.attempt > 2 {
        return ErrorSeverity::High;
    }
    if matches!(category, ErrorCategory::Network | ErrorCategory::Filesystem) {
        return ErrorSeverity::Medium;
    }
    ErrorSeverity::Low
}

fn is_write_operation(operation: &str) -> bool {
    let lowered = operation.to_lowercase();
    contains_any(&lowered, WRITE_OPERATIONS)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
