use shipwright::core::recovery::classify;
use shipwright::core::types::{ErrorCategory, ErrorSeverity};
use shipwright::core::ErrorContext;

fn ctx(operation: &str) -> ErrorContext {
    ErrorContext::new(operation)
}

#[test]
fn test_category_assignment_per_keyword_family() {
    let cases = vec![
        ("connection reset by peer", ErrorCategory::Network),
        ("TLS handshake failed with remote", ErrorCategory::Network),
        ("received 429 Too Many Requests", ErrorCategory::ExternalApi),
        ("GraphQL mutation rejected", ErrorCategory::ExternalApi),
        ("merge conflict in README.md", ErrorCategory::VersionControl),
        ("detached HEAD state detected", ErrorCategory::VersionControl),
        ("no such file or directory", ErrorCategory::Filesystem),
        ("read-only file system", ErrorCategory::Filesystem),
        (
            "permission denied while opening lockfile",
            ErrorCategory::Permission,
        ),
        (
            "sub-agent produced an empty completion",
            ErrorCategory::SubAgent,
        ),
        ("missing setting for workspace root", ErrorCategory::Configuration),
        ("invalid commit message format", ErrorCategory::Validation),
    ];

    for (message, expected) in cases {
        let classification = classify(message, &ctx("status"));
        assert_eq!(
            classification.category, expected,
            "message {message:?} should map to {expected:?}"
        );
    }
}

#[test]
fn test_matching_is_case_insensitive() {
    let upper = classify("CONNECTION REFUSED", &ctx("push"));
    let lower = classify("connection refused", &ctx("push"));
    assert_eq!(upper.category, ErrorCategory::Network);
    assert_eq!(upper, lower);
}

#[test]
fn test_first_matching_family_wins() {
    // Contains both a network keyword ("timed out") and an external API
    // keyword ("rate limit"); the network family is consulted first.
    let classification = classify("timed out waiting for rate limit reset", &ctx("push"));
    assert_eq!(classification.category, ErrorCategory::Network);

    // "index.lock" (version control) alongside "file exists" (filesystem).
    let classification = classify(
        "fatal: Unable to create '.git/index.lock': File exists",
        &ctx("commit"),
    );
    assert_eq!(classification.category, ErrorCategory::VersionControl);
}

#[test]
fn test_security_keywords_force_critical_severity() {
    let cases = vec![
        "a secret was detected in the staged diff",
        "refusing to store credential material",
        "destructive operation rejected",
        "unauthorized use of deploy key",
    ];
    for message in cases {
        let classification = classify(message, &ctx("status"));
        assert_eq!(
            classification.severity,
            ErrorSeverity::Critical,
            "message {message:?} should be critical"
        );
    }

    // The override also beats category-specific severity rules.
    let classification = classify("connection reset while scanning for secret values", &ctx("push"));
    assert_eq!(classification.category, ErrorCategory::Network);
    assert_eq!(classification.severity, ErrorSeverity::Critical);
}

#[test]
fn test_permission_failure_during_write_operation_is_critical() {
    let message = "permission denied writing to object store";
    let write = classify(message, &ctx("push"));
    assert_eq!(write.category, ErrorCategory::Permission);
    assert_eq!(write.severity, ErrorSeverity::Critical);

    let read = classify(message, &ctx("status"));
    assert_eq!(read.category, ErrorCategory::Permission);
    assert_eq!(read.severity, ErrorSeverity::Low);
}

#[test]
fn test_rate_limited_api_failures_are_high_severity() {
    let limited = classify("rate limit exceeded for installation", &ctx("create-pr"));
    assert_eq!(limited.category, ErrorCategory::ExternalApi);
    assert_eq!(limited.severity, ErrorSeverity::High);

    let plain = classify("403 Forbidden from endpoint", &ctx("create-pr"));
    assert_eq!(plain.category, ErrorCategory::ExternalApi);
    assert_eq!(plain.severity, ErrorSeverity::Low);
}

#[test]
fn test_version_control_severity_escalates_after_two_attempts() {
    let message = "merge conflict in src/lib.rs";

    let early = classify(message, &ctx("merge").with_attempt(2));
    assert_eq!(early.category, ErrorCategory::VersionControl);
    assert_eq!(early.severity, ErrorSeverity::Low);

    let late = classify(message, &ctx("merge").with_attempt(3));
    assert_eq!(late.category, ErrorCategory::VersionControl);
    assert_eq!(late.severity, ErrorSeverity::High);
}

#[test]
fn test_network_and_filesystem_default_to_medium() {
    let network = classify("dns resolution failed", &ctx("push"));
    assert_eq!(network.severity, ErrorSeverity::Medium);

    let filesystem = classify("enoent while reading hunk", &ctx("stage"));
    assert_eq!(filesystem.category, ErrorCategory::Filesystem);
    assert_eq!(filesystem.severity, ErrorSeverity::Medium);
}

#[test]
fn test_unmatched_messages_fall_back_to_validation_low() {
    let classification = classify("unexpected response shape", &ctx("stage"));
    assert_eq!(classification.category, ErrorCategory::Validation);
    assert_eq!(classification.severity, ErrorSeverity::Low);
}

#[test]
fn test_classification_is_deterministic() {
    let context = ctx("commit").with_attempt(4);
    let first = classify("git rebase failed midway", &context);
    let second = classify("git rebase failed midway", &context);
    assert_eq!(first, second);
    assert_eq!(first.category, ErrorCategory::VersionControl);
    assert_eq!(first.severity, ErrorSeverity::High);
}
