use shipwright::core::config::RecoveryConfig;
use shipwright::core::recovery::{backoff_delay, resolve, RecoveryAction};
use shipwright::core::types::{ErrorCategory, ErrorSeverity, RecoveryDisposition};
use shipwright::core::ErrorContext;
use std::time::Duration;

fn ctx(attempt: u32) -> ErrorContext {
    ErrorContext::new("push").with_attempt(attempt)
}

#[test]
fn test_critical_severity_aborts_every_category() {
    let config = RecoveryConfig::default();
    let categories = [
        ErrorCategory::Network,
        ErrorCategory::ExternalApi,
        ErrorCategory::VersionControl,
        ErrorCategory::Filesystem,
        ErrorCategory::Permission,
        ErrorCategory::SubAgent,
        ErrorCategory::Configuration,
        ErrorCategory::Validation,
    ];

    for category in categories {
        let action = resolve(category, ErrorSeverity::Critical, &ctx(1), &config);
        assert_eq!(
            action,
            RecoveryAction::Abort,
            "critical {category} failures must abort"
        );
    }
}

#[test]
fn test_network_failures_retry_with_exponential_backoff() {
    let config = RecoveryConfig::default();

    let first = resolve(ErrorCategory::Network, ErrorSeverity::Medium, &ctx(1), &config);
    assert_eq!(
        first,
        RecoveryAction::Retry {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    );

    let third = resolve(ErrorCategory::Network, ErrorSeverity::Medium, &ctx(3), &config);
    assert_eq!(
        third,
        RecoveryAction::Retry {
            max_attempts: 3,
            delay: Duration::from_millis(2000),
        }
    );
}

#[test]
fn test_backoff_is_non_decreasing_and_capped() {
    let base = Duration::from_millis(500);
    let cap = Duration::from_secs(30);

    let mut previous = Duration::ZERO;
    for attempt in 1..=12 {
        let delay = backoff_delay(attempt, base, cap);
        assert!(
            delay >= previous,
            "delay shrank from {previous:?} to {delay:?} at attempt {attempt}"
        );
        assert!(delay <= cap);
        previous = delay;
    }

    assert_eq!(backoff_delay(1, base, cap), Duration::from_millis(500));
    assert_eq!(backoff_delay(2, base, cap), Duration::from_millis(1000));
    assert_eq!(backoff_delay(8, base, cap), cap);
    // Attempt zero is treated as the first attempt rather than underflowing.
    assert_eq!(backoff_delay(0, base, cap), Duration::from_millis(500));
}

#[test]
fn test_rate_limited_api_failures_wait_out_the_window() {
    let config = RecoveryConfig::default();
    let action = resolve(ErrorCategory::ExternalApi, ErrorSeverity::High, &ctx(1), &config);
    assert_eq!(
        action,
        RecoveryAction::Retry {
            max_attempts: 2,
            delay: Duration::from_secs(60),
        }
    );
}

#[test]
fn test_other_api_failures_fall_back() {
    let config = RecoveryConfig::default();
    for severity in [ErrorSeverity::Low, ErrorSeverity::Medium] {
        let action = resolve(ErrorCategory::ExternalApi, severity, &ctx(1), &config);
        assert_eq!(action, RecoveryAction::Fallback);
    }
}

#[test]
fn test_version_control_policy_depends_on_severity() {
    let config = RecoveryConfig::default();

    let stuck = resolve(
        ErrorCategory::VersionControl,
        ErrorSeverity::High,
        &ctx(3),
        &config,
    );
    assert_eq!(stuck, RecoveryAction::Manual);

    let transient = resolve(
        ErrorCategory::VersionControl,
        ErrorSeverity::Low,
        &ctx(1),
        &config,
    );
    assert_eq!(
        transient,
        RecoveryAction::Retry {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
        }
    );
}

#[test]
fn test_filesystem_failures_retry_quickly() {
    let config = RecoveryConfig::default();
    let action = resolve(
        ErrorCategory::Filesystem,
        ErrorSeverity::Medium,
        &ctx(2),
        &config,
    );
    assert_eq!(
        action,
        RecoveryAction::Retry {
            max_attempts: 3,
            delay: Duration::from_millis(250),
        }
    );
}

#[test]
fn test_sub_agent_failures_fall_back() {
    let config = RecoveryConfig::default();
    let action = resolve(ErrorCategory::SubAgent, ErrorSeverity::Low, &ctx(1), &config);
    assert_eq!(action, RecoveryAction::Fallback);
}

#[test]
fn test_permission_and_configuration_failures_abort() {
    let config = RecoveryConfig::default();
    for category in [ErrorCategory::Permission, ErrorCategory::Configuration] {
        let action = resolve(category, ErrorSeverity::Low, &ctx(1), &config);
        assert_eq!(action, RecoveryAction::Abort, "{category} must abort");
    }
}

#[test]
fn test_validation_failures_are_skipped() {
    let config = RecoveryConfig::default();
    let action = resolve(ErrorCategory::Validation, ErrorSeverity::Low, &ctx(1), &config);
    assert_eq!(action, RecoveryAction::Skip);
}

#[test]
fn test_policy_reads_delays_from_configuration() {
    let config = RecoveryConfig {
        max_retry_attempts: 5,
        backoff_base_ms: 100,
        vcs_retry_delay_ms: 40,
        fs_retry_delay_ms: 10,
        rate_limit_delay_secs: 5,
        rate_limit_max_attempts: 4,
        ..RecoveryConfig::default()
    };

    assert_eq!(
        resolve(ErrorCategory::Network, ErrorSeverity::Medium, &ctx(1), &config),
        RecoveryAction::Retry {
            max_attempts: 5,
            delay: Duration::from_millis(100),
        }
    );
    assert_eq!(
        resolve(ErrorCategory::ExternalApi, ErrorSeverity::High, &ctx(1), &config),
        RecoveryAction::Retry {
            max_attempts: 4,
            delay: Duration::from_secs(5),
        }
    );
    assert_eq!(
        resolve(
            ErrorCategory::VersionControl,
            ErrorSeverity::Medium,
            &ctx(1),
            &config
        ),
        RecoveryAction::Retry {
            max_attempts: 5,
            delay: Duration::from_millis(40),
        }
    );
    assert_eq!(
        resolve(ErrorCategory::Filesystem, ErrorSeverity::Medium, &ctx(1), &config),
        RecoveryAction::Retry {
            max_attempts: 5,
            delay: Duration::from_millis(10),
        }
    );
}

#[test]
fn test_disposition_flattens_actions() {
    let retry = RecoveryAction::Retry {
        max_attempts: 3,
        delay: Duration::from_millis(1),
    };
    assert_eq!(retry.disposition(), RecoveryDisposition::Retry);
    assert_eq!(RecoveryAction::Fallback.disposition(), RecoveryDisposition::Fallback);
    assert_eq!(RecoveryAction::Skip.disposition(), RecoveryDisposition::Skip);
    assert_eq!(RecoveryAction::Abort.disposition(), RecoveryDisposition::Abort);
    assert_eq!(RecoveryAction::Manual.disposition(), RecoveryDisposition::Manual);
}

#[test]
fn test_actions_serialize_with_a_kind_tag() {
    let action = RecoveryAction::Retry {
        max_attempts: 2,
        delay: Duration::from_secs(1),
    };
    let json = serde_json::to_string(&action).unwrap();
    assert!(json.contains("\"kind\":\"retry\""));

    let skip = serde_json::to_string(&RecoveryAction::Skip).unwrap();
    assert!(skip.contains("\"kind\":\"skip\""));
}
