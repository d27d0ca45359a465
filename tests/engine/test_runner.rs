use async_trait::async_trait;
use serde_json::{json, Value};
use shipwright::core::config::EngineConfig;
use shipwright::core::runner::{FallbackStrategy, StaticFallback};
use shipwright::core::types::{ResolutionOutcome, TaskPriority, TaskStatus};
use shipwright::core::{
    EngineError, ExecutionOptions, ExecutionTask, Operation, OperationContext, OperationRunner,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

/// Fails with the same error on every call, counting invocations.
struct AlwaysFails {
    message: &'static str,
    calls: Arc<AtomicU32>,
}

impl AlwaysFails {
    fn new(message: &'static str) -> (Arc<Self>, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let op = Arc::new(AlwaysFails {
            message,
            calls: Arc::clone(&calls),
        });
        (op, calls)
    }
}

#[async_trait]
impl Operation for AlwaysFails {
    async fn execute(&self, _ctx: &OperationContext) -> shipwright::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("{}", self.message)
    }
}

/// Fails a fixed number of times, then succeeds.
struct Flaky {
    remaining: AtomicU32,
    message: &'static str,
}

impl Flaky {
    fn new(failures: u32, message: &'static str) -> Arc<Self> {
        Arc::new(Flaky {
            remaining: AtomicU32::new(failures),
            message,
        })
    }
}

#[async_trait]
impl Operation for Flaky {
    async fn execute(&self, ctx: &OperationContext) -> shipwright::Result<Value> {
        if self.remaining.load(Ordering::SeqCst) > 0 {
            self.remaining.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("{}", self.message);
        }
        Ok(json!({"attempt": ctx.attempt}))
    }
}

/// Sleeps past any reasonable test timeout before succeeding.
struct Slow;

#[async_trait]
impl Operation for Slow {
    async fn execute(&self, _ctx: &OperationContext) -> shipwright::Result<Value> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Value::Null)
    }
}

struct FailingFallback;

#[async_trait]
impl FallbackStrategy for FailingFallback {
    async fn recover(&self, _context: &OperationContext) -> shipwright::Result<Value> {
        anyhow::bail!("cache lookup failed")
    }
}

/// Engine configuration with millisecond-scale recovery delays.
fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.recovery.backoff_base_ms = 1;
    config.recovery.backoff_cap_ms = 5;
    config.recovery.vcs_retry_delay_ms = 1;
    config.recovery.fs_retry_delay_ms = 1;
    config.recovery.rate_limit_delay_secs = 0;
    config
}

#[tokio::test]
async fn test_success_on_the_first_attempt() {
    let runner = OperationRunner::new(&fast_config());

    let result = tokio_test::assert_ok!(
        runner
            .run(Flaky::new(0, "unused"), "stage", &ExecutionOptions::default())
            .await
    );

    assert_eq!(result.task_id, "stage");
    assert_eq!(result.status, TaskStatus::Succeeded);
    assert!(result.success);
    assert_eq!(result.attempts, 1);
    assert!(result.warnings.is_empty());
    assert_eq!(result.output, Some(json!({"attempt": 1})));
    assert!(runner.reports().is_empty());
}

#[tokio::test]
async fn test_transient_failures_are_retried_with_warnings() {
    let runner = OperationRunner::new(&fast_config());

    let result = runner
        .run(
            Flaky::new(2, "connection reset by peer"),
            "push",
            &ExecutionOptions::default(),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.attempts, 3);
    assert_eq!(result.warnings.len(), 2);
    assert!(result.warnings[0].contains("attempt 1 failed"));
    assert!(result.warnings[0].contains("connection reset by peer"));
    assert!(result.warnings[0].contains("retrying in"));
    assert!(result.warnings[1].contains("attempt 2 failed"));

    // Both interim reports end up resolved as successes.
    let reports = runner.reports().snapshot();
    assert_eq!(reports.len(), 2);
    assert!(reports
        .iter()
        .all(|r| r.resolved && r.outcome == Some(ResolutionOutcome::Success)));
}

#[tokio::test]
async fn test_exhausted_retries_conclude_in_failure() {
    let runner = OperationRunner::new(&fast_config());
    let (operation, calls) = AlwaysFails::new("connection refused by remote");

    let result = runner
        .run(
            operation,
            "push",
            &ExecutionOptions::default().with_max_retries(2),
        )
        .await
        .unwrap();

    assert_eq!(result.status, TaskStatus::Failed);
    assert_eq!(result.attempts, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.error.as_deref(), Some("connection refused by remote"));
    assert_eq!(result.warnings.len(), 1);

    let reports = runner.reports().snapshot();
    assert!(reports
        .iter()
        .all(|r| r.resolved && r.outcome == Some(ResolutionOutcome::Failure)));
}

#[tokio::test]
async fn test_security_failures_abort_without_retrying() {
    let runner = OperationRunner::new(&fast_config());
    let (operation, calls) = AlwaysFails::new("secret detected in staged diff");

    let error = runner
        .run(operation, "commit", &ExecutionOptions::default())
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(error.is_abort());
    let rendered = error.to_string();
    assert!(rendered.contains("critical-severity"));
    assert!(rendered.contains("commit"));
    assert!(rendered.contains("secret detected in staged diff"));
}

#[tokio::test]
async fn test_permission_failures_abort_by_category() {
    let runner = OperationRunner::new(&fast_config());
    let (operation, calls) = AlwaysFails::new("permission denied reading workspace state");

    // A read operation keeps the severity below critical; the abort comes
    // from the permission category itself.
    let error = runner
        .run(operation, "status", &ExecutionOptions::default())
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(error.is_abort());
    assert!(error.to_string().contains("permission-abort"));
}

#[tokio::test]
async fn test_repeated_merge_conflicts_escalate_to_manual() {
    let runner = OperationRunner::new(&fast_config());
    let (operation, calls) = AlwaysFails::new("merge conflict in src/lib.rs");

    let error = runner
        .run(
            operation,
            "merge",
            &ExecutionOptions::default().with_max_retries(5),
        )
        .await
        .unwrap_err();

    // Two retries at low severity, then the third classification escalates.
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(matches!(error, EngineError::ManualRequired { .. }));
    assert!(error.to_string().contains("requires manual intervention"));
}

#[tokio::test]
async fn test_sub_agent_failure_recovers_through_fallback() {
    let runner = OperationRunner::new(&fast_config());
    runner.fallbacks().register(
        "summarize",
        Arc::new(StaticFallback::new(json!({"summary": "unavailable"}))),
    );
    let (operation, calls) = AlwaysFails::new("sub-agent returned an empty completion");

    let result = runner
        .run(operation, "summarize", &ExecutionOptions::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(result.success);
    assert_eq!(result.output, Some(json!({"summary": "unavailable"})));
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("fallback produced a degraded result"));

    let reports = runner.reports().snapshot();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, Some(ResolutionOutcome::Partial));
}

#[tokio::test]
async fn test_failing_fallback_ends_the_operation() {
    let runner = OperationRunner::new(&fast_config());
    runner
        .fallbacks()
        .register("summarize", Arc::new(FailingFallback));
    let (operation, _) = AlwaysFails::new("sub-agent returned an empty completion");

    let result = runner
        .run(operation, "summarize", &ExecutionOptions::default())
        .await
        .unwrap();

    assert_eq!(result.status, TaskStatus::Failed);
    let error = result.error.unwrap();
    assert!(error.contains("fallback also failed"));
    assert!(error.contains("cache lookup failed"));
}

#[tokio::test]
async fn test_missing_fallback_burns_attempts_then_fails() {
    let runner = OperationRunner::new(&fast_config());
    let (operation, calls) = AlwaysFails::new("sub-agent returned an empty completion");

    let result = runner
        .run(
            operation,
            "summarize",
            &ExecutionOptions::default().with_max_retries(2),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.status, TaskStatus::Failed);
    assert_eq!(result.attempts, 2);
    assert!(result.warnings[0].contains("no fallback registered"));
}

#[tokio::test]
async fn test_required_fallback_runs_after_retries_are_exhausted() {
    let runner = OperationRunner::new(&fast_config());
    runner.fallbacks().register(
        "push",
        Arc::new(StaticFallback::new(json!({"pushed": false, "queued": true}))),
    );
    let (operation, calls) = AlwaysFails::new("connection reset by peer");

    let result = runner
        .run(
            operation,
            "push",
            &ExecutionOptions::default()
                .with_max_retries(2)
                .with_fallback_required(),
        )
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(result.success);
    assert_eq!(result.attempts, 2);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("retries exhausted") && w.contains("degraded")));
}

#[tokio::test]
async fn test_required_fallback_missing_is_reported() {
    let runner = OperationRunner::new(&fast_config());
    let (operation, _) = AlwaysFails::new("connection reset by peer");

    let result = runner
        .run(
            operation,
            "push",
            &ExecutionOptions::default()
                .with_max_retries(2)
                .with_fallback_required(),
        )
        .await
        .unwrap();

    assert_eq!(result.status, TaskStatus::Failed);
    assert!(result
        .error
        .unwrap()
        .contains("fallback required but none registered"));
}

#[tokio::test]
async fn test_validation_failures_are_skipped_not_retried() {
    let runner = OperationRunner::new(&fast_config());
    let (operation, calls) = AlwaysFails::new("invalid commit message format");

    let result = runner
        .run(operation, "commit", &ExecutionOptions::default())
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.status, TaskStatus::Skipped);
    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("skipped by recovery policy: invalid commit message format")
    );
    assert!(!result.status.is_terminal_failure());
}

#[tokio::test]
async fn test_timeouts_are_classified_and_retried() {
    let runner = OperationRunner::new(&fast_config());

    let result = runner
        .run(
            Arc::new(Slow),
            "push",
            &ExecutionOptions::default()
                .with_timeout(Duration::from_millis(20))
                .with_max_retries(2),
        )
        .await
        .unwrap();

    assert_eq!(result.status, TaskStatus::Failed);
    assert_eq!(result.attempts, 2);
    assert!(result.error.unwrap().contains("timed out after"));
    assert!(result.warnings[0].contains("timed out after"));
}

#[tokio::test]
async fn test_run_task_uses_the_task_retry_budget() {
    let runner = OperationRunner::new(&fast_config());
    let (operation, calls) = AlwaysFails::new("connection reset by peer");
    let task = ExecutionTask::new("push-main", operation)
        .with_priority(TaskPriority::High)
        .with_retry_attempts(2);

    let result = runner.run_task(&task).await.unwrap();

    assert_eq!(result.task_id, "push-main");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.attempts, 2);
}

#[tokio::test]
async fn test_successful_attempts_feed_the_duration_history() {
    let runner = OperationRunner::new(&fast_config());

    runner
        .run(Flaky::new(0, "unused"), "stage", &ExecutionOptions::default())
        .await
        .unwrap();
    runner
        .run(Flaky::new(0, "unused"), "stage", &ExecutionOptions::default())
        .await
        .unwrap();

    assert_eq!(runner.history().sample_count("stage"), 2);
    assert!(runner.history().average("stage").is_some());
}

#[tokio::test]
async fn test_retry_jitter_still_converges() {
    let mut config = fast_config();
    config.runner.retry_jitter_ms = 3;
    let runner = OperationRunner::new(&config);

    let result = runner
        .run(
            Flaky::new(2, "connection reset by peer"),
            "push",
            &ExecutionOptions::default(),
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.attempts, 3);
}
