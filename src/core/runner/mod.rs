pub mod fallback;
pub mod timeout;

pub use fallback::{FallbackRegistry, FallbackStrategy, StaticFallback};
pub use timeout::{TimeoutPolicy, MAX_TIMEOUT};

use crate::core::config::{EngineConfig, RecoveryConfig};
use crate::core::entities::{
    ErrorContext, ExecutionOptions, ExecutionResult, ExecutionTask, Operation, OperationContext,
};
use crate::core::error::EngineError;
use crate::core::performance::TimingHistory;
use crate::core::recovery::{classify, resolve, ErrorReportLog, RecoveryAction};
use crate::core::types::{ErrorSeverity, ResolutionOutcome};
use rand::Rng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Executes a single operation under timeout, retry, and fallback policy.
///
/// Every attempt is raced against its effective timeout. Failures are
/// classified, logged as error reports, and dispatched through the recovery
/// policy; only `Abort` and `Manual` decisions surface as [`EngineError`],
/// everything else concludes in an [`ExecutionResult`].
pub struct OperationRunner {
    timeout_policy: TimeoutPolicy,
    recovery: RecoveryConfig,
    fallbacks: Arc<FallbackRegistry>,
    history: Arc<TimingHistory>,
    reports: Arc<ErrorReportLog>,
    jitter_ms: u64,
}

impl OperationRunner {
    pub fn new(config: &EngineConfig) -> Self {
        OperationRunner {
            timeout_policy: TimeoutPolicy::from_config(&config.runner),
            recovery: config.recovery.clone(),
            fallbacks: Arc::new(FallbackRegistry::new()),
            history: Arc::new(TimingHistory::new()),
            reports: Arc::new(ErrorReportLog::new()),
            jitter_ms: config.runner.retry_jitter_ms,
        }
    }

    /// Registry consulted when the recovery policy asks for a fallback.
    pub fn fallbacks(&self) -> Arc<FallbackRegistry> {
        Arc::clone(&self.fallbacks)
    }

    /// Rolling duration history feeding adaptive timeouts.
    pub fn history(&self) -> Arc<TimingHistory> {
        Arc::clone(&self.history)
    }

    /// Error reports opened by this runner.
    pub fn reports(&self) -> Arc<ErrorReportLog> {
        Arc::clone(&self.reports)
    }

    /// Run `operation` to a conclusion under the given options.
    ///
    /// Returns `Err` only for abort and manual-intervention policy decisions;
    /// retries, fallbacks, and skips all conclude in an `Ok` result carrying
    /// the attempt count and accumulated warnings.
    pub async fn run(
        &self,
        operation: Arc<dyn Operation>,
        name: &str,
        options: &ExecutionOptions,
    ) -> Result<ExecutionResult, EngineError> {
        let started = Instant::now();
        let options_cap = options.max_retries.max(1);
        let mut attempt: u32 = 1;
        let mut warnings: Vec<String> = Vec::new();
        let mut pending_reports: Vec<Uuid> = Vec::new();
        let mut error_context = ErrorContext::new(name);

        loop {
            let budget = self.timeout_policy.effective(
                options.timeout,
                name,
                options.priority,
                attempt,
                Some(self.history.as_ref()),
                options.adaptive_timeout,
            );
            let ctx = OperationContext::new(name, name, attempt);
            tracing::debug!(
                operation = %name,
                attempt,
                timeout_ms = budget.as_millis() as u64,
                "executing operation attempt"
            );

            let attempt_started = Instant::now();
            let message = match tokio::time::timeout(budget, operation.execute(&ctx)).await {
                Ok(Ok(output)) => {
                    self.history.record(name, attempt_started.elapsed());
                    self.resolve_reports(&pending_reports, ResolutionOutcome::Success);
                    tracing::info!(operation = %name, attempt, "operation succeeded");
                    return Ok(finish(
                        ExecutionResult::succeeded(name, output),
                        started,
                        attempt,
                        warnings,
                    ));
                }
                Ok(Err(err)) => format!("{err:#}"),
                Err(_) => format!(
                    "operation '{}' timed out after {}",
                    name,
                    humantime::format_duration(budget)
                ),
            };

            let classification = classify(&message, &error_context);
            let action = resolve(
                classification.category,
                classification.severity,
                &error_context,
                &self.recovery,
            );
            let report_id = self.reports.open(
                classification.category,
                classification.severity,
                name,
                &message,
                action.disposition(),
            );
            pending_reports.push(report_id);
            tracing::warn!(
                operation = %name,
                attempt,
                category = %classification.category,
                severity = %classification.severity,
                action = %action.disposition(),
                error = %message,
                "operation attempt failed"
            );

            match action {
                RecoveryAction::Abort => {
                    self.resolve_reports(&pending_reports, ResolutionOutcome::Failure);
                    return Err(if classification.severity == ErrorSeverity::Critical {
                        EngineError::critical_abort(name, message)
                    } else {
                        EngineError::category_abort(classification.category, name, message)
                    });
                }
                RecoveryAction::Manual => {
                    self.resolve_reports(&pending_reports, ResolutionOutcome::Partial);
                    return Err(EngineError::manual(name, message));
                }
                RecoveryAction::Retry {
                    max_attempts: policy_cap,
                    delay,
                } => {
                    if attempt < allowed_attempts(options_cap, policy_cap) {
                        warnings.push(format!(
                            "attempt {attempt} failed: {message}; retrying in {}",
                            humantime::format_duration(delay)
                        ));
                        let pause = {
                            let mut total = delay;
                            if self.jitter_ms > 0 {
                                let jitter =
                                    rand::thread_rng().gen_range(0..=self.jitter_ms);
                                total += Duration::from_millis(jitter);
                            }
                            total
                        };
                        tokio::time::sleep(pause).await;
                        error_context = error_context.next_attempt();
                        attempt += 1;
                        continue;
                    }
                    return Ok(self
                        .conclude_exhausted(
                            name,
                            attempt,
                            started,
                            message,
                            warnings,
                            &pending_reports,
                            options.fallback_required,
                        )
                        .await);
                }
                RecoveryAction::Fallback => match self.fallbacks.get(name) {
                    Some(strategy) => {
                        let fallback_ctx = OperationContext::new(name, name, attempt);
                        match strategy.recover(&fallback_ctx).await {
                            Ok(output) => {
                                self.resolve_reports(
                                    &pending_reports,
                                    ResolutionOutcome::Partial,
                                );
                                warnings.push(format!(
                                    "attempt {attempt} failed: {message}; fallback produced a degraded result"
                                ));
                                tracing::info!(
                                    operation = %name,
                                    "fallback recovered a degraded result"
                                );
                                return Ok(finish(
                                    ExecutionResult::succeeded(name, output),
                                    started,
                                    attempt,
                                    warnings,
                                ));
                            }
                            Err(err) => {
                                self.resolve_reports(
                                    &pending_reports,
                                    ResolutionOutcome::Failure,
                                );
                                return Ok(finish(
                                    ExecutionResult::failed(
                                        name,
                                        format!("{message}; fallback also failed: {err:#}"),
                                    ),
                                    started,
                                    attempt,
                                    warnings,
                                ));
                            }
                        }
                    }
                    None => {
                        // No strategy registered: burn the attempt and retry
                        // if budget remains, otherwise fail.
                        if attempt < options_cap {
                            warnings.push(format!(
                                "attempt {attempt} failed: {message}; no fallback registered, retrying"
                            ));
                            error_context = error_context.next_attempt();
                            attempt += 1;
                            continue;
                        }
                        self.resolve_reports(&pending_reports, ResolutionOutcome::Failure);
                        return Ok(finish(
                            ExecutionResult::failed(name, message),
                            started,
                            attempt,
                            warnings,
                        ));
                    }
                },
                RecoveryAction::Skip => {
                    self.resolve_reports(&pending_reports, ResolutionOutcome::Failure);
                    return Ok(finish(
                        ExecutionResult::skipped(
                            name,
                            format!("skipped by recovery policy: {message}"),
                        ),
                        started,
                        attempt,
                        warnings,
                    ));
                }
            }
        }
    }

    /// Run a scheduled task through the standard options mapping.
    ///
    /// Tasks with an explicit timeout keep it verbatim; tasks without one opt
    /// into adaptive sizing from the duration history.
    pub async fn run_task(&self, task: &ExecutionTask) -> Result<ExecutionResult, EngineError> {
        let options = ExecutionOptions {
            max_retries: task.retry_attempts,
            timeout: task.timeout,
            critical: false,
            fallback_required: false,
            priority: task.priority,
            adaptive_timeout: task.timeout.is_none(),
        };
        self.run(Arc::clone(&task.operation), &task.id, &options)
            .await
    }

    async fn conclude_exhausted(
        &self,
        name: &str,
        attempt: u32,
        started: Instant,
        message: String,
        mut warnings: Vec<String>,
        pending: &[Uuid],
        fallback_required: bool,
    ) -> ExecutionResult {
        if fallback_required {
            if let Some(strategy) = self.fallbacks.get(name) {
                let ctx = OperationContext::new(name, name, attempt);
                match strategy.recover(&ctx).await {
                    Ok(output) => {
                        self.resolve_reports(pending, ResolutionOutcome::Partial);
                        warnings.push(format!(
                            "retries exhausted: {message}; fallback produced a degraded result"
                        ));
                        return finish(
                            ExecutionResult::succeeded(name, output),
                            started,
                            attempt,
                            warnings,
                        );
                    }
                    Err(err) => {
                        self.resolve_reports(pending, ResolutionOutcome::Failure);
                        return finish(
                            ExecutionResult::failed(
                                name,
                                format!("{message}; fallback also failed: {err:#}"),
                            ),
                            started,
                            attempt,
                            warnings,
                        );
                    }
                }
            }
            self.resolve_reports(pending, ResolutionOutcome::Failure);
            return finish(
                ExecutionResult::failed(
                    name,
                    format!("{message}; fallback required but none registered"),
                ),
                started,
                attempt,
                warnings,
            );
        }
        self.resolve_reports(pending, ResolutionOutcome::Failure);
        finish(
            ExecutionResult::failed(name, message),
            started,
            attempt,
            warnings,
        )
    }

    fn resolve_reports(&self, ids: &[Uuid], outcome: ResolutionOutcome) {
        for id in ids {
            self.reports.resolve(*id, outcome);
        }
    }
}

/// Effective attempt ceiling: the caller's budget bounded by the policy's.
fn allowed_attempts(options_cap: u32, policy_cap: u32) -> u32 {
    options_cap.min(policy_cap).max(1)
}

fn finish(
    mut result: ExecutionResult,
    started: Instant,
    attempts: u32,
    warnings: Vec<String>,
) -> ExecutionResult {
    result.duration_ms = started.elapsed().as_millis() as u64;
    result.attempts = attempts;
    result.warnings = warnings;
    result
}
