use crate::core::config::EngineConfig;
use crate::core::entities::{ExecutionResult, NamedOperation};
use crate::core::error::EngineError;
use crate::core::runner::OperationRunner;
use crate::core::types::TaskStatus;
use std::sync::Arc;
use std::time::Instant;

const SKIPPED_AFTER_CRITICAL: &str = "skipped due to prior critical failure";

/// Runs named operations strictly in order, one at a time.
///
/// Once an operation marked critical fails, the remaining operations are not
/// executed; each still yields a result explaining the skip, so callers can
/// always zip results against the submitted batch.
pub struct BatchOrchestrator {
    runner: Arc<OperationRunner>,
}

impl BatchOrchestrator {
    pub fn new(runner: Arc<OperationRunner>) -> Self {
        BatchOrchestrator { runner }
    }

    pub fn with_config(config: &EngineConfig) -> Self {
        Self::new(Arc::new(OperationRunner::new(config)))
    }

    pub fn runner(&self) -> Arc<OperationRunner> {
        Arc::clone(&self.runner)
    }

    /// Execute the batch sequentially, returning one result per operation in
    /// submission order.
    pub async fn execute_batch(&self, operations: Vec<NamedOperation>) -> Vec<ExecutionResult> {
        let mut results = Vec::with_capacity(operations.len());
        let mut halted = false;

        for op in operations {
            if halted {
                results.push(ExecutionResult::skipped(&op.name, SKIPPED_AFTER_CRITICAL));
                continue;
            }

            tracing::info!(
                operation = %op.name,
                critical = op.options.critical,
                "executing batch operation"
            );
            let started = Instant::now();
            let result = match self
                .runner
                .run(Arc::clone(&op.operation), &op.name, &op.options)
                .await
            {
                Ok(result) => result,
                Err(err) => fatal_result(&op.name, &err, started),
            };

            if op.options.critical && !result.success {
                tracing::error!(
                    operation = %op.name,
                    error = result.error.as_deref().unwrap_or("unknown"),
                    "critical operation failed; remaining operations will be skipped"
                );
                halted = true;
            }
            results.push(result);
        }

        results
    }
}

fn fatal_result(operation: &str, err: &EngineError, started: Instant) -> ExecutionResult {
    let mut result = ExecutionResult::failed(operation, err.to_string());
    if matches!(err, EngineError::ManualRequired { .. }) {
        result.status = TaskStatus::Manual;
    }
    result.duration_ms = started.elapsed().as_millis() as u64;
    result
}
