use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub use crate::core::types::{ErrorCategory, ErrorSeverity, TaskPriority, TaskStatus};

/// Per-attempt context handed to an operation when it executes.
#[derive(Debug, Clone)]
pub struct OperationContext {
    /// Identifier of the task or operation being executed.
    pub task_id: String,
    /// Human-readable operation name, also the key for timing history.
    pub operation: String,
    /// 1-based attempt counter for the current run.
    pub attempt: u32,
    /// Working directory the operation should act in, when known.
    pub working_dir: Option<PathBuf>,
}

impl OperationContext {
    pub fn new(task_id: impl Into<String>, operation: impl Into<String>, attempt: u32) -> Self {
        OperationContext {
            task_id: task_id.into(),
            operation: operation.into(),
            attempt,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }
}

/// Unit of work executed under the engine's timeout and recovery policies.
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    async fn execute(&self, ctx: &OperationContext) -> crate::Result<Value>;
}

/// Resource release hook run exactly once per scheduled task.
///
/// Errors are logged by the scheduler and never propagated.
#[async_trait]
pub trait CleanupAction: Send + Sync + 'static {
    async fn cleanup(&self, task_id: &str) -> crate::Result<()>;
}

/// Task submitted to the scheduler. Immutable once submitted.
#[derive(Clone)]
pub struct ExecutionTask {
    pub id: String,
    pub priority: TaskPriority,
    /// Base timeout override; the runner applies priority/retry scaling on top.
    pub timeout: Option<Duration>,
    /// Maximum number of execution attempts, including the first.
    pub retry_attempts: u32,
    /// Declared peak memory cost used for batch partitioning.
    pub memory_limit_mb: u64,
    pub operation: Arc<dyn Operation>,
    pub cleanup: Option<Arc<dyn CleanupAction>>,
}

impl ExecutionTask {
    pub fn new(id: impl Into<String>, operation: Arc<dyn Operation>) -> Self {
        ExecutionTask {
            id: id.into(),
            priority: TaskPriority::default(),
            timeout: None,
            retry_attempts: 1,
            memory_limit_mb: 0,
            operation,
            cleanup: None,
        }
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    pub fn with_memory_limit_mb(mut self, limit_mb: u64) -> Self {
        self.memory_limit_mb = limit_mb;
        self
    }

    pub fn with_cleanup(mut self, cleanup: Arc<dyn CleanupAction>) -> Self {
        self.cleanup = Some(cleanup);
        self
    }
}

impl fmt::Debug for ExecutionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionTask")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("retry_attempts", &self.retry_attempts)
            .field("memory_limit_mb", &self.memory_limit_mb)
            .field("has_cleanup", &self.cleanup.is_some())
            .finish_non_exhaustive()
    }
}

/// Options controlling how the runner executes a single operation.
#[derive(Debug, Clone)]
pub struct ExecutionOptions {
    /// Maximum attempts, including the first. Floored to 1.
    pub max_retries: u32,
    /// Base timeout override for this operation.
    pub timeout: Option<Duration>,
    /// Critical operations short-circuit the remainder of a batch on failure.
    pub critical: bool,
    /// Run the registered fallback when all retries are exhausted.
    pub fallback_required: bool,
    pub priority: TaskPriority,
    /// Derive the base timeout from rolling duration history when available.
    pub adaptive_timeout: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        ExecutionOptions {
            max_retries: 3,
            timeout: None,
            critical: false,
            fallback_required: false,
            priority: TaskPriority::Medium,
            adaptive_timeout: false,
        }
    }
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn with_fallback_required(mut self) -> Self {
        self.fallback_required = true;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_adaptive_timeout(mut self) -> Self {
        self.adaptive_timeout = true;
        self
    }
}

/// A named operation queued for sequential batch execution.
#[derive(Clone)]
pub struct NamedOperation {
    pub name: String,
    pub options: ExecutionOptions,
    pub operation: Arc<dyn Operation>,
}

impl NamedOperation {
    pub fn new(
        name: impl Into<String>,
        operation: Arc<dyn Operation>,
        options: ExecutionOptions,
    ) -> Self {
        NamedOperation {
            name: name.into(),
            options,
            operation,
        }
    }
}

/// Outcome of one task or operation. Exactly one is produced per submitted
/// task, including tasks cancelled at shutdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub task_id: String,
    pub status: TaskStatus,
    pub success: bool,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub duration_ms: u64,
    /// Declared memory footprint attributed to the task while it ran.
    pub memory_delta_mb: i64,
    /// Number of execution attempts consumed, including the successful one.
    pub attempts: u32,
    /// Recoverable issues observed along the way, in occurrence order.
    pub warnings: Vec<String>,
}

impl ExecutionResult {
    pub fn succeeded(task_id: impl Into<String>, output: Value) -> Self {
        ExecutionResult {
            task_id: task_id.into(),
            status: TaskStatus::Succeeded,
            success: true,
            output: Some(output),
            error: None,
            duration_ms: 0,
            memory_delta_mb: 0,
            attempts: 1,
            warnings: Vec::new(),
        }
    }

    pub fn failed(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        ExecutionResult {
            task_id: task_id.into(),
            status: TaskStatus::Failed,
            success: false,
            output: None,
            error: Some(error.into()),
            duration_ms: 0,
            memory_delta_mb: 0,
            attempts: 1,
            warnings: Vec::new(),
        }
    }

    pub fn cancelled(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        ExecutionResult {
            task_id: task_id.into(),
            status: TaskStatus::Cancelled,
            success: false,
            output: None,
            error: Some(reason.into()),
            duration_ms: 0,
            memory_delta_mb: 0,
            attempts: 0,
            warnings: Vec::new(),
        }
    }

    pub fn skipped(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        ExecutionResult {
            task_id: task_id.into(),
            status: TaskStatus::Skipped,
            success: false,
            output: None,
            error: Some(reason.into()),
            duration_ms: 0,
            memory_delta_mb: 0,
            attempts: 0,
            warnings: Vec::new(),
        }
    }
}

/// Structured context attached to a failure when it is classified.
///
/// The shape is closed: unknown fields are rejected on deserialization so
/// downstream consumers cannot smuggle ad-hoc state through it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ErrorContext {
    /// Name of the operation that failed, e.g. "push" or "create_pr".
    pub operation: String,
    pub timestamp: DateTime<Utc>,
    pub working_dir: Option<PathBuf>,
    /// Files involved in the failed operation, when known.
    pub files: Vec<PathBuf>,
    /// 1-based attempt counter at the time of the failure.
    pub attempt: u32,
    pub metadata: BTreeMap<String, String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        ErrorContext {
            operation: operation.into(),
            timestamp: Utc::now(),
            working_dir: None,
            files: Vec::new(),
            attempt: 1,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt.max(1);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Carry the context into the next attempt with a fresh timestamp.
    pub fn next_attempt(mut self) -> Self {
        self.attempt += 1;
        self.timestamp = Utc::now();
        self
    }
}
