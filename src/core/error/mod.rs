use crate::core::types::{ErrorCategory, ErrorSeverity};

/// Fatal engine errors that stop execution instead of producing a result.
///
/// Recoverable failures stay inside `ExecutionResult`; this type is reserved
/// for policy decisions that must halt the caller, and its messages name the
/// policy that fired.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("recovery policy '{policy}' aborted operation '{operation}': {message}")]
    PolicyAbort {
        policy: String,
        operation: String,
        message: String,
    },

    #[error("operation '{operation}' requires manual intervention: {message}")]
    ManualRequired { operation: String, message: String },

    #[error("scheduler is shutting down; no new work accepted")]
    ShuttingDown,

    #[error("invalid engine configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Abort raised because classification produced a critical severity.
    pub fn critical_abort(operation: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::PolicyAbort {
            policy: format!("{}-severity", ErrorSeverity::Critical),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Abort raised by the per-category recovery table.
    pub fn category_abort(
        category: ErrorCategory,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        EngineError::PolicyAbort {
            policy: format!("{}-abort", category),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn manual(operation: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::ManualRequired {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, EngineError::PolicyAbort { .. })
    }
}
