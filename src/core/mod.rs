pub mod config;
pub mod entities;
pub mod error;
pub mod orchestrator;
pub mod performance;
pub mod recovery;
pub mod runner;
pub mod scheduler;
pub mod types;

pub use config::EngineConfig;
pub use entities::{
    CleanupAction, ErrorContext, ExecutionOptions, ExecutionResult, ExecutionTask, NamedOperation,
    Operation, OperationContext,
};
pub use error::EngineError;
pub use orchestrator::BatchOrchestrator;
pub use recovery::{classify, resolve, Classification, ErrorReport, ErrorReportLog, RecoveryAction};
pub use runner::OperationRunner;
pub use scheduler::{MemoryStats, TaskScheduler};
pub use types::*;
