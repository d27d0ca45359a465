pub mod classifier;
pub mod policy;
pub mod report;

pub use classifier::{classify, Classification};
pub use policy::{backoff_delay, resolve, RecoveryAction};
pub use report::{ErrorReport, ErrorReportLog};
