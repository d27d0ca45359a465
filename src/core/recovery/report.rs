use crate::core::types::{ErrorCategory, ErrorSeverity, RecoveryDisposition, ResolutionOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// One classified failure and the recovery decision taken for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub id: Uuid,
    pub category: ErrorCategory,
    pub severity: ErrorSeverity,
    /// Operation the failure belongs to.
    pub operation: String,
    pub message: String,
    /// Recovery decision made when the report was opened.
    pub action: RecoveryDisposition,
    pub resolved: bool,
    pub outcome: Option<ResolutionOutcome>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Append-only in-memory log of error reports.
///
/// Reports are opened when a failure is classified and resolved exactly once
/// when recovery concludes. Persistence is the caller's concern; the engine
/// only retains reports until age-based cleanup removes them.
#[derive(Debug, Default)]
pub struct ErrorReportLog {
    reports: Mutex<Vec<ErrorReport>>,
}

impl ErrorReportLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a report for a freshly classified failure and return its id.
    pub fn open(
        &self,
        category: ErrorCategory,
        severity: ErrorSeverity,
        operation: &str,
        message: &str,
        action: RecoveryDisposition,
    ) -> Uuid {
        let report = ErrorReport {
            id: Uuid::new_v4(),
            category,
            severity,
            operation: operation.to_string(),
            message: message.to_string(),
            action,
            resolved: false,
            outcome: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        let id = report.id;
        self.guard().push(report);
        id
    }

    /// Mark a report resolved with the given outcome. Resolution is final:
    /// an already-resolved report is left untouched.
    pub fn resolve(&self, id: Uuid, outcome: ResolutionOutcome) {
        let mut reports = self.guard();
        if let Some(report) = reports.iter_mut().find(|r| r.id == id && !r.resolved) {
            report.resolved = true;
            report.outcome = Some(outcome);
            report.resolved_at = Some(Utc::now());
        }
    }

    /// Reports still awaiting resolution, oldest first.
    pub fn unresolved(&self) -> Vec<ErrorReport> {
        self.guard()
            .iter()
            .filter(|r| !r.resolved)
            .cloned()
            .collect()
    }

    /// Snapshot of the full log, oldest first.
    pub fn snapshot(&self) -> Vec<ErrorReport> {
        self.guard().clone()
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// Drop reports older than `max_age`, returning how many were removed.
    ///
    /// Unresolved reports past the cutoff indicate a runner that returned
    /// without settling its reports; they are removed as well but logged.
    pub fn cleanup_older_than(&self, max_age: std::time::Duration) -> usize {
        // A retention window longer than representable time keeps everything.
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return 0;
        };
        let mut reports = self.guard();
        let before = reports.len();
        let mut dropped_unresolved = 0usize;
        reports.retain(|report| {
            if report.created_at >= cutoff {
                return true;
            }
            if !report.resolved {
                dropped_unresolved += 1;
            }
            false
        });
        let removed = before - reports.len();
        drop(reports);
        if dropped_unresolved > 0 {
            tracing::warn!(
                count = dropped_unresolved,
                "removed aged error reports that were never resolved"
            );
        }
        removed
    }

    fn guard(&self) -> MutexGuard<'_, Vec<ErrorReport>> {
        self.reports.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
