use crate::core::types::HealthLevel;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Samples retained per operation name.
const HISTORY_CAPACITY: usize = 20;

/// Rolling per-operation duration history.
///
/// Only the most recent [`HISTORY_CAPACITY`] samples per operation are kept,
/// so long-running processes adapt to current behavior instead of averaging
/// over their whole lifetime.
#[derive(Debug, Default)]
pub struct TimingHistory {
    samples: DashMap<String, VecDeque<u64>>,
}

impl TimingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the duration of a successful run of `operation`.
    pub fn record(&self, operation: &str, duration: Duration) {
        let mut entry = self.samples.entry(operation.to_string()).or_default();
        entry.push_back(duration.as_millis() as u64);
        while entry.len() > HISTORY_CAPACITY {
            entry.pop_front();
        }
    }

    /// Average duration over the retained samples for `operation`.
    pub fn average(&self, operation: &str) -> Option<Duration> {
        let entry = self.samples.get(operation)?;
        if entry.is_empty() {
            return None;
        }
        let total: u64 = entry.iter().sum();
        Some(Duration::from_millis(total / entry.len() as u64))
    }

    pub fn sample_count(&self, operation: &str) -> usize {
        self.samples
            .get(operation)
            .map(|entry| entry.len())
            .unwrap_or(0)
    }

    /// Drop the older half of every operation's samples. Used by memory
    /// reclamation to shrink engine-owned caches without losing adaptivity.
    pub fn trim(&self) {
        for mut entry in self.samples.iter_mut() {
            let keep = entry.len() / 2;
            while entry.len() > keep {
                entry.pop_front();
            }
        }
        self.samples.retain(|_, samples| !samples.is_empty());
    }

    pub fn clear(&self) {
        self.samples.clear();
    }

    /// Aggregate per-operation averages plus a health rollup.
    pub fn stats(&self) -> PerformanceStats {
        let mut operations: Vec<OperationTiming> = self
            .samples
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| {
                let total: u64 = entry.value().iter().sum();
                OperationTiming {
                    operation: entry.key().clone(),
                    average_ms: total / entry.value().len() as u64,
                    samples: entry.value().len(),
                }
            })
            .collect();
        operations.sort_by(|a, b| a.operation.cmp(&b.operation));

        let slowest = operations.iter().map(|op| op.average_ms).max().unwrap_or(0);
        PerformanceStats {
            health: health_from_slowest(slowest),
            operations,
        }
    }
}

/// Average timing for a single operation name.
#[derive(Debug, Clone, Serialize)]
pub struct OperationTiming {
    pub operation: String,
    pub average_ms: u64,
    pub samples: usize,
}

/// Snapshot of engine timing behavior.
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceStats {
    pub operations: Vec<OperationTiming>,
    pub health: HealthLevel,
}

impl PerformanceStats {
    /// One-line human summary, suitable for status log lines.
    pub fn describe(&self) -> String {
        if self.operations.is_empty() {
            return format!("health={} (no samples)", self.health);
        }
        let parts: Vec<String> = self
            .operations
            .iter()
            .map(|op| {
                format!(
                    "{} avg {} over {} samples",
                    op.operation,
                    humantime::format_duration(Duration::from_millis(op.average_ms)),
                    op.samples
                )
            })
            .collect();
        format!("health={} {}", self.health, parts.join(", "))
    }
}

fn health_from_slowest(slowest_average_ms: u64) -> HealthLevel {
    match slowest_average_ms {
        0..=999 => HealthLevel::Optimal,
        1000..=4999 => HealthLevel::Good,
        5000..=14999 => HealthLevel::Warning,
        _ => HealthLevel::Critical,
    }
}
