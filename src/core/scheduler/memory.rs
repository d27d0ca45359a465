use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Point-in-time view of the scheduler's memory accounting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryStats {
    pub current_usage_mb: u64,
    pub peak_usage_mb: u64,
    pub active_tasks: usize,
    pub queued_tasks: usize,
    pub reclamations: u64,
}

#[derive(Debug, Default)]
struct TrackerState {
    running: HashMap<String, u64>,
    peak_mb: u64,
    queued: usize,
    reclamations: u64,
}

/// Declared-cost memory accounting for scheduled tasks.
///
/// Usage is the configured baseline plus the sum of the declared footprints
/// of currently running tasks. The tracker never samples the process; tasks
/// are charged what they declared for as long as they run.
#[derive(Debug)]
pub struct MemoryTracker {
    baseline_mb: u64,
    threshold_mb: u64,
    inner: Mutex<TrackerState>,
}

impl MemoryTracker {
    pub fn new(baseline_mb: u64, threshold_mb: u64) -> Self {
        MemoryTracker {
            baseline_mb,
            threshold_mb,
            inner: Mutex::new(TrackerState {
                peak_mb: baseline_mb,
                ..TrackerState::default()
            }),
        }
    }

    /// Charge a task's declared footprint while it runs.
    pub fn reserve(&self, task_id: &str, memory_mb: u64) {
        let mut state = self.guard();
        state.running.insert(task_id.to_string(), memory_mb);
        let usage = self.baseline_mb + state.running.values().sum::<u64>();
        state.peak_mb = state.peak_mb.max(usage);
    }

    /// Release a task's charge once it resolves.
    pub fn release(&self, task_id: &str) {
        self.guard().running.remove(task_id);
    }

    pub fn set_queued(&self, queued: usize) {
        self.guard().queued = queued;
    }

    pub fn current_usage_mb(&self) -> u64 {
        let state = self.guard();
        self.baseline_mb + state.running.values().sum::<u64>()
    }

    /// Usage as a fraction of the threshold. A zero threshold reads as
    /// fully saturated.
    pub fn usage_ratio(&self) -> f64 {
        if self.threshold_mb == 0 {
            return 1.0;
        }
        self.current_usage_mb() as f64 / self.threshold_mb as f64
    }

    pub fn record_reclamation(&self) {
        self.guard().reclamations += 1;
    }

    pub fn threshold_mb(&self) -> u64 {
        self.threshold_mb
    }

    pub fn stats(&self) -> MemoryStats {
        let state = self.guard();
        MemoryStats {
            current_usage_mb: self.baseline_mb + state.running.values().sum::<u64>(),
            peak_usage_mb: state.peak_mb,
            active_tasks: state.running.len(),
            queued_tasks: state.queued,
            reclamations: state.reclamations,
        }
    }

    fn guard(&self) -> MutexGuard<'_, TrackerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
