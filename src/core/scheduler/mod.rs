pub mod memory;

pub use memory::{MemoryStats, MemoryTracker};

use crate::core::config::{EngineConfig, SchedulerConfig};
use crate::core::entities::{ExecutionResult, ExecutionTask};
use crate::core::error::EngineError;
use crate::core::performance::{PerformanceStats, TimingHistory};
use crate::core::recovery::ErrorReportLog;
use crate::core::runner::{FallbackRegistry, OperationRunner};
use crate::core::types::{TaskPriority, TaskStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerPhase {
    Running,
    Draining,
    Force,
}

/// Priority-ordered, memory-bounded task scheduler.
///
/// Tasks are sorted by priority, partitioned into batches whose combined
/// declared memory stays under a fraction of the threshold, and fanned out
/// concurrently per batch. A background monitor watches the declared-cost
/// gauge, reclaims caches under pressure, and sheds queued low-priority work
/// when demand exceeds capacity. Every submitted task resolves to exactly
/// one [`ExecutionResult`], shutdown included.
///
/// Must be constructed inside a Tokio runtime; the monitor task is spawned
/// immediately.
pub struct TaskScheduler {
    runner: Arc<OperationRunner>,
    tracker: Arc<MemoryTracker>,
    config: SchedulerConfig,
    report_retention: Duration,
    shutdown_tx: watch::Sender<SchedulerPhase>,
    shutdown_rx: watch::Receiver<SchedulerPhase>,
    monitor: Mutex<Option<JoinHandle<()>>>,
    shed_low: Arc<AtomicBool>,
}

impl TaskScheduler {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_runner(Arc::new(OperationRunner::new(config)), config)
    }

    /// Build a scheduler around an existing runner, sharing its fallback
    /// registry, duration history, and error reports.
    pub fn with_runner(runner: Arc<OperationRunner>, config: &EngineConfig) -> Self {
        let scheduler_config = config.scheduler.clone();
        let tracker = Arc::new(MemoryTracker::new(
            scheduler_config.baseline_memory_mb,
            scheduler_config.memory_threshold_mb,
        ));
        let (shutdown_tx, shutdown_rx) = watch::channel(SchedulerPhase::Running);
        let shed_low = Arc::new(AtomicBool::new(false));
        let report_retention = config.recovery.report_retention();
        let monitor = spawn_monitor(
            Arc::clone(&tracker),
            runner.history(),
            runner.reports(),
            Arc::clone(&shed_low),
            shutdown_rx.clone(),
            &scheduler_config,
            report_retention,
        );

        TaskScheduler {
            runner,
            tracker,
            config: scheduler_config,
            report_retention,
            shutdown_tx,
            shutdown_rx,
            monitor: Mutex::new(Some(monitor)),
            shed_low,
        }
    }

    /// Execute a set of tasks, returning one result per task.
    ///
    /// Results come back in execution order: priority first, declared memory
    /// ascending within a priority. Tasks submitted after shutdown began are
    /// cancelled without running.
    pub async fn execute_parallel(&self, tasks: Vec<ExecutionTask>) -> Vec<ExecutionResult> {
        if tasks.is_empty() {
            return Vec::new();
        }

        if self.is_shutting_down() {
            let mut results = Vec::with_capacity(tasks.len());
            for task in &tasks {
                results.push(
                    self.conclude(
                        task,
                        ExecutionResult::cancelled(&task.id, EngineError::ShuttingDown.to_string()),
                    )
                    .await,
                );
            }
            return results;
        }

        let total_declared: u64 = tasks.iter().map(|t| t.memory_limit_mb).sum();
        if total_declared > self.tracker.threshold_mb() {
            tracing::info!(
                total_declared_mb = total_declared,
                threshold_mb = self.tracker.threshold_mb(),
                "declared demand exceeds memory threshold; reclaiming before batching"
            );
            self.reclaim_now();
        }

        let mut tasks = tasks;
        tasks.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.memory_limit_mb.cmp(&b.memory_limit_mb))
        });

        let ceiling = batch_memory_ceiling(
            self.tracker.threshold_mb(),
            self.config.batch_memory_ratio,
        );
        let batches = partition_into_batches(tasks, ceiling, self.config.max_concurrency);
        let mut queued: usize = batches.iter().map(Vec::len).sum();
        let mut results = Vec::with_capacity(queued);

        for (index, batch) in batches.into_iter().enumerate() {
            queued -= batch.len();
            self.tracker.set_queued(queued);

            if self.is_shutting_down() {
                for task in &batch {
                    results.push(
                        self.conclude(
                            task,
                            ExecutionResult::cancelled(
                                &task.id,
                                EngineError::ShuttingDown.to_string(),
                            ),
                        )
                        .await,
                    );
                }
                continue;
            }

            if index > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.inter_batch_pause_ms)).await;
                if self.tracker.usage_ratio() > self.config.reclaim_ratio {
                    self.reclaim_now();
                }
            }

            tracing::debug!(
                batch = index,
                tasks = batch.len(),
                declared_mb = batch.iter().map(|t| t.memory_limit_mb).sum::<u64>(),
                "executing batch"
            );
            let futures: Vec<_> = batch.iter().map(|task| self.run_one(task)).collect();
            results.extend(futures::future::join_all(futures).await);
        }

        self.tracker.set_queued(0);
        results
    }

    /// Stop accepting work, give in-flight tasks a grace period, then force
    /// cancellation. Idempotent: later calls return immediately.
    pub async fn shutdown(&self) {
        let previous = self.shutdown_tx.send_replace(SchedulerPhase::Draining);
        if previous == SchedulerPhase::Force {
            // A completed shutdown stays final.
            self.shutdown_tx.send_replace(SchedulerPhase::Force);
            return;
        }
        if previous == SchedulerPhase::Running {
            tracing::info!("scheduler draining; waiting for in-flight tasks");
        }

        let deadline = Instant::now() + Duration::from_millis(self.config.shutdown_grace_ms);
        loop {
            if self.tracker.stats().active_tasks == 0 {
                break;
            }
            if Instant::now() >= deadline {
                tracing::warn!("shutdown grace elapsed; forcing cancellation");
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }

        self.shutdown_tx.send_replace(SchedulerPhase::Force);

        let handle = self
            .monitor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        tracing::info!("scheduler shut down");
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow() != SchedulerPhase::Running
    }

    pub fn memory_stats(&self) -> MemoryStats {
        self.tracker.stats()
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        self.runner.history().stats()
    }

    /// Drop resolved error reports older than `max_age`, returning the count.
    pub fn cleanup_error_log(&self, max_age: Duration) -> usize {
        self.runner.reports().cleanup_older_than(max_age)
    }

    pub fn trim_history(&self) {
        self.runner.history().trim();
    }

    pub fn fallbacks(&self) -> Arc<FallbackRegistry> {
        self.runner.fallbacks()
    }

    pub fn error_reports(&self) -> Arc<ErrorReportLog> {
        self.runner.reports()
    }

    pub fn runner(&self) -> Arc<OperationRunner> {
        Arc::clone(&self.runner)
    }

    async fn run_one(&self, task: &ExecutionTask) -> ExecutionResult {
        if self.shed_low.load(Ordering::SeqCst) && task.priority == TaskPriority::Low {
            tracing::warn!(
                task_id = %task.id,
                "shedding low-priority task under memory pressure"
            );
            return self
                .conclude(
                    task,
                    ExecutionResult::cancelled(&task.id, "cancelled under memory pressure"),
                )
                .await;
        }

        let mut force_rx = self.shutdown_rx.clone();
        self.tracker.reserve(&task.id, task.memory_limit_mb);

        let run = self.runner.run_task(task);
        tokio::pin!(run);
        let outcome = tokio::select! {
            result = &mut run => Some(result),
            _ = wait_for_force(&mut force_rx) => None,
        };

        self.tracker.release(&task.id);

        let mut result = match outcome {
            Some(Ok(result)) => result,
            Some(Err(err)) => engine_error_result(&task.id, &err),
            None => {
                tracing::warn!(task_id = %task.id, "task cancelled by forced shutdown");
                ExecutionResult::cancelled(&task.id, "cancelled by forced shutdown")
            }
        };
        result.memory_delta_mb = task.memory_limit_mb as i64;
        self.conclude(task, result).await
    }

    /// Every path a submitted task can take (run, shed, shutdown rejection,
    /// forced cancellation) resolves through exactly one `conclude` call, so
    /// the cleanup action fires once per task instance.
    async fn conclude(&self, task: &ExecutionTask, result: ExecutionResult) -> ExecutionResult {
        self.run_cleanup(task).await;
        result
    }

    async fn run_cleanup(&self, task: &ExecutionTask) {
        let Some(cleanup) = task.cleanup.as_ref() else {
            return;
        };
        if let Err(err) = cleanup.cleanup(&task.id).await {
            tracing::warn!(task_id = %task.id, error = %format!("{err:#}"), "cleanup action failed");
        }
    }

    fn reclaim_now(&self) {
        reclaim(
            &self.tracker,
            &self.runner.history(),
            &self.runner.reports(),
            self.report_retention,
        );
    }
}

/// Map a fatal runner error onto the task's terminal result.
fn engine_error_result(task_id: &str, err: &EngineError) -> ExecutionResult {
    match err {
        EngineError::ManualRequired { .. } => {
            let mut result = ExecutionResult::failed(task_id, err.to_string());
            result.status = TaskStatus::Manual;
            result
        }
        EngineError::ShuttingDown => ExecutionResult::cancelled(task_id, err.to_string()),
        other => ExecutionResult::failed(task_id, other.to_string()),
    }
}

/// Resolve only when the scheduler enters forced shutdown.
async fn wait_for_force(rx: &mut watch::Receiver<SchedulerPhase>) {
    loop {
        if *rx.borrow() == SchedulerPhase::Force {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone without forcing; stay pending so the task side of
            // the race always wins.
            futures::future::pending::<()>().await;
        }
    }
}

fn batch_memory_ceiling(threshold_mb: u64, ratio: f64) -> u64 {
    (threshold_mb as f64 * ratio).round() as u64
}

/// Greedy partition preserving order: a batch closes when adding the next
/// task would exceed the memory ceiling or the concurrency width. A task
/// declaring more than the ceiling runs alone.
fn partition_into_batches(
    tasks: Vec<ExecutionTask>,
    memory_ceiling_mb: u64,
    max_concurrency: usize,
) -> Vec<Vec<ExecutionTask>> {
    let max_concurrency = max_concurrency.max(1);
    let mut batches = Vec::new();
    let mut current: Vec<ExecutionTask> = Vec::new();
    let mut current_mb: u64 = 0;

    for task in tasks {
        let fits_memory =
            current.is_empty() || current_mb + task.memory_limit_mb <= memory_ceiling_mb;
        let fits_width = current.len() < max_concurrency;
        if !(fits_memory && fits_width) {
            batches.push(std::mem::take(&mut current));
            current_mb = 0;
        }
        current_mb += task.memory_limit_mb;
        current.push(task);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[allow(clippy::too_many_arguments)]
fn spawn_monitor(
    tracker: Arc<MemoryTracker>,
    history: Arc<TimingHistory>,
    reports: Arc<ErrorReportLog>,
    shed_low: Arc<AtomicBool>,
    mut shutdown_rx: watch::Receiver<SchedulerPhase>,
    config: &SchedulerConfig,
    report_retention: Duration,
) -> JoinHandle<()> {
    let interval = Duration::from_millis(config.monitor_interval_ms.max(1));
    let reclaim_ratio = config.reclaim_ratio;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let ratio = tracker.usage_ratio();
                    if ratio >= reclaim_ratio {
                        tracing::debug!(ratio, "memory pressure at or above reclaim ratio");
                        reclaim(&tracker, &history, &reports, report_retention);
                    }
                    shed_low.store(ratio > 1.0, Ordering::SeqCst);
                }
                changed = shutdown_rx.changed() => {
                    match changed {
                        Ok(()) => {
                            if *shutdown_rx.borrow_and_update() == SchedulerPhase::Force {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
            }
        }
    })
}

fn reclaim(
    tracker: &MemoryTracker,
    history: &TimingHistory,
    reports: &ErrorReportLog,
    retention: Duration,
) {
    history.trim();
    let dropped = reports.cleanup_older_than(retention);
    tracker.record_reclamation();
    tracing::debug!(reports_dropped = dropped, "trimmed duration history and aged error reports");
}
