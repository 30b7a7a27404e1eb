//! TaskQueue - 呼び出し側に見える API
//!
//! Caller-facing operations. Each one takes the queue lock once, records the
//! transition, publishes the resulting events and returns.

use std::path::PathBuf;
use std::sync::Arc;

use super::builder::TaskQueueBuilder;
use super::scheduler::SchedulerHandle;
use super::shared::{Shared, log_transitions};
use crate::config::QueueConfig;
use crate::domain::{
    BatchSummary, Payload, Priority, QueueCounts, TaskId, TaskRecord, TaskSpec, TaskStatus,
};
use crate::error::MediaflowError;
use crate::registry::ProcessorRegistry;

/// Priority task queue backed by a bounded worker pool.
///
/// Cloning is cheap; every clone talks to the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    pub(crate) shared: Arc<Shared>,
}

impl TaskQueue {
    pub fn builder(registry: ProcessorRegistry) -> TaskQueueBuilder {
        TaskQueueBuilder::new(registry)
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        &self.shared.registry
    }

    /// Store a new Pending task and emit `TaskAdded`. Never waits for a worker.
    pub async fn submit(&self, spec: TaskSpec, priority: Priority) -> TaskId {
        let task_id = self.shared.ids.generate_task_id();
        let processor = spec.processor.clone();

        let mut state = self.shared.state.lock().await;
        let events = state.submit(task_id, spec, priority, self.shared.clock.now());
        self.shared.publish(&events);
        drop(state);

        tracing::info!(%task_id, %processor, ?priority, "task submitted");
        task_id
    }

    /// Submit a short, latency-sensitive preview task ahead of batch work.
    pub async fn submit_preview(&self, spec: TaskSpec) -> TaskId {
        self.submit(spec, Priority::High).await
    }

    /// Submit one task per `(input, output)` pair, all for `processor` with the
    /// same `config`. Fails without submitting anything if the processor is
    /// not registered.
    pub async fn submit_batch<I, P, Q>(
        &self,
        processor: &str,
        config: &Payload,
        files: I,
        priority: Priority,
    ) -> Result<Vec<TaskId>, MediaflowError>
    where
        I: IntoIterator<Item = (P, Q)>,
        P: Into<PathBuf>,
        Q: Into<PathBuf>,
    {
        self.shared.registry.resolve(processor)?;

        let mut ids = Vec::new();
        for (input, output) in files {
            let mut spec = TaskSpec::new(processor, input, output);
            spec.config = config.clone();
            ids.push(self.submit(spec, priority).await);
        }
        tracing::info!(%processor, tasks = ids.len(), "batch submitted");
        Ok(ids)
    }

    /// Where each task of a batch stands, with per-input outcomes.
    pub async fn batch_summary(&self, task_ids: &[TaskId]) -> BatchSummary {
        let state = self.shared.state.lock().await;
        let mut summary = BatchSummary::default();
        for task_id in task_ids {
            summary.push(*task_id, state.record(*task_id));
        }
        summary
    }

    /// Cancel a task.
    ///
    /// - Pending: becomes Cancelled right away; returns true.
    /// - Processing: the cancellation flag is set and true is returned. The
    ///   task ends when its processor notices, or runs to completion if it
    ///   never checks.
    /// - Unknown or terminal: returns false.
    pub async fn cancel(&self, task_id: TaskId) -> bool {
        let mut state = self.shared.state.lock().await;
        let (accepted, events) = state.cancel(task_id, self.shared.clock.now());
        self.shared.publish(&events);
        drop(state);

        if accepted {
            tracing::info!(%task_id, "cancel requested");
        }
        log_transitions(&events);
        accepted
    }

    /// `None` for unknown (or cleared) ids.
    pub async fn status(&self, task_id: TaskId) -> Option<TaskStatus> {
        let state = self.shared.state.lock().await;
        state.record(task_id).map(|r| r.status)
    }

    /// `0.0` for unknown (or cleared) ids.
    pub async fn progress(&self, task_id: TaskId) -> f64 {
        let state = self.shared.state.lock().await;
        state.record(task_id).map_or(0.0, |r| r.progress)
    }

    /// Snapshot of a task's record.
    pub async fn task(&self, task_id: TaskId) -> Option<TaskRecord> {
        let state = self.shared.state.lock().await;
        state.record(task_id).cloned()
    }

    pub async fn counts(&self) -> QueueCounts {
        let state = self.shared.state.lock().await;
        state.counts()
    }

    /// Forget Completed tasks. Returns how many were dropped.
    pub async fn clear_completed(&self) -> usize {
        let cleared = self.shared.state.lock().await.clear_completed();
        tracing::debug!(cleared, "cleared completed tasks");
        cleared
    }

    /// Forget Failed and Cancelled tasks. Returns how many were dropped.
    pub async fn clear_failed(&self) -> usize {
        let cleared = self.shared.state.lock().await.clear_failed();
        tracing::debug!(cleared, "cleared failed tasks");
        cleared
    }

    /// Run one scheduling pass now; returns how many tasks were dispatched.
    ///
    /// The periodic tick started by `start` calls this too.
    pub async fn schedule(&self) -> usize {
        self.shared.schedule().await
    }

    /// Start the worker pool and the periodic scheduling tick.
    ///
    /// Until a pool is running, `schedule` dispatches nothing and submitted
    /// tasks stay Pending.
    pub async fn start(&self) -> Result<SchedulerHandle, MediaflowError> {
        SchedulerHandle::spawn(&self.shared, true).await
    }

    /// Start only the worker pool; the caller drives `schedule`.
    pub async fn start_manual(&self) -> Result<SchedulerHandle, MediaflowError> {
        SchedulerHandle::spawn(&self.shared, false).await
    }
}
