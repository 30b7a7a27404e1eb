//! Queue bookkeeping. Every method runs under the queue lock and returns the
//! events the caller publishes before releasing it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::context::{CancelHandle, CancelToken, cancel_pair};
use super::pending::PendingSet;
use crate::domain::{
    Payload, Priority, QueueCounts, QueueEvent, TaskId, TaskRecord, TaskSpec, TaskStatus,
};
use crate::ports::ProcessorError;

/// A task handed to the worker pool.
#[derive(Debug)]
pub(crate) struct Dispatch {
    pub(crate) task_id: TaskId,
    pub(crate) spec: TaskSpec,
    pub(crate) cancel: CancelToken,
}

pub(crate) struct QueueState {
    /// All task records (single source of truth).
    records: HashMap<TaskId, TaskRecord>,

    /// Pending queue (TaskIds only).
    pending: PendingSet,

    /// Processing tasks and their cancellation flags.
    running: HashMap<TaskId, CancelHandle>,

    /// Completed bookkeeping, dropped by `clear_completed`.
    completed: HashSet<TaskId>,

    /// Failed and Cancelled bookkeeping, dropped by `clear_failed`.
    failed: HashSet<TaskId>,

    /// Whether `QueueEmpty` was already sent for the current idle period.
    drained: bool,

    /// Whether a worker pool is consuming dispatches. Nothing is dispatched
    /// while this is false.
    pool_running: bool,
}

impl QueueState {
    pub(crate) fn new() -> Self {
        Self {
            records: HashMap::new(),
            pending: PendingSet::default(),
            running: HashMap::new(),
            completed: HashSet::new(),
            failed: HashSet::new(),
            drained: true,
            pool_running: false,
        }
    }

    pub(crate) fn set_pool_running(&mut self, running: bool) {
        self.pool_running = running;
    }

    pub(crate) fn submit(
        &mut self,
        task_id: TaskId,
        spec: TaskSpec,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Vec<QueueEvent> {
        let record = TaskRecord::new(task_id, spec, priority, now);
        self.records.insert(task_id, record);
        self.pending.push(task_id, priority);
        self.drained = false;
        vec![QueueEvent::TaskAdded { task_id }]
    }

    /// Dispatch pending tasks while free slots remain. Does nothing unless a
    /// worker pool is running.
    ///
    /// `tx` has room for `max_workers` entries and at most `running.len()`
    /// entries are ever queued in it, so `try_send` only fails once the
    /// receiver is gone.
    pub(crate) fn dispatch_ready(
        &mut self,
        max_workers: usize,
        tx: &mpsc::Sender<Dispatch>,
        now: DateTime<Utc>,
    ) -> Vec<QueueEvent> {
        let mut events = Vec::new();
        if !self.pool_running {
            return events;
        }
        while self.running.len() < max_workers {
            let Some(task_id) = self.pending.pop() else {
                break;
            };
            let Some(record) = self.records.get_mut(&task_id) else {
                continue;
            };
            if !record.mark_started(now) {
                continue;
            }

            let (handle, token) = cancel_pair();
            let dispatch = Dispatch {
                task_id,
                spec: record.spec.clone(),
                cancel: token,
            };
            self.running.insert(task_id, handle);
            events.push(QueueEvent::TaskStarted { task_id });

            if let Err(err) = tx.try_send(dispatch) {
                tracing::warn!(%task_id, error = %err, "worker pool rejected dispatch");
                let outcome = Err(ProcessorError::failed("worker pool is not accepting work"));
                events.extend(self.finish(task_id, outcome, now));
            }
        }
        self.check_drained(&mut events);
        events
    }

    /// Record the outcome of a Processing task.
    pub(crate) fn finish(
        &mut self,
        task_id: TaskId,
        outcome: Result<Payload, ProcessorError>,
        now: DateTime<Utc>,
    ) -> Vec<QueueEvent> {
        let mut events = Vec::new();
        if self.running.remove(&task_id).is_none() {
            return events;
        }
        let Some(record) = self.records.get_mut(&task_id) else {
            return events;
        };

        match outcome {
            Ok(result) => {
                if record.mark_completed(result.clone(), now) {
                    self.completed.insert(task_id);
                    events.push(QueueEvent::TaskCompleted { task_id, result });
                }
            }
            Err(ProcessorError::Cancelled) => {
                if record.mark_cancelled(now) {
                    self.failed.insert(task_id);
                    events.push(QueueEvent::TaskCancelled { task_id });
                }
            }
            Err(err) => {
                let error = err.to_string();
                if record.mark_failed(error.clone(), now) {
                    self.failed.insert(task_id);
                    events.push(QueueEvent::TaskFailed { task_id, error });
                }
            }
        }

        self.check_drained(&mut events);
        events
    }

    /// Returns whether the request was accepted, and the events to publish.
    pub(crate) fn cancel(&mut self, task_id: TaskId, now: DateTime<Utc>) -> (bool, Vec<QueueEvent>) {
        let mut events = Vec::new();
        let Some(status) = self.records.get(&task_id).map(|r| r.status) else {
            return (false, events);
        };

        match status {
            TaskStatus::Pending => {
                self.pending.remove(task_id);
                if let Some(record) = self.records.get_mut(&task_id)
                    && record.mark_cancelled(now)
                {
                    self.failed.insert(task_id);
                    events.push(QueueEvent::TaskCancelled { task_id });
                }
                self.check_drained(&mut events);
                (true, events)
            }
            TaskStatus::Processing => match self.running.get(&task_id) {
                Some(handle) => {
                    handle.cancel();
                    (true, events)
                }
                None => (false, events),
            },
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled => (false, events),
        }
    }

    /// Store a progress report; returns the event to publish, if any.
    pub(crate) fn progress(&mut self, task_id: TaskId, fraction: f64) -> Option<QueueEvent> {
        let record = self.records.get_mut(&task_id)?;
        if record.status != TaskStatus::Processing {
            return None;
        }
        let stored = record.update_progress(fraction);
        Some(QueueEvent::progress(task_id, stored))
    }

    pub(crate) fn clear_completed(&mut self) -> usize {
        Self::evict(&mut self.records, &mut self.completed)
    }

    pub(crate) fn clear_failed(&mut self) -> usize {
        Self::evict(&mut self.records, &mut self.failed)
    }

    fn evict(records: &mut HashMap<TaskId, TaskRecord>, ids: &mut HashSet<TaskId>) -> usize {
        let count = ids.len();
        for task_id in ids.drain() {
            records.remove(&task_id);
        }
        count
    }

    pub(crate) fn record(&self, task_id: TaskId) -> Option<&TaskRecord> {
        self.records.get(&task_id)
    }

    pub(crate) fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values() {
            counts.record(record.status);
        }
        counts
    }

    #[cfg(test)]
    pub(crate) fn running_len(&self) -> usize {
        self.running.len()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn check_drained(&mut self, events: &mut Vec<QueueEvent>) {
        if !self.drained && self.pending.is_empty() && self.running.is_empty() {
            self.drained = true;
            events.push(QueueEvent::QueueEmpty);
        }
    }
}
