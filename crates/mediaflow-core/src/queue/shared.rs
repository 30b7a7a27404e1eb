//! State shared by the queue facade, the scheduling tick and the workers.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use super::context::ProgressListener;
use super::state::{Dispatch, QueueState};
use crate::config::QueueConfig;
use crate::domain::{Payload, QueueEvent, TaskId};
use crate::ports::{Clock, EventSink, IdGenerator, ProcessorError};
use crate::registry::ProcessorRegistry;

/// Holds the dispatch receiver while no pool runs. A running pool keeps the
/// lock for its whole lifetime.
pub(crate) type PoolSlot = Arc<Mutex<Option<mpsc::Receiver<Dispatch>>>>;

pub(crate) struct Shared {
    /// The single mutual-exclusion region around all queue state.
    pub(crate) state: Mutex<QueueState>,
    pub(crate) config: QueueConfig,
    pub(crate) registry: Arc<ProcessorRegistry>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) dispatch_tx: mpsc::Sender<Dispatch>,
    pub(crate) pool_slot: PoolSlot,
    /// Set when a dropped `SchedulerHandle` is still winding its pool down.
    pub(crate) stopping: AtomicBool,
}

impl Shared {
    /// Publish in transition order. Callers hold the state lock, so events of
    /// one task can never overtake each other.
    pub(crate) fn publish(&self, events: &[QueueEvent]) {
        for event in events {
            self.events.emit(event);
        }
    }

    /// One scheduling pass; returns how many tasks were dispatched.
    pub(crate) async fn schedule(&self) -> usize {
        let mut state = self.state.lock().await;
        if state.pending_len() == 0 {
            return 0;
        }
        let events =
            state.dispatch_ready(self.config.max_workers, &self.dispatch_tx, self.clock.now());
        self.publish(&events);
        drop(state);

        log_transitions(&events);
        let dispatched = events
            .iter()
            .filter(|e| matches!(e, QueueEvent::TaskStarted { .. }))
            .count();
        tracing::debug!(dispatched, "scheduling pass");
        dispatched
    }

    pub(crate) async fn finish(&self, task_id: TaskId, outcome: Result<Payload, ProcessorError>) {
        let mut state = self.state.lock().await;
        let events = state.finish(task_id, outcome, self.clock.now());
        self.publish(&events);
        drop(state);

        if events.is_empty() {
            tracing::debug!(%task_id, "outcome for a task that is not running; ignored");
        }
        log_transitions(&events);
    }
}

pub(crate) fn log_transitions(events: &[QueueEvent]) {
    for event in events {
        match event {
            QueueEvent::TaskStarted { task_id } => tracing::info!(%task_id, "task started"),
            QueueEvent::TaskCompleted { task_id, .. } => tracing::info!(%task_id, "task completed"),
            QueueEvent::TaskCancelled { task_id } => tracing::info!(%task_id, "task cancelled"),
            QueueEvent::TaskFailed { task_id, error } => {
                tracing::warn!(%task_id, %error, "task failed")
            }
            QueueEvent::QueueEmpty => tracing::debug!("queue drained"),
            QueueEvent::TaskAdded { .. } | QueueEvent::TaskProgress { .. } => {}
        }
    }
}

#[async_trait]
impl ProgressListener for Shared {
    async fn on_progress(&self, task_id: TaskId, fraction: f64) {
        let mut state = self.state.lock().await;
        if let Some(event) = state.progress(task_id, fraction) {
            tracing::trace!(%task_id, fraction, "progress");
            self.events.emit(&event);
        }
    }
}
