//! Lifecycle events the queue publishes to its `EventSink`.

use serde::Serialize;

use super::{Payload, TaskId};

/// Scale used for `TaskProgress::total`.
pub const PROGRESS_SCALE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    TaskAdded { task_id: TaskId },
    TaskStarted { task_id: TaskId },
    TaskProgress { task_id: TaskId, current: u32, total: u32 },
    TaskCompleted { task_id: TaskId, result: Payload },
    TaskFailed { task_id: TaskId, error: String },
    TaskCancelled { task_id: TaskId },
    QueueEmpty,
}

/// Discriminant of a `QueueEvent`, used as a subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TaskAdded,
    TaskStarted,
    TaskProgress,
    TaskCompleted,
    TaskFailed,
    TaskCancelled,
    QueueEmpty,
}

impl QueueEvent {
    pub(crate) fn progress(task_id: TaskId, fraction: f64) -> Self {
        let current = (fraction * f64::from(PROGRESS_SCALE)).round() as u32;
        QueueEvent::TaskProgress {
            task_id,
            current: current.min(PROGRESS_SCALE),
            total: PROGRESS_SCALE,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            QueueEvent::TaskAdded { .. } => EventKind::TaskAdded,
            QueueEvent::TaskStarted { .. } => EventKind::TaskStarted,
            QueueEvent::TaskProgress { .. } => EventKind::TaskProgress,
            QueueEvent::TaskCompleted { .. } => EventKind::TaskCompleted,
            QueueEvent::TaskFailed { .. } => EventKind::TaskFailed,
            QueueEvent::TaskCancelled { .. } => EventKind::TaskCancelled,
            QueueEvent::QueueEmpty => EventKind::QueueEmpty,
        }
    }

    /// The task this event is about, if any.
    pub fn task_id(&self) -> Option<TaskId> {
        match self {
            QueueEvent::TaskAdded { task_id }
            | QueueEvent::TaskStarted { task_id }
            | QueueEvent::TaskProgress { task_id, .. }
            | QueueEvent::TaskCompleted { task_id, .. }
            | QueueEvent::TaskFailed { task_id, .. }
            | QueueEvent::TaskCancelled { task_id } => Some(*task_id),
            QueueEvent::QueueEmpty => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind(),
            EventKind::TaskCompleted | EventKind::TaskFailed | EventKind::TaskCancelled
        )
    }
}
