//! Task lifecycle state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a task.
///
/// State transitions:
/// - Pending -> Processing -> Completed
/// - Pending -> Processing -> Failed
/// - Pending -> Processing -> Cancelled (cooperative, once the processor gives up)
/// - Pending -> Cancelled
///
/// Nothing leaves a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in the pending set for a worker slot.
    Pending,

    /// Dispatched to a worker.
    Processing,

    /// The processor returned a result.
    Completed,

    /// The processor returned an error or panicked.
    Failed,

    /// Cancelled before dispatch, or acknowledged by the processor while running.
    Cancelled,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }
}
