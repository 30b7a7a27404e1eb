use serde::{Deserialize, Serialize};

use super::TaskStatus;

/// Number of tracked tasks per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl QueueCounts {
    pub(crate) fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::Processing => self.processing += 1,
            TaskStatus::Completed => self.completed += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.processing + self.completed + self.failed + self.cancelled
    }

    /// True when nothing is waiting for or holding a worker slot.
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }
}
