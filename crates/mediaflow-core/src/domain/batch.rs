//! Outcome summary for a group of tasks submitted together.

use std::path::PathBuf;

use serde::Serialize;

use super::{QueueCounts, TaskId, TaskRecord, TaskStatus};

/// An input that did not produce a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub task_id: TaskId,
    pub input_path: PathBuf,
    pub status: TaskStatus,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub counts: QueueCounts,
    /// Input paths of Completed tasks, in submission order.
    pub succeeded: Vec<PathBuf>,
    /// Failed and Cancelled tasks, in submission order.
    pub failed: Vec<BatchFailure>,
    /// Ids the queue no longer tracks (cleared, or never submitted).
    pub unknown: usize,
}

impl BatchSummary {
    pub(crate) fn push(&mut self, task_id: TaskId, record: Option<&TaskRecord>) {
        let Some(record) = record else {
            self.unknown += 1;
            return;
        };
        self.counts.record(record.status);
        match record.status {
            TaskStatus::Completed => self.succeeded.push(record.spec.input_path.clone()),
            TaskStatus::Failed | TaskStatus::Cancelled => self.failed.push(BatchFailure {
                task_id,
                input_path: record.spec.input_path.clone(),
                status: record.status,
                error: record.error.clone(),
            }),
            TaskStatus::Pending | TaskStatus::Processing => {}
        }
    }

    /// True once no task of the batch is Pending or Processing.
    pub fn is_finished(&self) -> bool {
        self.counts.pending == 0 && self.counts.processing == 0
    }
}
