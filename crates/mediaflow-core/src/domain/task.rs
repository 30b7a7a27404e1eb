//! Task definition and the queue's authoritative task record.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Priority, TaskId, TaskStatus};

/// Opaque key/value mapping used for processor configs and results.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// What a caller submits: which processor to run, on what, with which settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Name of a processor registered in the `ProcessorRegistry`.
    pub processor: String,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    #[serde(default)]
    pub config: Payload,
}

impl TaskSpec {
    pub fn new(
        processor: impl Into<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            processor: processor.into(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            config: Payload::new(),
        }
    }

    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.config.insert(key.into(), value);
        self
    }
}

/// Metadata + spec for a task held by the queue.
///
/// Design:
/// - This is the "single source of truth" for task state.
/// - Queue structures (pending/running/finished) hold TaskId only.
/// - All state transitions happen here, and each one refuses to leave a
///   terminal state.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub spec: TaskSpec,
    pub status: TaskStatus,
    pub priority: Priority,

    /// Fraction done, clamped to [0.0, 1.0].
    pub progress: f64,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub result: Option<Payload>,
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn new(id: TaskId, spec: TaskSpec, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            id,
            spec,
            status: TaskStatus::Pending,
            priority,
            progress: 0.0,
            created_at: now,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    fn transition(&mut self, next: TaskStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        true
    }

    /// Pending -> Processing.
    pub fn mark_started(&mut self, now: DateTime<Utc>) -> bool {
        if !self.transition(TaskStatus::Processing) {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    /// Processing -> Completed. Progress is pinned to 1.0.
    pub fn mark_completed(&mut self, result: Payload, now: DateTime<Utc>) -> bool {
        if !self.transition(TaskStatus::Completed) {
            return false;
        }
        self.progress = 1.0;
        self.result = Some(result);
        self.completed_at = Some(now);
        true
    }

    /// Processing -> Failed.
    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.transition(TaskStatus::Failed) {
            return false;
        }
        self.error = Some(error.into());
        self.completed_at = Some(now);
        true
    }

    /// Pending | Processing -> Cancelled.
    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) -> bool {
        if !self.transition(TaskStatus::Cancelled) {
            return false;
        }
        self.completed_at = Some(now);
        true
    }

    /// Record a progress report and return the stored value.
    ///
    /// Out-of-range values are clamped, and reports lower than the current
    /// value are ignored. NaN counts as no progress. Only a Processing task
    /// accepts reports.
    pub fn update_progress(&mut self, progress: f64) -> f64 {
        if self.status == TaskStatus::Processing {
            let clamped = if progress.is_nan() {
                0.0
            } else {
                progress.clamp(0.0, 1.0)
            };
            self.progress = self.progress.max(clamped);
        }
        self.progress
    }

    /// Time spent processing: start to completion, or start to `now` while
    /// still running. `None` before the task starts.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Option<Duration> {
        let started = self.started_at?;
        let end = self.completed_at.unwrap_or(now);
        (end - started).to_std().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use ulid::Ulid;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(secs)
    }

    fn pending() -> TaskRecord {
        TaskRecord::new(
            TaskId::from_ulid(Ulid::new()),
            TaskSpec::new("simulate", "in.jpg", "out.jpg"),
            Priority::Normal,
            t(0),
        )
    }

    #[test]
    fn new_record_is_pending_without_timestamps() {
        let record = pending();
        assert_eq!(record.status, TaskStatus::Pending);
        assert_eq!(record.progress, 0.0);
        assert_eq!(record.created_at, t(0));
        assert!(record.started_at.is_none());
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn completion_sets_result_and_full_progress() {
        let mut record = pending();
        assert!(record.mark_started(t(1)));
        record.update_progress(0.4);

        let mut result = Payload::new();
        result.insert("processed_file".into(), "out.jpg".into());
        assert!(record.mark_completed(result.clone(), t(4)));

        assert_eq!(record.status, TaskStatus::Completed);
        assert_eq!(record.progress, 1.0);
        assert_eq!(record.result, Some(result));
        assert_eq!(record.started_at, Some(t(1)));
        assert_eq!(record.completed_at, Some(t(4)));
        assert_eq!(record.elapsed(t(100)), Some(Duration::from_secs(3)));
    }

    #[test]
    fn terminal_record_rejects_further_transitions() {
        let mut record = pending();
        record.mark_started(t(1));
        record.mark_failed("boom", t(2));

        assert!(!record.mark_completed(Payload::new(), t(3)));
        assert!(!record.mark_cancelled(t(3)));
        assert_eq!(record.status, TaskStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("boom"));
        assert_eq!(record.completed_at, Some(t(2)));
    }

    #[test]
    fn pending_cancel_does_not_set_started_at() {
        let mut record = pending();
        assert!(record.mark_cancelled(t(1)));
        assert!(record.started_at.is_none());
        assert_eq!(record.completed_at, Some(t(1)));
        assert!(!record.mark_started(t(2)));
    }

    #[rstest]
    #[case::negative(-0.5, 0.0)]
    #[case::over(1.7, 1.0)]
    #[case::nan(f64::NAN, 0.0)]
    #[case::inside(0.25, 0.25)]
    fn progress_is_clamped(#[case] reported: f64, #[case] stored: f64) {
        let mut record = pending();
        record.mark_started(t(1));
        assert_eq!(record.update_progress(reported), stored);
    }

    #[test]
    fn progress_never_goes_backwards() {
        let mut record = pending();
        record.mark_started(t(1));
        record.update_progress(0.6);
        assert_eq!(record.update_progress(0.3), 0.6);
    }

    #[test]
    fn progress_is_ignored_outside_processing() {
        let mut record = pending();
        assert_eq!(record.update_progress(0.5), 0.0);
    }

    #[test]
    fn elapsed_is_none_before_start_and_open_ended_while_running() {
        let mut record = pending();
        assert!(record.elapsed(t(10)).is_none());
        record.mark_started(t(2));
        assert_eq!(record.elapsed(t(7)), Some(Duration::from_secs(5)));
    }
}
