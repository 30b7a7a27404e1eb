//! What a processor sees while it runs: the task, a progress callback and a
//! cooperative cancellation flag.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{Payload, TaskId, TaskSpec};

/// Create a linked cancellation handle (queue side) and token (worker side).
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

/// Sets the cancellation flag of one running task.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace works even when every token is gone
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Read side of the cancellation flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled.
    pub fn never() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested. Never resolves if the handle
    /// is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        let seen = rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if seen.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Receives progress reports from running tasks.
#[async_trait]
pub trait ProgressListener: Send + Sync {
    async fn on_progress(&self, task_id: TaskId, fraction: f64);
}

struct Discard;

#[async_trait]
impl ProgressListener for Discard {
    async fn on_progress(&self, _task_id: TaskId, _fraction: f64) {}
}

/// Progress callback handed to a processor.
#[derive(Clone)]
pub struct ProgressReporter {
    task_id: TaskId,
    listener: Arc<dyn ProgressListener>,
}

impl ProgressReporter {
    pub fn new(task_id: TaskId, listener: Arc<dyn ProgressListener>) -> Self {
        Self { task_id, listener }
    }

    /// Report the fraction done (0.0 to 1.0). The queue clamps the value and
    /// ignores regressions.
    pub async fn report(&self, fraction: f64) {
        self.listener.on_progress(self.task_id, fraction).await;
    }

    /// Report `done` out of `total` steps.
    pub async fn step(&self, done: u64, total: u64) {
        if total == 0 {
            return;
        }
        self.report(done as f64 / total as f64).await;
    }
}

/// Everything a processor gets for one run.
pub struct TaskContext {
    task_id: TaskId,
    spec: TaskSpec,
    progress: ProgressReporter,
    cancel: CancelToken,
}

impl TaskContext {
    pub fn new(
        task_id: TaskId,
        spec: TaskSpec,
        progress: ProgressReporter,
        cancel: CancelToken,
    ) -> Self {
        Self {
            task_id,
            spec,
            progress,
            cancel,
        }
    }

    /// A context outside any queue: progress reports go nowhere.
    pub fn detached(task_id: TaskId, spec: TaskSpec, cancel: CancelToken) -> Self {
        Self::new(
            task_id,
            spec,
            ProgressReporter::new(task_id, Arc::new(Discard)),
            cancel,
        )
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn input_path(&self) -> &Path {
        &self.spec.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.spec.output_path
    }

    pub fn config(&self) -> &Payload {
        &self.spec.config
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_is_visible_to_every_token_clone() {
        let (handle, token) = cancel_pair();
        let other = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();
        assert!(handle.is_cancelled());
        assert!(token.is_cancelled());
        assert!(other.is_cancelled());

        tokio::time::timeout(Duration::from_millis(100), other.cancelled())
            .await
            .unwrap();
    }

    #[derive(Default)]
    struct Collect(std::sync::Mutex<Vec<f64>>);

    #[async_trait]
    impl ProgressListener for Collect {
        async fn on_progress(&self, _task_id: TaskId, fraction: f64) {
            self.0.lock().unwrap().push(fraction);
        }
    }

    #[tokio::test]
    async fn step_reports_fraction_of_total() {
        let listener = Arc::new(Collect::default());
        let reporter = ProgressReporter::new(
            TaskId::from_ulid(ulid::Ulid::new()),
            listener.clone() as Arc<dyn ProgressListener>,
        );

        reporter.step(1, 4).await;
        reporter.step(4, 4).await;
        reporter.step(3, 0).await;

        assert_eq!(*listener.0.lock().unwrap(), vec![0.25, 1.0]);
    }

    #[tokio::test]
    async fn dropped_handle_never_cancels() {
        let (handle, token) = cancel_pair();
        drop(handle);
        assert!(!token.is_cancelled());

        let waited = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(waited.is_err());
    }
}
