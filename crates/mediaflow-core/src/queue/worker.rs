//! Fixed-size worker pool fed by the scheduling pass.

use std::any::Any;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::context::{ProgressListener, ProgressReporter, TaskContext};
use super::shared::Shared;
use super::state::Dispatch;
use crate::domain::Payload;
use crate::ports::ProcessorError;

pub(crate) type DispatchRx = Arc<Mutex<mpsc::Receiver<Dispatch>>>;

/// Spawn `n` workers that share one dispatch receiver.
pub(crate) fn spawn_workers(
    n: usize,
    shared: &Arc<Shared>,
    rx: &DispatchRx,
    shutdown_rx: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    (0..n)
        .map(|worker_id| {
            let shared = Arc::clone(shared);
            let rx = Arc::clone(rx);
            let mut shutdown_rx = shutdown_rx.clone();
            tokio::spawn(async move {
                worker_loop(worker_id, shared, rx, &mut shutdown_rx).await;
            })
        })
        .collect()
}

async fn worker_loop(
    worker_id: usize,
    shared: Arc<Shared>,
    rx: DispatchRx,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    tracing::debug!(worker_id, "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                dispatch = rx.recv() => dispatch,
            }
        };

        let Some(dispatch) = next else {
            break;
        };

        let span = tracing::info_span!("task", task_id = %dispatch.task_id, worker_id);
        run_one(&shared, dispatch).instrument(span).await;
    }
    tracing::debug!(worker_id, "worker stopped");
}

/// Run one dispatched task and report its outcome. Processor errors and
/// panics end up as the task's outcome, never in the worker.
async fn run_one(shared: &Arc<Shared>, dispatch: Dispatch) {
    let Dispatch {
        task_id,
        spec,
        cancel,
    } = dispatch;

    let processor = match shared.registry.resolve(&spec.processor) {
        Ok(processor) => processor,
        Err(err) => {
            shared
                .finish(task_id, Err(ProcessorError::failed(err.to_string())))
                .await;
            return;
        }
    };

    let progress = ProgressReporter::new(task_id, Arc::clone(shared) as Arc<dyn ProgressListener>);
    let ctx = TaskContext::new(task_id, spec, progress, cancel);

    // A separate task so a panic inside the processor surfaces as a JoinError.
    let outcome = tokio::spawn(async move { processor.process(&ctx).await }).await;
    let outcome: Result<Payload, ProcessorError> = match outcome {
        Ok(result) => result,
        Err(err) if err.is_panic() => {
            let message = panic_message(err.into_panic());
            tracing::warn!(%message, "processor panicked");
            Err(ProcessorError::failed(format!("processor panicked: {message}")))
        }
        Err(_) => Err(ProcessorError::failed("processor task was aborted")),
    };

    shared.finish(task_id, outcome).await;
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
