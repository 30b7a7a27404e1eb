//! Scheduling tick + worker pool lifecycle.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::{Mutex, OwnedMutexGuard, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::shared::Shared;
use super::state::Dispatch;
use super::worker::{DispatchRx, spawn_workers};
use crate::error::MediaflowError;
use crate::ports::ProcessorError;

/// Handle to a running scheduler.
/// - `shutdown_and_join()` waits for in-flight tasks to finish.
/// - Dropping it runs the same shutdown in the background; `start` waits for
///   that to finish before bringing up a new pool.
pub struct SchedulerHandle {
    pool: Option<Pool>,
}

struct Pool {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    rx: DispatchRx,
    slot: OwnedMutexGuard<Option<mpsc::Receiver<Dispatch>>>,
}

impl SchedulerHandle {
    pub(crate) async fn spawn(shared: &Arc<Shared>, with_tick: bool) -> Result<Self, MediaflowError> {
        let mut slot = match Arc::clone(&shared.pool_slot).try_lock_owned() {
            Ok(slot) => slot,
            Err(_) if shared.stopping.load(Ordering::Acquire) => {
                tracing::debug!("waiting for the previous worker pool to stop");
                Arc::clone(&shared.pool_slot).lock_owned().await
            }
            Err(_) => return Err(MediaflowError::AlreadyStarted),
        };
        shared.stopping.store(false, Ordering::Release);
        let rx = slot.take().ok_or(MediaflowError::PoolLost)?;
        let rx: DispatchRx = Arc::new(Mutex::new(rx));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = spawn_workers(shared.config.max_workers, shared, &rx, &shutdown_rx);
        if with_tick {
            let shared = Arc::clone(shared);
            let mut shutdown_rx = shutdown_rx.clone();
            joins.push(tokio::spawn(async move {
                tick_loop(shared, &mut shutdown_rx).await;
            }));
        }
        shared.state.lock().await.set_pool_running(true);

        tracing::info!(
            workers = shared.config.max_workers,
            tick_ms = shared.config.tick_interval_ms,
            with_tick,
            "scheduler started"
        );
        Ok(Self {
            pool: Some(Pool {
                shared: Arc::clone(shared),
                shutdown_tx,
                joins,
                rx,
                slot,
            }),
        })
    }

    /// Stop taking new work. In-flight processors are not interrupted.
    pub fn request_shutdown(&self) {
        if let Some(pool) = &self.pool {
            pool.signal();
        }
    }

    /// Shut down, wait for the workers, then cancel anything that was
    /// dispatched but never picked up. The queue can be started again.
    pub async fn shutdown_and_join(mut self) {
        if let Some(pool) = self.pool.take() {
            pool.stop().await;
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        let Some(pool) = self.pool.take() else {
            return;
        };
        pool.shared.stopping.store(true, Ordering::Release);
        pool.signal();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(pool.stop());
            }
            Err(_) => pool.abandon(),
        }
    }
}

impl Pool {
    fn signal(&self) {
        // ignore send error: receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    async fn stop(self) {
        let Pool {
            shared,
            shutdown_tx,
            joins,
            rx,
            mut slot,
        } = self;

        // no dispatch can land in the channel after this
        shared.state.lock().await.set_pool_running(false);
        let _ = shutdown_tx.send(true);
        for join in joins {
            let _ = join.await;
        }

        // every worker has exited, so this is the last reference
        match Arc::try_unwrap(rx) {
            Ok(rx) => {
                let mut rx = rx.into_inner();
                while let Ok(dispatch) = rx.try_recv() {
                    shared
                        .finish(dispatch.task_id, Err(ProcessorError::Cancelled))
                        .await;
                }
                *slot = Some(rx);
            }
            Err(_) => tracing::warn!("dispatch receiver still shared after shutdown"),
        }
        tracing::info!("scheduler stopped");
    }

    /// Best-effort cleanup when no runtime is left to run `stop`.
    fn abandon(self) {
        let Pool {
            shared, rx, mut slot, ..
        } = self;
        let Ok(mut state) = shared.state.try_lock() else {
            tracing::warn!("queue busy while dropping scheduler outside a runtime");
            return;
        };
        state.set_pool_running(false);
        if let Ok(rx) = Arc::try_unwrap(rx) {
            let mut rx = rx.into_inner();
            let now = shared.clock.now();
            while let Ok(dispatch) = rx.try_recv() {
                let events = state.finish(dispatch.task_id, Err(ProcessorError::Cancelled), now);
                shared.publish(&events);
            }
            *slot = Some(rx);
        }
    }
}

async fn tick_loop(shared: Arc<Shared>, shutdown_rx: &mut watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(shared.config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = interval.tick() => {
                shared.schedule().await;
            }
        }
    }
}
