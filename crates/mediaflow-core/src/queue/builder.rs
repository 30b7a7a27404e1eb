//! TaskQueueBuilder - キューの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - expect_processors() で必要な processor 名を宣言
//! - build() 時に「期待集合 ⊆ 登録済み集合」と config を検証

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::{Mutex, mpsc};

use super::shared::Shared;
use super::state::QueueState;
use super::task_queue::TaskQueue;
use crate::config::QueueConfig;
use crate::error::MediaflowError;
use crate::ports::{Clock, EventSink, IdGenerator, NoopEventSink, SystemClock, UlidGenerator};
use crate::registry::ProcessorRegistry;

/// Builds a `TaskQueue`.
///
/// # 使用例
/// ```ignore
/// let queue = TaskQueue::builder(registry)
///     .config(QueueConfig::default().with_max_workers(2))
///     .event_sink(Arc::new(bus))
///     .expect_processors(&["simulate"])
///     .build()?;
/// ```
pub struct TaskQueueBuilder {
    registry: ProcessorRegistry,
    config: QueueConfig,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    expected: Vec<String>,
}

impl TaskQueueBuilder {
    pub fn new(registry: ProcessorRegistry) -> Self {
        Self {
            registry,
            config: QueueConfig::default(),
            events: Arc::new(NoopEventSink),
            clock: Arc::new(SystemClock),
            ids: None,
            expected: Vec::new(),
        }
    }

    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Defaults to a `UlidGenerator` over the configured clock.
    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Processor names that must be registered for `build` to succeed.
    pub fn expect_processors(mut self, names: &[&str]) -> Self {
        self.expected = names.iter().map(|name| name.to_string()).collect();
        self
    }

    pub fn build(self) -> Result<TaskQueue, MediaflowError> {
        self.config.validate()?;

        let missing: Vec<String> = self
            .expected
            .iter()
            .filter(|name| self.registry.get(name).is_none())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(MediaflowError::MissingProcessors(missing));
        }

        let ids = self.ids.unwrap_or_else(|| {
            Arc::new(UlidGenerator::new(Arc::clone(&self.clock))) as Arc<dyn IdGenerator>
        });
        let (dispatch_tx, dispatch_rx) = mpsc::channel(self.config.max_workers);

        let shared = Shared {
            state: Mutex::new(QueueState::new()),
            config: self.config,
            registry: Arc::new(self.registry),
            events: self.events,
            clock: self.clock,
            ids,
            dispatch_tx,
            pool_slot: Arc::new(Mutex::new(Some(dispatch_rx))),
            stopping: AtomicBool::new(false),
        };
        Ok(TaskQueue {
            shared: Arc::new(shared),
        })
    }
}
