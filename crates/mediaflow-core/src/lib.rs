//! mediaflow-core
//!
//! Priority task queue with a bounded worker pool for media processing jobs.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, status, priority, task, events, counts, batch）
//! - **ports**: 抽象化レイヤー（Processor, EventSink, Clock, IdGenerator）
//! - **queue**: TaskQueue 本体（builder, scheduler, worker, context）
//! - **registry**: processor 名 → 実装の解決
//! - **config**: figment によるキュー設定の読み込み
//! - **impls**: 実装（EventBus, ChannelEventSink, デモ processor）

pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod registry;

pub use config::QueueConfig;
pub use domain::{
    BatchFailure, BatchSummary, EventKind, Payload, Priority, QueueCounts, QueueEvent, TaskId,
    TaskRecord, TaskSpec, TaskStatus,
};
pub use error::MediaflowError;
pub use ports::{Processor, ProcessorError};
pub use queue::{SchedulerHandle, TaskContext, TaskQueue, TaskQueueBuilder};
pub use registry::{ProcessorInfo, ProcessorRegistry};
