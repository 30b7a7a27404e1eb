//! Queue - スケジューリングとワーカープール
//!
//! - **task_queue**: 呼び出し側 API（submit, cancel, status, ...）
//! - **builder**: ワイヤリングと fail-fast 検証
//! - **state**: ロック内のブックキーピング
//! - **scheduler** / **worker**: tick ループと固定数のワーカー
//! - **context**: processor に渡す進捗・キャンセル

pub mod builder;
pub mod context;
mod pending;
pub mod scheduler;
mod shared;
mod state;
pub mod task_queue;
mod worker;

pub use self::builder::TaskQueueBuilder;
pub use self::context::{
    CancelHandle, CancelToken, ProgressListener, ProgressReporter, TaskContext, cancel_pair,
};
pub use self::scheduler::SchedulerHandle;
pub use self::task_queue::TaskQueue;
