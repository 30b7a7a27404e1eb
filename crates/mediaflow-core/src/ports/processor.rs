//! Processor port - 1 タスク分の処理（unit of work）
//!
//! Queue は処理内容（rename, transcode, quality metrics ...）を知らない。
//! `TaskContext` 経由で進捗を報告し、キャンセルフラグを確認する。

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Payload;
use crate::queue::TaskContext;

/// Why a unit of work did not produce a result.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The processor saw the cancellation flag and stopped early.
    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProcessorError {
    pub fn failed(message: impl Into<String>) -> Self {
        ProcessorError::Failed(message.into())
    }
}

/// A named capability that can run one task.
///
/// Processors that break their work into steps should call
/// `ctx.progress().report(..)` and check `ctx.is_cancelled()` between steps,
/// returning `ProcessorError::Cancelled` when it is set. A processor that
/// never checks runs to its natural end.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Registry key, referenced by `TaskSpec::processor`.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn process(&self, ctx: &TaskContext) -> Result<Payload, ProcessorError>;
}
