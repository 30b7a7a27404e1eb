//! EventSink port - ライフサイクルイベントの配送
//!
//! 配送は fire-and-forget（ack なし）。購読者の数も処理内容も仮定しない。
//!
//! # 実装
//! - NoopEventSink: 何もしない
//! - EventBus: EventKind ごとの handler 登録（impls::event_bus）
//! - ChannelEventSink: broadcast channel（impls::channel_sink）

use std::sync::Arc;

use crate::domain::QueueEvent;

/// Receives every event the queue publishes.
///
/// Called while the queue lock is held, right after the transition is
/// recorded, so events of one task arrive in lifecycle order. Implementations
/// must return quickly and must not wait on the queue from inside `emit`.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &QueueEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &QueueEvent) {}
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: &QueueEvent) {
        (**self).emit(event)
    }
}
