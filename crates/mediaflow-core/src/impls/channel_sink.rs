//! ChannelEventSink - broadcast channel 経由の配送
//!
//! Any number of receivers; a receiver that falls behind by more than the
//! channel capacity sees `RecvError::Lagged` and skips ahead.

use tokio::sync::broadcast;

use crate::domain::QueueEvent;
use crate::ports::EventSink;

pub struct ChannelEventSink {
    tx: broadcast::Sender<QueueEvent>,
}

impl ChannelEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: &QueueEvent) {
        // no receivers is fine: delivery is fire-and-forget
        let _ = self.tx.send(event.clone());
    }
}
