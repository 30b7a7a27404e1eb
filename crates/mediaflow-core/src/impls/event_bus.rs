//! EventBus - EventKind ごとの observer 登録
//!
//! Handlers are registered up front or at any later time. The order in which
//! different subscribers see an event is unspecified.

use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::{EventKind, QueueEvent};
use crate::ports::EventSink;

type Handler = Arc<dyn Fn(&QueueEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<(Option<EventKind>, Handler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `handler` for every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.push(Some(kind), Arc::new(handler));
    }

    /// Call `handler` for every event.
    pub fn subscribe_all<F>(&self, handler: F)
    where
        F: Fn(&QueueEvent) + Send + Sync + 'static,
    {
        self.push(None, Arc::new(handler));
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push(&self, kind: Option<EventKind>, handler: Handler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((kind, handler));
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: &QueueEvent) {
        let kind = event.kind();
        // clone out so a handler can subscribe without deadlocking
        let matching: Vec<Handler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(filter, _)| filter.is_none_or(|k| k == kind))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in matching {
            handler(event);
        }
    }
}
