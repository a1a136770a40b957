use std::sync::RwLock;

use chrono::{DateTime, Utc};

#[derive(Clone, Debug)]
pub struct PolicyViolatedEvent {
    pub code: String,
    pub reason: String,
    pub at: DateTime<Utc>,
}

type Handler = Box<dyn Fn(&PolicyViolatedEvent) + Send + Sync>;

/// Emits `policy.violated` whenever an inbound or outbound gate denies a
/// handshake, carrying the gate's stable code.
#[derive(Default)]
pub struct A2aEventBus {
    handlers: RwLock<Vec<Handler>>,
}

impl A2aEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&PolicyViolatedEvent) + Send + Sync + 'static,
    {
        self.handlers.write().expect("event bus lock poisoned").push(Box::new(handler));
    }

    pub fn emit(&self, event: PolicyViolatedEvent) {
        for handler in self.handlers.read().expect("event bus lock poisoned").iter() {
            handler(&event);
        }
    }
}
