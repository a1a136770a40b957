use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IntegrityEvent {
    #[serde(rename = "aigrc.audit.chain.verified")]
    ChainVerified {
        audit_id: String,
        merkle_root: String,
        event_count: usize,
        verified: bool,
    },
}

type Handler = Box<dyn Fn(&IntegrityEvent) + Send + Sync>;

#[derive(Default)]
pub struct IntegrityEventBus {
    handlers: RwLock<Vec<Handler>>,
}

impl IntegrityEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&IntegrityEvent) + Send + Sync + 'static,
    {
        self.handlers.write().expect("event bus lock poisoned").push(Box::new(handler));
    }

    pub fn emit(&self, event: IntegrityEvent) {
        for handler in self.handlers.read().expect("event bus lock poisoned").iter() {
            handler(&event);
        }
    }
}
