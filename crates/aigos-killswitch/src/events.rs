use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::State;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum KillSwitchEvent {
    #[serde(rename = "killswitch.applied")]
    Applied {
        command_id: Uuid,
        state: State,
        at: DateTime<Utc>,
    },
    #[serde(rename = "signature.invalid")]
    SignatureInvalid { command_id: Uuid, at: DateTime<Utc> },
}

type Handler = Box<dyn Fn(&KillSwitchEvent) + Send + Sync>;

#[derive(Default)]
pub struct KillSwitchEventBus {
    handlers: RwLock<Vec<Handler>>,
}

impl KillSwitchEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&KillSwitchEvent) + Send + Sync + 'static,
    {
        self.handlers.write().expect("event bus lock poisoned").push(Box::new(handler));
    }

    pub fn emit(&self, event: KillSwitchEvent) {
        for handler in self.handlers.read().expect("event bus lock poisoned").iter() {
            handler(&event);
        }
    }
}
