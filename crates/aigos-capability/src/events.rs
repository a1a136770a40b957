//! Typed event channel for the capability subsystem. Observers register
//! handlers; emission is synchronous and fire-and-forget.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decay::CapabilityComparison;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CapabilityEvent {
    #[serde(rename = "capability.computed")]
    Computed {
        instance_id: String,
        generation: u32,
        at: DateTime<Utc>,
    },
    #[serde(rename = "capability.validated")]
    Validated {
        instance_id: String,
        valid: bool,
        at: DateTime<Utc>,
    },
    #[serde(rename = "capability.escalation_denied")]
    EscalationDenied {
        instance_id: String,
        codes: Vec<String>,
        at: DateTime<Utc>,
    },
}

type Handler = Box<dyn Fn(&CapabilityEvent) + Send + Sync>;

/// Registry of observers for capability lifecycle events. Registration is
/// expected to happen at startup; emission happens on the computation path.
#[derive(Default)]
pub struct CapabilityEventBus {
    handlers: RwLock<Vec<Handler>>,
}

impl CapabilityEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, handler: F)
    where
        F: Fn(&CapabilityEvent) + Send + Sync + 'static,
    {
        self.handlers.write().expect("event bus lock poisoned").push(Box::new(handler));
    }

    pub fn emit(&self, event: CapabilityEvent) {
        for handler in self.handlers.read().expect("event bus lock poisoned").iter() {
            handler(&event);
        }
    }
}

/// Emits the pair of `capability.computed` / `capability.validated` events
/// for a decay computation, plus `capability.escalation_denied` when the
/// comparison reveals escalation.
pub fn emit_decay_events(
    bus: &CapabilityEventBus,
    instance_id: &str,
    generation: u32,
    valid: bool,
    comparison: Option<&CapabilityComparison>,
    error_codes: &[String],
) {
    let now = Utc::now();
    bus.emit(CapabilityEvent::Computed {
        instance_id: instance_id.to_string(),
        generation,
        at: now,
    });
    bus.emit(CapabilityEvent::Validated {
        instance_id: instance_id.to_string(),
        valid,
        at: now,
    });
    let escalated = comparison.map(|c| c.has_escalation).unwrap_or(!error_codes.is_empty());
    if escalated {
        bus.emit(CapabilityEvent::EscalationDenied {
            instance_id: instance_id.to_string(),
            codes: error_codes.to_vec(),
            at: now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn subscribers_observe_emitted_events() {
        let bus = CapabilityEventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        bus.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        emit_decay_events(&bus, "inst-1", 1, true, None, &[]);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
