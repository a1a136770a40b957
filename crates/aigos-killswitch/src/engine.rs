use std::collections::HashSet;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use aigos_crypto::verify::{KeyRegistry, SignatureEnvelope};

use crate::command::{Command, KillSwitchCommand};
use crate::config::KillSwitchConfig;
use crate::error::KillSwitchError;
use crate::events::{KillSwitchEvent, KillSwitchEventBus};
use crate::state::State;

struct Inner {
    state: State,
    processed: HashSet<Uuid>,
}

/// Out-of-band, signature-verified kill switch. `process_command` applies
/// replay protection, signature verification and a staleness window before
/// transitioning state; the hot `should_continue` read never blocks behind
/// a write.
pub struct KillSwitch {
    config: KillSwitchConfig,
    keys: KeyRegistry,
    inner: RwLock<Inner>,
    pub events: KillSwitchEventBus,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub state: State,
    pub duplicate: bool,
}

impl KillSwitch {
    pub fn new(config: KillSwitchConfig, keys: KeyRegistry) -> Self {
        Self {
            config,
            keys,
            inner: RwLock::new(Inner {
                state: State::default(),
                processed: HashSet::new(),
            }),
            events: KillSwitchEventBus::new(),
        }
    }

    pub fn state(&self) -> State {
        self.inner.read().expect("kill switch lock poisoned").state
    }

    /// `false` in `PAUSED` or `TERMINATED`. Consulted from the policy
    /// engine's kill-switch gate on every guarded action.
    pub fn should_continue(&self) -> bool {
        self.state().should_continue()
    }

    pub fn process_command(
        &self,
        command: &KillSwitchCommand,
        now: DateTime<Utc>,
    ) -> Result<ProcessOutcome, KillSwitchError> {
        {
            let inner = self.inner.read().expect("kill switch lock poisoned");
            if inner.processed.contains(&command.command_id) {
                return Ok(ProcessOutcome {
                    state: inner.state,
                    duplicate: true,
                });
            }
        }

        if self.config.require_signature {
            let envelope = SignatureEnvelope::parse(&command.signature)
                .map_err(|_| KillSwitchError::SignatureInvalid(command.command_id))?;
            let message = command.canonical_message();
            if self.keys.verify(&message, &envelope).is_err() {
                self.events.emit(KillSwitchEvent::SignatureInvalid {
                    command_id: command.command_id,
                    at: now,
                });
                warn!(command_id = %command.command_id, "kill switch rejected invalid signature");
                return Err(KillSwitchError::SignatureInvalid(command.command_id));
            }
        }

        let age = (now - command.timestamp).num_seconds().abs();
        if age > self.config.max_age_seconds {
            return Err(KillSwitchError::StaleOrFuture(command.command_id));
        }

        let new_state = {
            let mut inner = self.inner.write().expect("kill switch lock poisoned");
            inner.state = inner.state.apply(command.command);
            inner.processed.insert(command.command_id);
            inner.state
        };

        info!(command_id = %command.command_id, ?new_state, "kill switch command applied");
        self.events.emit(KillSwitchEvent::Applied {
            command_id: command.command_id,
            state: new_state,
            at: now,
        });

        Ok(ProcessOutcome {
            state: new_state,
            duplicate: false,
        })
    }
}
