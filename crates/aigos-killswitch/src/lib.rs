//! Kill switch: out-of-band, signature-verified PAUSE/RESUME/TERMINATE
//! commands with replay protection and a staleness window. Transport
//! (SSE/polling/file) is an external collaborator; this crate only
//! implements the state machine and its verification gate.

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod state;

pub use command::{Command, KillSwitchCommand};
pub use config::{Channel, KillSwitchConfig};
pub use engine::{KillSwitch, ProcessOutcome};
pub use error::KillSwitchError;
pub use events::{KillSwitchEvent, KillSwitchEventBus};
pub use state::State;
