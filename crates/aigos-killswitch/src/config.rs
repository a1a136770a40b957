use serde::{Deserialize, Serialize};

/// External transport the kill switch receives commands over. The engine
/// itself is transport-agnostic; this only labels where commands came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sse,
    Polling,
    File,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KillSwitchConfig {
    /// Must be `true` in production; `false` accepts any signature value
    /// and exists only for local development.
    pub require_signature: bool,
    pub max_age_seconds: i64,
    pub channel: Channel,
}

impl Default for KillSwitchConfig {
    fn default() -> Self {
        Self {
            require_signature: true,
            max_age_seconds: 300,
            channel: Channel::Sse,
        }
    }
}
