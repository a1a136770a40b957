use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aigos_crypto::canonical::exclude_fields;
use aigos_types::InstanceId;

/// The three out-of-band commands an operator can issue.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Pause,
    Resume,
    Terminate,
}

/// A signed kill-switch command as received over an external channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KillSwitchCommand {
    pub command_id: Uuid,
    pub command: Command,
    pub reason: String,
    pub issued_by: String,
    pub issued_at: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
    /// `<alg>:<keyId>:<base64url>` (or `<alg>:<base64url>`); excluded from
    /// its own canonical signing message.
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_instance_id: Option<InstanceId>,
}

impl KillSwitchCommand {
    /// The canonical message the signature was computed over: this
    /// command's own fields, excluding `signature` itself.
    pub fn canonical_message(&self) -> Vec<u8> {
        let value = serde_json::to_value(self).expect("command is always serializable");
        let without_signature = exclude_fields(&value, &["signature"]);
        aigos_crypto::canonical::canonical_json_bytes(&without_signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_message_excludes_signature_but_not_other_fields() {
        let cmd = KillSwitchCommand {
            command_id: Uuid::nil(),
            command: Command::Pause,
            reason: "incident".into(),
            issued_by: "ops".into(),
            issued_at: Utc::now(),
            timestamp: Utc::now(),
            signature: "Ed25519:k1:abcd".into(),
            target_instance_id: None,
        };
        let message = String::from_utf8(cmd.canonical_message()).unwrap();
        assert!(!message.contains("abcd"));
        assert!(message.contains("incident"));
    }
}
