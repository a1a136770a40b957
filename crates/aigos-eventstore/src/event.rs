use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use aigos_crypto::hash_canonical_excluding;
use aigos_identity::GoldenThread;

/// Severity an event carries for governance purposes. Ordered least to most
/// severe; used by the conformance and suggestion gates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Low,
    Medium,
    High,
    Critical,
}

/// An event in an organisation's governance event stream. `hash` is a
/// SHA-256 over a canonical serialisation of every field except `hash`,
/// `receivedAt` and `signature`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceEvent {
    pub id: Uuid,
    pub spec_version: u32,
    pub schema_version: u32,
    #[serde(rename = "type")]
    pub event_type: String,
    pub category: String,
    pub criticality: Criticality,
    pub org_id: String,
    pub asset_id: Option<String>,
    pub produced_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub golden_thread: GoldenThread,
    pub source: String,
    pub data: Value,
}

impl GovernanceEvent {
    /// Recomputes the canonical hash the event would carry, for verification
    /// against a stored or transmitted value.
    pub fn compute_hash(&self) -> String {
        let value = json!(self);
        hash_canonical_excluding(&value, &["hash", "receivedAt", "signature"])
    }
}
