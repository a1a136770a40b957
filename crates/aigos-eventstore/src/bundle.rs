use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EventStoreError;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Blocking,
    Warning,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConformanceTarget {
    Bronze,
    Silver,
    Gold,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub severity: Severity,
    pub applies_to: Vec<String>,
    pub check: String,
    pub description: String,
    pub remediation: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Waiver {
    pub rule_id: String,
    pub waived_by: String,
    pub expires_at: DateTime<Utc>,
    pub reason: String,
}

impl Waiver {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyBundle {
    pub id: String,
    pub org_id: String,
    pub rules: Vec<Rule>,
    pub conformance_target: Option<ConformanceTarget>,
    pub waivers: Vec<Waiver>,
}

/// External collaborator supplying the active policy bundle for an
/// organisation. Reference in-memory implementation below is keyed by
/// `orgId`, one bundle active at a time.
#[async_trait]
pub trait PolicyBundleStore: Send + Sync {
    async fn get_active_bundle(&self, org_id: &str) -> Result<Option<PolicyBundle>, EventStoreError>;
}

#[derive(Default)]
pub struct InMemoryPolicyBundleStore {
    bundles: RwLock<HashMap<String, PolicyBundle>>,
}

impl InMemoryPolicyBundleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active_bundle(&self, bundle: PolicyBundle) {
        self.bundles
            .write()
            .expect("policy bundle store lock poisoned")
            .insert(bundle.org_id.clone(), bundle);
    }
}

#[async_trait]
impl PolicyBundleStore for InMemoryPolicyBundleStore {
    async fn get_active_bundle(&self, org_id: &str) -> Result<Option<PolicyBundle>, EventStoreError> {
        Ok(self
            .bundles
            .read()
            .map_err(|_| EventStoreError::LockPoisoned)?
            .get(org_id)
            .cloned())
    }
}
