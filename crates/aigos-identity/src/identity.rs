use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use aigos_capability::CapabilitiesManifest;
use aigos_crypto::hash_canonical_value;
use aigos_types::{InstanceId, Mode, RiskLevel};

use crate::error::IdentityError;
use crate::golden_thread::GoldenThread;
use crate::lineage::Lineage;

/// A bound, hashed description of an agent instance: who it is, its
/// approved business justification, its risk tier, its capabilities and its
/// lineage. Built once; a mode change produces a new, derived value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeIdentity {
    pub instance_id: InstanceId,
    pub asset_id: String,
    pub asset_name: String,
    pub asset_version: String,
    pub risk_level: RiskLevel,
    pub mode: Mode,
    pub golden_thread_hash: String,
    pub golden_thread: GoldenThread,
    pub capabilities: CapabilitiesManifest,
    pub lineage: Lineage,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl RuntimeIdentity {
    /// Produces a mode-changed identity. The identity is otherwise immutable,
    /// so a mode transition is always expressed as a new value rather than
    /// a mutation of `self`.
    pub fn with_mode(&self, mode: Mode) -> RuntimeIdentity {
        let mut derived = self.clone();
        derived.mode = mode;
        derived
    }

    pub fn is_root(&self) -> bool {
        self.lineage.generation_depth == 0
    }
}

/// Builds a [`RuntimeIdentity`], computing its golden-thread hash and
/// lineage, and validating every data-model invariant before returning it.
pub struct IdentityBuilder {
    asset_id: Option<String>,
    asset_name: Option<String>,
    asset_version: Option<String>,
    risk_level: RiskLevel,
    mode: Mode,
    golden_thread: Option<GoldenThread>,
    capabilities: Option<CapabilitiesManifest>,
    parent: Option<(InstanceId, Lineage)>,
    expected_golden_thread_hash: Option<String>,
}

impl Default for IdentityBuilder {
    fn default() -> Self {
        Self {
            asset_id: None,
            asset_name: None,
            asset_version: None,
            risk_level: RiskLevel::Minimal,
            mode: Mode::Normal,
            golden_thread: None,
            capabilities: None,
            parent: None,
            expected_golden_thread_hash: None,
        }
    }
}

impl IdentityBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asset(mut self, id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.asset_id = Some(id.into());
        self.asset_name = Some(name.into());
        self.asset_version = Some(version.into());
        self
    }

    pub fn risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn golden_thread(mut self, golden_thread: GoldenThread) -> Self {
        self.golden_thread = Some(golden_thread);
        self
    }

    pub fn capabilities(mut self, capabilities: CapabilitiesManifest) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn spawned_from(mut self, parent_instance_id: InstanceId, parent_lineage: &Lineage) -> Self {
        self.parent = Some((parent_instance_id, parent_lineage.clone()));
        self
    }

    /// When set, `verified` reflects whether the freshly computed
    /// golden-thread hash matches this externally-asserted value.
    pub fn expect_golden_thread_hash(mut self, hash: impl Into<String>) -> Self {
        self.expected_golden_thread_hash = Some(hash.into());
        self
    }

    pub fn build(self) -> Result<RuntimeIdentity, IdentityError> {
        let asset_id = self.asset_id.ok_or(IdentityError::MissingField("assetId"))?;
        let asset_name = self.asset_name.ok_or(IdentityError::MissingField("assetName"))?;
        let asset_version = self.asset_version.ok_or(IdentityError::MissingField("assetVersion"))?;
        let golden_thread = self.golden_thread.ok_or(IdentityError::MissingField("goldenThread"))?;
        let capabilities = self.capabilities.unwrap_or_else(CapabilitiesManifest::unrestricted);
        capabilities.validate()?;

        let instance_id = InstanceId::new();
        let now = Utc::now();

        let lineage = match self.parent {
            Some((parent_id, parent_lineage)) => Lineage::spawned_from(parent_id, &parent_lineage, now),
            None => Lineage::root(instance_id),
        };
        lineage.validate(instance_id)?;

        let golden_thread_value = json!(&golden_thread);
        let golden_thread_hash = hash_canonical_value(&golden_thread_value);
        let verified = match &self.expected_golden_thread_hash {
            Some(expected) => *expected == golden_thread_hash,
            None => true,
        };

        Ok(RuntimeIdentity {
            instance_id,
            asset_id,
            asset_name,
            asset_version,
            risk_level: self.risk_level,
            mode: self.mode,
            golden_thread_hash,
            golden_thread,
            capabilities,
            lineage,
            verified,
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orphan_thread() -> GoldenThread {
        GoldenThread::Orphan {
            reason: "no ticket yet".into(),
            declared_by: "owner".into(),
            declared_at: Utc::now(),
            remediation_deadline: Utc::now() + chrono::Duration::days(30),
            remediation_note: "tracking in backlog".into(),
        }
    }

    #[test]
    fn builds_a_root_identity() {
        let identity = IdentityBuilder::new()
            .asset("asset-1", "My Agent", "1.0.0")
            .risk_level(RiskLevel::Limited)
            .golden_thread(orphan_thread())
            .build()
            .unwrap();

        assert!(identity.is_root());
        assert_eq!(identity.lineage.generation_depth, 0);
        assert!(identity.golden_thread_hash.starts_with("sha256:"));
    }

    #[test]
    fn mode_change_produces_a_derived_identity_with_same_instance_id() {
        let identity = IdentityBuilder::new()
            .asset("asset-1", "My Agent", "1.0.0")
            .golden_thread(orphan_thread())
            .build()
            .unwrap();

        let sandboxed = identity.with_mode(Mode::Sandbox);
        assert_eq!(sandboxed.instance_id, identity.instance_id);
        assert_eq!(sandboxed.mode, Mode::Sandbox);
        assert_eq!(identity.mode, Mode::Normal);
    }

    #[test]
    fn hash_mismatch_marks_identity_unverified() {
        let identity = IdentityBuilder::new()
            .asset("asset-1", "My Agent", "1.0.0")
            .golden_thread(orphan_thread())
            .expect_golden_thread_hash("sha256:deadbeef")
            .build()
            .unwrap();
        assert!(!identity.verified);
    }

    #[test]
    fn missing_asset_id_fails_build() {
        let result = IdentityBuilder::new().golden_thread(orphan_thread()).build();
        assert!(result.is_err());
    }
}
