use aigos_capability::{ChildOptions, DecayConfig, DecayResult};
use aigos_identity::{spawn_child, ChildAsset, IdentityError, RuntimeIdentity};

/// Wraps one organisation-wide [`DecayConfig`] so a
/// [`RuntimeContext`](crate::RuntimeContext) can spawn children without every
/// call site threading the decay policy through by hand.
#[derive(Clone, Debug, Default)]
pub struct CapabilityDecayManager {
    config: DecayConfig,
}

impl CapabilityDecayManager {
    pub fn new(config: DecayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    pub fn spawn_child(
        &self,
        parent: &RuntimeIdentity,
        asset: ChildAsset,
        options: &ChildOptions,
    ) -> Result<(RuntimeIdentity, DecayResult), IdentityError> {
        spawn_child(parent, asset, options, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigos_capability::CapabilitiesManifest;
    use aigos_identity::{GoldenThread, IdentityBuilder};
    use aigos_types::RiskLevel;
    use chrono::Utc;

    fn parent() -> RuntimeIdentity {
        let capabilities = CapabilitiesManifest {
            allowed_tools: vec!["search_*".to_string()],
            denied_tools: vec![],
            allowed_domains: vec!["*".to_string()],
            denied_domains: vec![],
            max_cost_per_session: Some(100.0),
            max_cost_per_day: Some(500.0),
            max_tokens_per_call: None,
            max_calls_per_minute: None,
            may_spawn_children: true,
            max_child_depth: 2,
            capability_mode: aigos_capability::CapabilityMode::Decay,
        };
        IdentityBuilder::new()
            .asset("parent-1", "Parent Agent", "1.0.0")
            .risk_level(RiskLevel::Limited)
            .golden_thread(GoldenThread::Orphan {
                reason: "n/a".into(),
                declared_by: "owner".into(),
                declared_at: Utc::now(),
                remediation_deadline: Utc::now() + chrono::Duration::days(10),
                remediation_note: "".into(),
            })
            .capabilities(capabilities)
            .build()
            .unwrap()
    }

    fn asset() -> ChildAsset {
        ChildAsset {
            asset_id: "child-1".into(),
            asset_name: "Child Agent".into(),
            asset_version: "1.0.0".into(),
            golden_thread: GoldenThread::Orphan {
                reason: "n/a".into(),
                declared_by: "owner".into(),
                declared_at: Utc::now(),
                remediation_deadline: Utc::now() + chrono::Duration::days(10),
                remediation_note: "".into(),
            },
        }
    }

    #[test]
    fn spawns_a_valid_child_one_generation_deeper() {
        let manager = CapabilityDecayManager::new(DecayConfig::default());
        let parent = parent();
        let (child, decay) = manager.spawn_child(&parent, asset(), &ChildOptions::default()).unwrap();
        assert!(decay.valid);
        assert_eq!(child.lineage.generation_depth, parent.lineage.generation_depth + 1);
    }

    #[test]
    fn escalation_request_is_rejected() {
        let manager = CapabilityDecayManager::new(DecayConfig::default());
        let parent = parent();
        let options = ChildOptions {
            allowed_tools: Some(vec!["admin_*".to_string()]),
            ..Default::default()
        };
        let (_child, decay) = manager.spawn_child(&parent, asset(), &options).unwrap();
        assert!(!decay.valid);
    }
}
