use aigos_capability::{compute_child, ChildOptions, DecayConfig, DecayResult};

use crate::error::IdentityError;
use crate::golden_thread::GoldenThread;
use crate::identity::{IdentityBuilder, RuntimeIdentity};

/// Asset metadata for a spawned child; everything else is derived from the
/// parent via capability decay.
pub struct ChildAsset {
    pub asset_id: String,
    pub asset_name: String,
    pub asset_version: String,
    pub golden_thread: GoldenThread,
}

/// Runs the capability decay manager against `parent`, then builds the
/// child's runtime identity from the decayed result. Returns the decay
/// result alongside the identity so callers can inspect warnings/errors
/// even when `valid` is false (the caller decides whether to proceed).
pub fn spawn_child(
    parent: &RuntimeIdentity,
    asset: ChildAsset,
    options: &ChildOptions,
    decay_config: &DecayConfig,
) -> Result<(RuntimeIdentity, DecayResult), IdentityError> {
    let decay_result = compute_child(
        &parent.capabilities,
        parent.lineage.generation_depth,
        options,
        decay_config,
    );

    let child = IdentityBuilder::new()
        .asset(asset.asset_id, asset.asset_name, asset.asset_version)
        .risk_level(parent.risk_level)
        .mode(parent.mode)
        .golden_thread(asset.golden_thread)
        .capabilities(decay_result.effective.clone())
        .spawned_from(parent.instance_id, &parent.lineage)
        .build()?;

    Ok((child, decay_result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityBuilder;
    use aigos_types::RiskLevel;
    use chrono::Utc;

    fn parent_identity() -> RuntimeIdentity {
        let capabilities = aigos_capability::CapabilitiesManifest {
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

    fn child_asset() -> ChildAsset {
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
    fn spawned_child_has_depth_one_more_than_parent() {
        let parent = parent_identity();
        let (child, decay) = spawn_child(&parent, child_asset(), &ChildOptions::default(), &DecayConfig::default()).unwrap();
        assert_eq!(child.lineage.generation_depth, parent.lineage.generation_depth + 1);
        assert_eq!(child.lineage.parent_instance_id, Some(parent.instance_id));
        assert!(decay.valid);
    }

    #[test]
    fn spawned_child_never_escalates_over_parent() {
        let parent = parent_identity();
        let options = ChildOptions {
            allowed_tools: Some(vec!["search_*".to_string(), "admin_*".to_string()]),
            ..Default::default()
        };
        let (child, decay) = spawn_child(&parent, child_asset(), &options, &DecayConfig::default()).unwrap();
        let comparison = aigos_capability::compare_capabilities(&parent.capabilities, &child.capabilities);
        assert!(!comparison.has_escalation);
        assert!(!decay.valid);
    }
}
