use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;
use crate::pattern::PatternSet;

/// How a child's capabilities are derived from its parent's.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityMode {
    /// Intersect allow-lists, union deny-lists, apply cost decay (default).
    Decay,
    /// Validate a caller-supplied set against the parent, no automatic decay.
    Explicit,
    /// Copy the parent verbatim, decrementing only depth (and optionally cost).
    Inherit,
}

impl Default for CapabilityMode {
    fn default() -> Self {
        CapabilityMode::Decay
    }
}

/// The capability manifest governing one agent instance: tool/domain
/// allow-and-deny lists, budgets and spawn permissions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapabilitiesManifest {
    pub allowed_tools: Vec<String>,
    pub denied_tools: Vec<String>,
    pub allowed_domains: Vec<String>,
    pub denied_domains: Vec<String>,

    pub max_cost_per_session: Option<f64>,
    pub max_cost_per_day: Option<f64>,
    pub max_tokens_per_call: Option<u64>,
    pub max_calls_per_minute: Option<u32>,

    pub may_spawn_children: bool,
    pub max_child_depth: u32,

    pub capability_mode: CapabilityMode,
}

impl CapabilitiesManifest {
    pub fn unrestricted() -> Self {
        Self {
            allowed_tools: vec![],
            denied_tools: vec![],
            allowed_domains: vec![],
            denied_domains: vec![],
            max_cost_per_session: None,
            max_cost_per_day: None,
            max_tokens_per_call: None,
            max_calls_per_minute: None,
            may_spawn_children: false,
            max_child_depth: 0,
            capability_mode: CapabilityMode::Decay,
        }
    }

    /// Validates the cross-field invariant: a manifest that can spawn
    /// children must reserve at least one level of depth for them.
    pub fn validate(&self) -> Result<(), CapabilityError> {
        if self.may_spawn_children && self.max_child_depth < 1 {
            return Err(CapabilityError::InvalidManifest(
                "maySpawnChildren=true requires maxChildDepth >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Pre-compiled pattern sets over a manifest, built once and reused across
/// every policy check in the manifest's lifetime.
#[derive(Clone, Debug)]
pub struct CompiledCapabilities {
    pub manifest: CapabilitiesManifest,
    pub allowed_tools: PatternSet,
    pub denied_tools: PatternSet,
    pub allowed_domains: PatternSet,
    pub denied_domains: PatternSet,
}

impl CompiledCapabilities {
    pub fn compile(manifest: CapabilitiesManifest) -> Self {
        let allowed_tools = PatternSet::compile(&manifest.allowed_tools);
        let denied_tools = PatternSet::compile(&manifest.denied_tools);
        let allowed_domains = PatternSet::compile(&manifest.allowed_domains);
        let denied_domains = PatternSet::compile(&manifest.denied_domains);
        Self {
            manifest,
            allowed_tools,
            denied_tools,
            allowed_domains,
            denied_domains,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_manifest_validates() {
        assert!(CapabilitiesManifest::unrestricted().validate().is_ok());
    }

    #[test]
    fn spawn_without_depth_is_invalid() {
        let mut m = CapabilitiesManifest::unrestricted();
        m.may_spawn_children = true;
        m.max_child_depth = 0;
        assert!(m.validate().is_err());
    }
}
