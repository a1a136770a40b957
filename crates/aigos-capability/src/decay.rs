//! Capability Decay Manager: computes a child agent's effective capabilities
//! from its parent's under `decay` / `explicit` / `inherit` modes, enforcing
//! that a child never exceeds its parent.

use serde::{Deserialize, Serialize};

use crate::error::DecayError;
use crate::manifest::{CapabilitiesManifest, CapabilityMode};

/// Global, organisation-wide overlay applied after per-spawn decay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecayConfig {
    pub default_mode: CapabilityMode,
    /// Multiplier applied to cost limits per generation. Must be in (0, 1].
    pub cost_decay_factor: f64,
    pub global_deny_tools: Vec<String>,
    pub global_deny_domains: Vec<String>,
    pub min_child_tools: Vec<String>,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            default_mode: CapabilityMode::Decay,
            cost_decay_factor: 0.8,
            global_deny_tools: vec![],
            global_deny_domains: vec![],
            min_child_tools: vec![],
        }
    }
}

/// Caller-supplied overrides for a spawned child. Every field is optional;
/// an absent field means "derive from the parent", not "unlimited".
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChildOptions {
    pub mode: Option<CapabilityMode>,
    pub allowed_tools: Option<Vec<String>>,
    pub denied_tools: Option<Vec<String>>,
    pub allowed_domains: Option<Vec<String>>,
    pub denied_domains: Option<Vec<String>>,
    pub max_cost_per_session: Option<f64>,
    pub max_cost_per_day: Option<f64>,
    pub max_tokens_per_call: Option<u64>,
    pub max_calls_per_minute: Option<u32>,
    pub may_spawn_children: Option<bool>,
    pub max_child_depth: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecayResult {
    pub valid: bool,
    pub effective: CapabilitiesManifest,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<String>,
}

/// Computes a spawned child's effective capabilities.
///
/// `parent_generation_depth` is the parent identity's own depth; the child's
/// generation is always `parent_generation_depth + 1`.
pub fn compute_child(
    parent: &CapabilitiesManifest,
    parent_generation_depth: u32,
    options: &ChildOptions,
    config: &DecayConfig,
) -> DecayResult {
    let mut warnings = Vec::new();
    let mut errors: Vec<DecayError> = Vec::new();

    if parent.max_child_depth == 0 {
        errors.push(DecayError::DepthExhausted);
        return DecayResult {
            valid: false,
            effective: parent.clone(),
            warnings,
            errors: errors.iter().map(|e| e.code().to_string()).collect(),
        };
    }

    let mode = options.mode.unwrap_or(config.default_mode);
    let generation = parent_generation_depth + 1;

    let (allowed_tools, denied_tools, allowed_domains, denied_domains) = match mode {
        CapabilityMode::Inherit => (
            parent.allowed_tools.clone(),
            parent.denied_tools.clone(),
            parent.allowed_domains.clone(),
            parent.denied_domains.clone(),
        ),
        CapabilityMode::Decay => {
            let (tools, tool_esc) =
                merge_allow_list(&parent.allowed_tools, options.allowed_tools.as_deref());
            let (domains, domain_esc) =
                merge_allow_list(&parent.allowed_domains, options.allowed_domains.as_deref());
            record_escalations(&mut errors, tool_esc, domain_esc);
            (
                tools,
                union(&parent.denied_tools, options.denied_tools.as_deref().unwrap_or(&[])),
                domains,
                union(
                    &parent.denied_domains,
                    options.denied_domains.as_deref().unwrap_or(&[]),
                ),
            )
        }
        CapabilityMode::Explicit => {
            let requested_tools = options.allowed_tools.as_deref().unwrap_or(&[]);
            let requested_domains = options.allowed_domains.as_deref().unwrap_or(&[]);
            let (tools, tool_esc) = merge_allow_list(&parent.allowed_tools, Some(requested_tools));
            let (domains, domain_esc) =
                merge_allow_list(&parent.allowed_domains, Some(requested_domains));
            record_escalations(&mut errors, tool_esc, domain_esc);
            (
                tools,
                union(&parent.denied_tools, options.denied_tools.as_deref().unwrap_or(&[])),
                domains,
                union(
                    &parent.denied_domains,
                    options.denied_domains.as_deref().unwrap_or(&[]),
                ),
            )
        }
    };

    let allowed_tools = union(&allowed_tools, &config.min_child_tools);
    let denied_tools = union(&denied_tools, &config.global_deny_tools);
    let denied_domains = union(&denied_domains, &config.global_deny_domains);

    let factor = config.cost_decay_factor;
    let (max_cost_per_session, max_cost_per_day) = match mode {
        CapabilityMode::Inherit => (
            inherit_cost(parent.max_cost_per_session, generation, factor),
            inherit_cost(parent.max_cost_per_day, generation, factor),
        ),
        CapabilityMode::Decay | CapabilityMode::Explicit => (
            decay_cost(parent.max_cost_per_session, options.max_cost_per_session, generation, factor),
            decay_cost(parent.max_cost_per_day, options.max_cost_per_day, generation, factor),
        ),
    };

    let max_tokens_per_call = cap_at_parent(parent.max_tokens_per_call, options.max_tokens_per_call);
    let max_calls_per_minute = cap_at_parent(parent.max_calls_per_minute, options.max_calls_per_minute);

    let depth_ceiling = parent.max_child_depth.saturating_sub(1);
    let max_child_depth = options
        .max_child_depth
        .map(|d| d.min(depth_ceiling))
        .unwrap_or(depth_ceiling);

    let requested_spawn = options.may_spawn_children.unwrap_or(parent.may_spawn_children);
    let may_spawn_children = if requested_spawn && !parent.may_spawn_children {
        warnings.push(
            "maySpawnChildren escalation downgraded to false: parent does not permit spawning"
                .to_string(),
        );
        false
    } else {
        requested_spawn
    };

    let effective = CapabilitiesManifest {
        allowed_tools,
        denied_tools,
        allowed_domains,
        denied_domains,
        max_cost_per_session,
        max_cost_per_day,
        max_tokens_per_call,
        max_calls_per_minute,
        may_spawn_children,
        max_child_depth,
        capability_mode: mode,
    };

    DecayResult {
        valid: errors.is_empty(),
        effective,
        warnings,
        errors: errors.iter().map(|e| e.code().to_string()).collect(),
    }
}

fn record_escalations(errors: &mut Vec<DecayError>, tools: Vec<String>, domains: Vec<String>) {
    for t in tools {
        errors.push(DecayError::ToolEscalation(t));
    }
    for d in domains {
        errors.push(DecayError::DomainEscalation(d));
    }
}

/// Intersects `requested` against `parent`: parent's `*` allows anything;
/// otherwise any requested item absent from parent (including a bare `*`)
/// is an escalation and is dropped from the effective set.
fn merge_allow_list(parent: &[String], requested: Option<&[String]>) -> (Vec<String>, Vec<String>) {
    let child = match requested {
        Some(r) => r,
        None => return (parent.to_vec(), vec![]),
    };
    let parent_wildcard = parent.iter().any(|p| p == "*");
    let mut effective = Vec::new();
    let mut escalations = Vec::new();
    for item in child {
        if parent_wildcard {
            effective.push(item.clone());
        } else if item == "*" || !parent.contains(item) {
            escalations.push(item.clone());
        } else {
            effective.push(item.clone());
        }
    }
    (effective, escalations)
}

fn union(a: &[String], b: &[String]) -> Vec<String> {
    let mut out = a.to_vec();
    for item in b {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

fn decay_cost(parent: Option<f64>, requested: Option<f64>, generation: u32, factor: f64) -> Option<f64> {
    let base = match (parent, requested) {
        (None, None) => return None,
        (None, Some(r)) => r,
        (Some(p), None) => p,
        (Some(p), Some(r)) => r.min(p),
    };
    Some(base * factor.powi(generation as i32))
}

fn inherit_cost(parent: Option<f64>, generation: u32, factor: f64) -> Option<f64> {
    parent.map(|p| p * factor.powi(generation as i32))
}

/// Option-aware min-merge: `None` means unlimited, so a limited value on
/// either side wins; two limited values take the smaller (more restrictive).
fn cap_at_parent<T: PartialOrd + Copy>(parent: Option<T>, requested: Option<T>) -> Option<T> {
    match (parent, requested) {
        (Some(p), Some(r)) => Some(if r < p { r } else { p }),
        (Some(p), None) => Some(p),
        (None, Some(r)) => Some(r),
        (None, None) => None,
    }
}

/// Delta between a parent's and a child's effective capabilities, used as
/// the canonical post-hoc escalation check.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapabilityComparison {
    pub added_tools: Vec<String>,
    pub removed_tools: Vec<String>,
    pub added_domains: Vec<String>,
    pub removed_domains: Vec<String>,
    pub increased_limits: Vec<String>,
    pub decreased_limits: Vec<String>,
    pub is_decayed: bool,
    pub has_escalation: bool,
}

pub fn compare_capabilities(
    parent: &CapabilitiesManifest,
    child: &CapabilitiesManifest,
) -> CapabilityComparison {
    let added_tools = diff(&child.allowed_tools, &parent.allowed_tools);
    let removed_tools = diff(&parent.allowed_tools, &child.allowed_tools);
    let added_domains = diff(&child.allowed_domains, &parent.allowed_domains);
    let removed_domains = diff(&parent.allowed_domains, &child.allowed_domains);

    let mut increased_limits = Vec::new();
    let mut decreased_limits = Vec::new();
    compare_optional_limit("maxCostPerSession", parent.max_cost_per_session, child.max_cost_per_session, &mut increased_limits, &mut decreased_limits);
    compare_optional_limit("maxCostPerDay", parent.max_cost_per_day, child.max_cost_per_day, &mut increased_limits, &mut decreased_limits);
    compare_optional_limit(
        "maxTokensPerCall",
        parent.max_tokens_per_call.map(|v| v as f64),
        child.max_tokens_per_call.map(|v| v as f64),
        &mut increased_limits,
        &mut decreased_limits,
    );
    compare_optional_limit(
        "maxCallsPerMinute",
        parent.max_calls_per_minute.map(|v| v as f64),
        child.max_calls_per_minute.map(|v| v as f64),
        &mut increased_limits,
        &mut decreased_limits,
    );

    let spawn_escalation = child.may_spawn_children && !parent.may_spawn_children;
    let depth_escalation = child.max_child_depth > parent.max_child_depth.saturating_sub(1) && parent.max_child_depth > 0;

    let has_escalation = !added_tools.is_empty()
        || !added_domains.is_empty()
        || !increased_limits.is_empty()
        || spawn_escalation
        || depth_escalation;

    let is_decayed = !removed_tools.is_empty()
        || !removed_domains.is_empty()
        || !decreased_limits.is_empty()
        || child.max_child_depth < parent.max_child_depth;

    CapabilityComparison {
        added_tools,
        removed_tools,
        added_domains,
        removed_domains,
        increased_limits,
        decreased_limits,
        is_decayed,
        has_escalation,
    }
}

fn diff(a: &[String], b: &[String]) -> Vec<String> {
    a.iter().filter(|x| !b.contains(x)).cloned().collect()
}

fn compare_optional_limit(
    name: &str,
    parent: Option<f64>,
    child: Option<f64>,
    increased: &mut Vec<String>,
    decreased: &mut Vec<String>,
) {
    match (parent, child) {
        (Some(p), Some(c)) if c > p => increased.push(name.to_string()),
        (Some(p), Some(c)) if c < p => decreased.push(name.to_string()),
        (Some(_), None) => increased.push(name.to_string()), // child became unlimited
        (None, Some(_)) => decreased.push(name.to_string()), // child gained a limit
        _ => {}
    }
}
