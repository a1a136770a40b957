use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use aigos_capability::manifest::CompiledCapabilities;
use aigos_capability::pattern::wildcard_allow_or_matches;
use aigos_killswitch::KillSwitch;

use crate::budget::BudgetTracker;
use crate::config::PolicyEngineConfig;
use crate::decision::{CheckRequest, CustomCheck, Decision, DeniedBy};
use crate::error::PolicyError;

/// Outcome of the synchronous gate pipeline: either every gate passed, or
/// one of them produced a final [`Decision`] (always a denial).
enum GateVerdict {
    Pass,
    Deny(Decision),
}

/// Composes a kill switch, compiled capabilities and a budget tracker into
/// the single deny-wins decision function every guarded action runs
/// through. Ordering is fixed: kill switch, token-per-call limit, budget and
/// rate limit, tool allow, tool deny, resource (domain) allow/deny, custom
/// checks, allow.
pub struct PolicyEngine {
    capabilities: CompiledCapabilities,
    kill_switch: Arc<KillSwitch>,
    budget: BudgetTracker,
    config: PolicyEngineConfig,
    custom_checks: Vec<Arc<dyn CustomCheck>>,
}

impl PolicyEngine {
    pub fn new(
        capabilities: CompiledCapabilities,
        kill_switch: Arc<KillSwitch>,
        config: PolicyEngineConfig,
    ) -> Self {
        let manifest = &capabilities.manifest;
        let budget = BudgetTracker::new(
            manifest.max_cost_per_session,
            manifest.max_cost_per_day,
            manifest.max_calls_per_minute,
        );
        Self {
            capabilities,
            kill_switch,
            budget,
            config,
            custom_checks: Vec::new(),
        }
    }

    pub fn with_custom_check(mut self, check: Arc<dyn CustomCheck>) -> Self {
        self.custom_checks.push(check);
        self
    }

    fn deny(&self, denied_by: DeniedBy, reason: String, elapsed_ms: f64) -> Decision {
        Decision::deny(denied_by, reason, elapsed_ms, self.config.dry_run)
    }

    /// Runs every gate up to (but not including) custom checks. Used by
    /// both the sync and async entry points so the ordering lives in one
    /// place.
    fn check_sync_gates(&self, request: &CheckRequest) -> Result<GateVerdict, PolicyError> {
        let start = Utc::now();
        let elapsed = || (Utc::now() - start).num_microseconds().unwrap_or(0) as f64 / 1000.0;

        if !self.kill_switch.should_continue() {
            return Ok(GateVerdict::Deny(self.deny(
                DeniedBy::KillSwitch,
                format!("kill switch is {:?}", self.kill_switch.state()),
                elapsed(),
            )));
        }

        if let (Some(max_tokens), Some(requested)) = (
            self.capabilities.manifest.max_tokens_per_call,
            request.estimated_tokens,
        ) {
            if requested > max_tokens {
                return Ok(GateVerdict::Deny(self.deny(
                    DeniedBy::Capability,
                    format!("requested {requested} tokens exceeds max_tokens_per_call {max_tokens}"),
                    elapsed(),
                )));
            }
        }

        let now = Utc::now();
        let budget_check = self.budget.check_budget(request.estimated_cost, now)?;
        if !budget_check.allowed {
            return Ok(GateVerdict::Deny(self.deny(
                DeniedBy::Budget,
                budget_check.reason.unwrap_or_else(|| "budget exceeded".to_string()),
                elapsed(),
            )));
        }
        let rate_check = self.budget.check_rate_limit(now)?;
        if !rate_check.allowed {
            return Ok(GateVerdict::Deny(self.deny(
                DeniedBy::Budget,
                rate_check.reason.unwrap_or_else(|| "rate limit exceeded".to_string()),
                elapsed(),
            )));
        }

        if let Some(tool) = &request.tool {
            if !wildcard_allow_or_matches(&self.capabilities.allowed_tools, tool) {
                return Ok(GateVerdict::Deny(self.deny(
                    DeniedBy::Capability,
                    format!("tool '{tool}' is not in the allowed tool list"),
                    elapsed(),
                )));
            }
            if self.capabilities.denied_tools.matches(tool) {
                return Ok(GateVerdict::Deny(self.deny(
                    DeniedBy::Capability,
                    format!("tool '{tool}' is explicitly denied"),
                    elapsed(),
                )));
            }
        }

        if let Some(domain) = &request.domain {
            if domain != "*" {
                if !wildcard_allow_or_matches(&self.capabilities.allowed_domains, domain) {
                    return Ok(GateVerdict::Deny(self.deny(
                        DeniedBy::Resource,
                        format!("domain '{domain}' is not in the allowed domain list"),
                        elapsed(),
                    )));
                }
                if self.capabilities.denied_domains.matches(domain) {
                    return Ok(GateVerdict::Deny(self.deny(
                        DeniedBy::Resource,
                        format!("domain '{domain}' is explicitly denied"),
                        elapsed(),
                    )));
                }
            }
        }

        Ok(GateVerdict::Pass)
    }

    /// Synchronous entry point: every gate except custom checks, which may
    /// need I/O. Records cost/rate usage only when the decision allows.
    pub fn check_sync(&self, request: &CheckRequest) -> Result<Decision, PolicyError> {
        let start = Utc::now();
        match self.check_sync_gates(request)? {
            GateVerdict::Deny(decision) => Ok(decision),
            GateVerdict::Pass => {
                let now = Utc::now();
                self.budget.record_cost(request.estimated_cost, now)?;
                self.budget.record_call(now)?;
                let elapsed = (Utc::now() - start).num_microseconds().unwrap_or(0) as f64 / 1000.0;
                Ok(Decision::allow("allowed", elapsed, self.config.dry_run))
            }
        }
    }

    /// Full entry point including custom checks, run in registration order
    /// after every synchronous gate passes.
    pub async fn check(&self, request: &CheckRequest) -> Result<Decision, PolicyError> {
        let start = Utc::now();
        if let GateVerdict::Deny(decision) = self.check_sync_gates(request)? {
            return Ok(decision);
        }

        let mut recommendations = Vec::new();
        for check in &self.custom_checks {
            let outcome = check.check(request).await;
            recommendations.extend(outcome.recommendations);
            if !outcome.allowed {
                let elapsed = (Utc::now() - start).num_microseconds().unwrap_or(0) as f64 / 1000.0;
                warn!(check = check.name(), "custom check denied request");
                return Ok(self
                    .deny(
                        DeniedBy::Custom,
                        outcome.reason.unwrap_or_else(|| format!("denied by custom check '{}'", check.name())),
                        elapsed,
                    )
                    .with_recommendations(recommendations));
            }
        }

        let now = Utc::now();
        self.budget.record_cost(request.estimated_cost, now)?;
        self.budget.record_call(now)?;
        let elapsed = (Utc::now() - start).num_microseconds().unwrap_or(0) as f64 / 1000.0;
        Ok(Decision::allow("allowed", elapsed, self.config.dry_run).with_recommendations(recommendations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigos_capability::manifest::{CapabilitiesManifest, CapabilityMode};
    use aigos_killswitch::{KillSwitchConfig, KillSwitch as Ks};
    use aigos_crypto::verify::KeyRegistry;

    fn engine(manifest: CapabilitiesManifest, dry_run: bool) -> PolicyEngine {
        let caps = CompiledCapabilities::compile(manifest);
        let ks = Arc::new(Ks::new(
            KillSwitchConfig {
                require_signature: false,
                ..KillSwitchConfig::default()
            },
            KeyRegistry::new(),
        ));
        PolicyEngine::new(caps, ks, PolicyEngineConfig { dry_run })
    }

    fn basic_manifest() -> CapabilitiesManifest {
        CapabilitiesManifest {
            allowed_tools: vec!["search_*".to_string()],
            denied_tools: vec![],
            allowed_domains: vec!["*.example.com".to_string()],
            denied_domains: vec![],
            max_cost_per_session: Some(100.0),
            max_cost_per_day: Some(1000.0),
            max_tokens_per_call: Some(4096),
            max_calls_per_minute: Some(60),
            may_spawn_children: false,
            max_child_depth: 0,
            capability_mode: CapabilityMode::Decay,
        }
    }

    #[test]
    fn basic_allow_scenario() {
        let eng = engine(basic_manifest(), false);
        let req = CheckRequest::new("call_tool")
            .tool("search_docs")
            .domain("api.example.com")
            .cost(1.0)
            .tokens(100);
        let decision = eng.check_sync(&req).unwrap();
        assert!(decision.allowed);
        assert!(decision.denied_by.is_none());
    }

    #[test]
    fn wildcard_resource_bypasses_domain_gate() {
        let mut manifest = basic_manifest();
        manifest.allowed_domains = vec!["*.example.com".to_string()];
        let eng = engine(manifest, false);
        let req = CheckRequest::new("call_tool")
            .tool("search_docs")
            .domain("*")
            .cost(1.0);
        let decision = eng.check_sync(&req).unwrap();
        assert!(decision.allowed);
    }

    #[test]
    fn kill_switch_denies_before_anything_else() {
        let eng = engine(basic_manifest(), false);
        let now = Utc::now();
        eng.kill_switch
            .process_command(
                &aigos_killswitch::KillSwitchCommand {
                    command_id: uuid::Uuid::new_v4(),
                    command: aigos_killswitch::Command::Pause,
                    reason: "test".into(),
                    issued_by: "ops".into(),
                    issued_at: now,
                    timestamp: now,
                    signature: "none:none".into(),
                    target_instance_id: None,
                },
                now,
            )
            .unwrap();

        let req = CheckRequest::new("call_tool").tool("delete_everything").cost(1_000_000.0);
        let decision = eng.check_sync(&req).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.denied_by, Some(DeniedBy::KillSwitch));
    }

    #[test]
    fn tool_not_in_allow_list_is_denied() {
        let eng = engine(basic_manifest(), false);
        let req = CheckRequest::new("call_tool").tool("delete_everything").cost(1.0);
        let decision = eng.check_sync(&req).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.denied_by, Some(DeniedBy::Capability));
    }

    #[test]
    fn deny_list_wins_over_allow_list() {
        let mut manifest = basic_manifest();
        manifest.allowed_tools = vec![];
        manifest.denied_tools = vec!["search_secrets".to_string()];
        let eng = engine(manifest, false);
        let req = CheckRequest::new("call_tool").tool("search_secrets").cost(1.0);
        let decision = eng.check_sync(&req).unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.denied_by, Some(DeniedBy::Capability));
    }

    #[test]
    fn dry_run_inverts_allowed_but_keeps_denied_by() {
        let eng = engine(basic_manifest(), true);
        let req = CheckRequest::new("call_tool").tool("delete_everything").cost(1.0);
        let decision = eng.check_sync(&req).unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.denied_by, Some(DeniedBy::Capability));
        assert!(decision.reason.starts_with("WOULD_DENY: "));
    }

    #[tokio::test]
    async fn custom_check_can_deny_async() {
        use crate::decision::CustomCheckOutcome;

        struct AlwaysDeny;
        #[async_trait::async_trait]
        impl CustomCheck for AlwaysDeny {
            fn name(&self) -> &str {
                "always_deny"
            }
            async fn check(&self, _request: &CheckRequest) -> CustomCheckOutcome {
                CustomCheckOutcome::deny("nope")
            }
        }

        let eng = engine(basic_manifest(), false).with_custom_check(Arc::new(AlwaysDeny));
        let req = CheckRequest::new("call_tool").tool("search_docs").cost(1.0);
        let decision = eng.check(&req).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.denied_by, Some(DeniedBy::Custom));
    }
}
