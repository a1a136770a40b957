use std::future::Future;
use std::sync::Arc;

use serde_json::json;

use aigos_capability::{ChildOptions, DecayResult};
use aigos_identity::{ChildAsset, RuntimeIdentity};
use aigos_killswitch::KillSwitch;
use aigos_policy::{CheckRequest, Decision, PolicyEngine};

use crate::decay_manager::CapabilityDecayManager;
use crate::error::RuntimeError;
use crate::guard::GuardDenied;

/// Ties one runtime identity to the single policy engine, kill switch and
/// (optional) capability decay manager that govern it. Most callers never
/// touch the policy engine or kill switch directly: `checkAction`/
/// `checkTool`/`checkDomain` and the scoped guard are the whole surface.
pub struct RuntimeContext {
    pub identity: RuntimeIdentity,
    engine: PolicyEngine,
    pub kill_switch: Arc<KillSwitch>,
    decay: Option<CapabilityDecayManager>,
}

impl RuntimeContext {
    pub fn new(identity: RuntimeIdentity, engine: PolicyEngine, kill_switch: Arc<KillSwitch>) -> Self {
        Self {
            identity,
            engine,
            kill_switch,
            decay: None,
        }
    }

    pub fn with_decay_manager(mut self, decay: CapabilityDecayManager) -> Self {
        self.decay = Some(decay);
        self
    }

    pub fn decay_manager(&self) -> Option<&CapabilityDecayManager> {
        self.decay.as_ref()
    }

    /// Generic action check. `resource`, when given, rides along under the
    /// request's `params["resource"]` rather than the `tool`/`domain` gates,
    /// since an arbitrary action's resource isn't necessarily either.
    pub fn check_action(
        &self,
        action: impl Into<String>,
        resource: Option<&str>,
    ) -> Result<Decision, RuntimeError> {
        let mut request = CheckRequest::new(action);
        if let Some(resource) = resource {
            request.params.insert("resource".to_string(), json!(resource));
        }
        Ok(self.engine.check_sync(&request)?)
    }

    pub fn check_tool(&self, tool: impl Into<String>) -> Result<Decision, RuntimeError> {
        Ok(self.engine.check_sync(&CheckRequest::new("call_tool").tool(tool))?)
    }

    pub fn check_domain(&self, domain: impl Into<String>) -> Result<Decision, RuntimeError> {
        Ok(self.engine.check_sync(&CheckRequest::new("access_domain").domain(domain))?)
    }

    /// Runs every synchronous gate against an arbitrary, caller-built request.
    pub fn check_sync(&self, request: &CheckRequest) -> Result<Decision, RuntimeError> {
        Ok(self.engine.check_sync(request)?)
    }

    /// Full check including async custom checks.
    pub async fn check(&self, request: &CheckRequest) -> Result<Decision, RuntimeError> {
        Ok(self.engine.check(request).await?)
    }

    /// Scoped guard: runs `work` only if `request` clears the policy engine.
    /// On denial, raises [`GuardDenied`] when `throw_on_deny` is set;
    /// otherwise returns `Ok(None)` so the caller can skip the gated block.
    pub fn guard<T>(
        &self,
        request: CheckRequest,
        throw_on_deny: bool,
        work: impl FnOnce() -> T,
    ) -> Result<Option<T>, RuntimeError> {
        let decision = self.engine.check_sync(&request)?;
        if decision.allowed {
            Ok(Some(work()))
        } else if throw_on_deny {
            Err(GuardDenied { decision }.into())
        } else {
            Ok(None)
        }
    }

    /// Async counterpart of [`guard`](Self::guard), running custom checks too.
    pub async fn guard_async<T, Fut>(
        &self,
        request: CheckRequest,
        throw_on_deny: bool,
        work: impl FnOnce() -> Fut,
    ) -> Result<Option<T>, RuntimeError>
    where
        Fut: Future<Output = T>,
    {
        let decision = self.engine.check(&request).await?;
        if decision.allowed {
            Ok(Some(work().await))
        } else if throw_on_deny {
            Err(GuardDenied { decision }.into())
        } else {
            Ok(None)
        }
    }

    /// Spawns a child identity through the configured decay manager.
    pub fn spawn_child(
        &self,
        asset: ChildAsset,
        options: &ChildOptions,
    ) -> Result<(RuntimeIdentity, DecayResult), RuntimeError> {
        let decay = self.decay.as_ref().ok_or(RuntimeError::NoDecayManager)?;
        Ok(decay.spawn_child(&self.identity, asset, options)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigos_capability::{CapabilitiesManifest, CapabilityMode, CompiledCapabilities};
    use aigos_crypto::verify::KeyRegistry;
    use aigos_identity::{GoldenThread, IdentityBuilder};
    use aigos_killswitch::{Command, KillSwitchCommand, KillSwitchConfig};
    use aigos_policy::PolicyEngineConfig;
    use aigos_types::RiskLevel;
    use chrono::Utc;
    use uuid::Uuid;

    fn manifest() -> CapabilitiesManifest {
        CapabilitiesManifest {
            allowed_tools: vec!["search_*".to_string()],
            denied_tools: vec![],
            allowed_domains: vec!["*.example.com".to_string()],
            denied_domains: vec![],
            max_cost_per_session: Some(100.0),
            max_cost_per_day: Some(1000.0),
            max_tokens_per_call: None,
            max_calls_per_minute: None,
            may_spawn_children: true,
            max_child_depth: 2,
            capability_mode: CapabilityMode::Decay,
        }
    }

    fn identity() -> RuntimeIdentity {
        IdentityBuilder::new()
            .asset("asset-1", "Agent", "1.0.0")
            .risk_level(RiskLevel::Limited)
            .golden_thread(GoldenThread::Orphan {
                reason: "n/a".into(),
                declared_by: "owner".into(),
                declared_at: Utc::now(),
                remediation_deadline: Utc::now() + chrono::Duration::days(10),
                remediation_note: "".into(),
            })
            .capabilities(manifest())
            .build()
            .unwrap()
    }

    fn context() -> RuntimeContext {
        let caps = CompiledCapabilities::compile(manifest());
        let ks = Arc::new(KillSwitch::new(
            KillSwitchConfig {
                require_signature: false,
                ..KillSwitchConfig::default()
            },
            KeyRegistry::new(),
        ));
        let engine = PolicyEngine::new(caps, ks.clone(), PolicyEngineConfig::default());
        RuntimeContext::new(identity(), engine, ks)
    }

    #[test]
    fn check_tool_allows_within_manifest() {
        let ctx = context();
        let decision = ctx.check_tool("search_docs").unwrap();
        assert!(decision.allowed);
    }

    #[test]
    fn check_domain_denies_outside_manifest() {
        let ctx = context();
        let decision = ctx.check_domain("evil.org").unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn check_action_attaches_resource_to_params() {
        let ctx = context();
        let decision = ctx.check_action("read_file", Some("/etc/passwd")).unwrap();
        assert!(decision.allowed);
    }

    #[test]
    fn kill_switch_pause_blocks_every_check() {
        let ctx = context();
        let now = Utc::now();
        ctx.kill_switch
            .process_command(
                &KillSwitchCommand {
                    command_id: Uuid::new_v4(),
                    command: Command::Pause,
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

        let decision = ctx.check_tool("search_docs").unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn guard_runs_work_when_allowed() {
        let ctx = context();
        let request = CheckRequest::new("call_tool").tool("search_docs");
        let result = ctx.guard(request, true, || 42).unwrap();
        assert_eq!(result, Some(42));
    }

    #[test]
    fn guard_raises_guard_denied_when_throw_on_deny() {
        let ctx = context();
        let request = CheckRequest::new("call_tool").tool("delete_everything");
        let err = ctx.guard(request, true, || 42).unwrap_err();
        match err {
            RuntimeError::GuardDenied(denied) => assert!(!denied.decision.allowed),
            other => panic!("expected GuardDenied, got {other:?}"),
        }
    }

    #[test]
    fn guard_returns_none_when_not_throwing() {
        let ctx = context();
        let request = CheckRequest::new("call_tool").tool("delete_everything");
        let result = ctx.guard(request, false, || 42).unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn guard_async_runs_work_when_allowed() {
        let ctx = context();
        let request = CheckRequest::new("call_tool").tool("search_docs");
        let result = ctx.guard_async(request, true, || async { 7 }).await.unwrap();
        assert_eq!(result, Some(7));
    }

    #[test]
    fn spawn_child_without_decay_manager_errors() {
        let ctx = context();
        let asset = ChildAsset {
            asset_id: "child-1".into(),
            asset_name: "Child".into(),
            asset_version: "1.0.0".into(),
            golden_thread: GoldenThread::Orphan {
                reason: "n/a".into(),
                declared_by: "owner".into(),
                declared_at: Utc::now(),
                remediation_deadline: Utc::now() + chrono::Duration::days(10),
                remediation_note: "".into(),
            },
        };
        let result = ctx.spawn_child(asset, &ChildOptions::default());
        assert!(matches!(result, Err(RuntimeError::NoDecayManager)));
    }

    #[test]
    fn spawn_child_with_decay_manager_succeeds() {
        let ctx = context().with_decay_manager(CapabilityDecayManager::default());
        let asset = ChildAsset {
            asset_id: "child-1".into(),
            asset_name: "Child".into(),
            asset_version: "1.0.0".into(),
            golden_thread: GoldenThread::Orphan {
                reason: "n/a".into(),
                declared_by: "owner".into(),
                declared_at: Utc::now(),
                remediation_deadline: Utc::now() + chrono::Duration::days(10),
                remediation_note: "".into(),
            },
        };
        let (child, decay) = ctx.spawn_child(asset, &ChildOptions::default()).unwrap();
        assert!(decay.valid);
        assert_eq!(child.lineage.generation_depth, 1);
    }
}
