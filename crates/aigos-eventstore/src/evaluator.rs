use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use aigos_capability::PatternSet;
use aigos_identity::GoldenThread;

use crate::bundle::{ConformanceTarget, PolicyBundle, Rule, Severity};
use crate::event::{Criticality, GovernanceEvent};

/// Event types the policy evaluator actually runs against. Anything else
/// passes through unevaluated (`evaluate` returns `None`).
fn evaluated_type_patterns() -> PatternSet {
    PatternSet::compile(&["asset.*", "scan.completed", "classification.changed"])
}

const STALE_THREAD_DAYS: i64 = 30;
const ORPHAN_APPROACHING_DAYS: i64 = 7;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub message: String,
    pub remediation: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GovernanceWarning {
    OrphanDeadlineApproaching,
    OrphanDeadlineOverdue,
    LinkedThreadStale,
    LinkedThreadNotActive,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Suggestion {
    SuggestLinkThread,
    SuggestCorrelationId,
    SuggestSignHighCrit,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub passed: bool,
    pub violations: Vec<Violation>,
    pub governance_warnings: Vec<GovernanceWarning>,
    pub conformance_gaps: Vec<String>,
    pub suggestions: Vec<Suggestion>,
}

/// Runs an event against its organisation's active policy bundle. Pure:
/// takes the bundle and event by reference, never touches storage itself.
pub struct PolicyEvaluator {
    evaluated_types: PatternSet,
}

impl Default for PolicyEvaluator {
    fn default() -> Self {
        Self {
            evaluated_types: evaluated_type_patterns(),
        }
    }
}

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when no bundle is active for the event's org, or the event's
    /// type is not one the evaluator runs against.
    pub fn evaluate(
        &self,
        event: &GovernanceEvent,
        bundle: Option<&PolicyBundle>,
        now: DateTime<Utc>,
    ) -> Option<EvaluationOutcome> {
        if !self.evaluated_types.matches(&event.event_type) {
            return None;
        }
        let bundle = bundle?;

        let violations = self.run_rules(event, bundle, now);
        let passed = !violations.iter().any(|v| v.severity == Severity::Blocking);

        Some(EvaluationOutcome {
            passed,
            violations,
            governance_warnings: governance_warnings(event, now),
            conformance_gaps: conformance_gaps(event, bundle.conformance_target),
            suggestions: suggestions(event),
        })
    }

    fn run_rules(&self, event: &GovernanceEvent, bundle: &PolicyBundle, now: DateTime<Utc>) -> Vec<Violation> {
        bundle
            .rules
            .iter()
            .filter(|rule| rule_applies(rule, &event.event_type))
            .filter_map(|rule| run_builtin_check(rule, event).map(|message| (rule, message)))
            .filter(|(rule, _)| !is_waived(rule, bundle, now))
            .map(|(rule, message)| Violation {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                severity: rule.severity,
                message,
                remediation: rule.remediation.clone(),
            })
            .collect()
    }
}

fn rule_applies(rule: &Rule, event_type: &str) -> bool {
    rule.applies_to.is_empty() || PatternSet::compile(&rule.applies_to).matches(event_type)
}

fn is_waived(rule: &Rule, bundle: &PolicyBundle, now: DateTime<Utc>) -> bool {
    bundle
        .waivers
        .iter()
        .any(|w| w.rule_id == rule.id && w.is_active(now))
}

/// Returns `Some(message)` when the named builtin check is triggered
/// (violated) for this event; unknown check names never trigger.
fn run_builtin_check(rule: &Rule, event: &GovernanceEvent) -> Option<String> {
    match rule.check.as_str() {
        "require_signature" => event
            .signature
            .is_none()
            .then(|| "event carries no signature".to_string()),
        "require_correlation_id" => event
            .correlation_id
            .is_none()
            .then(|| "event carries no correlationId".to_string()),
        "require_previous_hash" => event
            .previous_hash
            .is_none()
            .then(|| "event carries no previousHash".to_string()),
        "require_linked_golden_thread" => (!event.golden_thread.is_linked())
            .then(|| "event's golden thread is not linked".to_string()),
        "deny_high_criticality" => (event.criticality >= Criticality::High)
            .then(|| format!("event criticality {:?} is denied", event.criticality)),
        other => {
            warn!(check = other, rule_id = %rule.id, "unknown builtin policy check, skipping");
            None
        }
    }
}

fn governance_warnings(event: &GovernanceEvent, now: DateTime<Utc>) -> Vec<GovernanceWarning> {
    let mut warnings = Vec::new();
    match &event.golden_thread {
        GoldenThread::Orphan { remediation_deadline, .. } => {
            if now > *remediation_deadline {
                warnings.push(GovernanceWarning::OrphanDeadlineOverdue);
            } else if *remediation_deadline - now <= Duration::days(ORPHAN_APPROACHING_DAYS) {
                warnings.push(GovernanceWarning::OrphanDeadlineApproaching);
            }
        }
        GoldenThread::Linked { status, verified_at, .. } => {
            if status != "active" {
                warnings.push(GovernanceWarning::LinkedThreadNotActive);
            }
            if let Some(verified_at) = verified_at {
                if now - *verified_at > Duration::days(STALE_THREAD_DAYS) {
                    warnings.push(GovernanceWarning::LinkedThreadStale);
                }
            }
        }
    }
    warnings
}

fn conformance_gaps(event: &GovernanceEvent, target: Option<ConformanceTarget>) -> Vec<String> {
    let mut gaps = Vec::new();
    match target {
        Some(ConformanceTarget::Silver) if event.signature.is_none() => {
            gaps.push("SILVER requires a signature".to_string());
        }
        Some(ConformanceTarget::Gold) => {
            if event.signature.is_none() {
                gaps.push("GOLD requires a signature".to_string());
            }
            if event.previous_hash.is_none() {
                gaps.push("GOLD requires a previousHash".to_string());
            }
        }
        _ => {}
    }
    gaps
}

fn suggestions(event: &GovernanceEvent) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    if !event.golden_thread.is_linked() {
        suggestions.push(Suggestion::SuggestLinkThread);
    }
    if event.correlation_id.is_none() {
        suggestions.push(Suggestion::SuggestCorrelationId);
    }
    if event.criticality >= Criticality::High && event.signature.is_none() {
        suggestions.push(Suggestion::SuggestSignHighCrit);
    }
    suggestions
}
