use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One action a caller wants cleared against the policy engine: calling a
/// tool, reaching a domain, spending tokens, or some custom-checked action.
#[derive(Clone, Debug, Default)]
pub struct CheckRequest {
    pub action: String,
    pub tool: Option<String>,
    pub domain: Option<String>,
    pub estimated_cost: f64,
    pub estimated_tokens: Option<u64>,
    pub params: HashMap<String, Value>,
}

impl CheckRequest {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            ..Default::default()
        }
    }

    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn cost(mut self, cost: f64) -> Self {
        self.estimated_cost = cost;
        self
    }

    pub fn tokens(mut self, tokens: u64) -> Self {
        self.estimated_tokens = Some(tokens);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeniedBy {
    KillSwitch,
    Capability,
    Resource,
    Budget,
    Custom,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_by: Option<DeniedBy>,
    pub reason: String,
    pub recommendations: Vec<String>,
    pub evaluation_time_ms: f64,
    pub dry_run: bool,
}

impl Decision {
    pub fn allow(reason: impl Into<String>, evaluation_time_ms: f64, dry_run: bool) -> Self {
        Self {
            allowed: true,
            denied_by: None,
            reason: reason.into(),
            recommendations: Vec::new(),
            evaluation_time_ms,
            dry_run,
        }
    }

    pub fn deny(
        denied_by: DeniedBy,
        reason: impl Into<String>,
        evaluation_time_ms: f64,
        dry_run: bool,
    ) -> Self {
        let reason = reason.into();
        if dry_run {
            Self {
                allowed: true,
                denied_by: Some(denied_by),
                reason: format!("WOULD_DENY: {reason}"),
                recommendations: Vec::new(),
                evaluation_time_ms,
                dry_run,
            }
        } else {
            Self {
                allowed: false,
                denied_by: Some(denied_by),
                reason,
                recommendations: Vec::new(),
                evaluation_time_ms,
                dry_run,
            }
        }
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = recommendations;
        self
    }
}

/// Outcome of a single custom check. A custom check may deny outright or
/// merely attach recommendations to an otherwise-allowed decision.
#[derive(Clone, Debug)]
pub struct CustomCheckOutcome {
    pub allowed: bool,
    pub reason: Option<String>,
    pub recommendations: Vec<String>,
}

impl CustomCheckOutcome {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
            recommendations: Vec::new(),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            recommendations: Vec::new(),
        }
    }
}

/// Custom checks may touch I/O (an external allowlist service, a rate
/// limiter behind a database) so the trait is async.
#[async_trait]
pub trait CustomCheck: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, request: &CheckRequest) -> CustomCheckOutcome;
}
