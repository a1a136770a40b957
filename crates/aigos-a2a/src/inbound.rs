use async_trait::async_trait;

use aigos_token::AigosClaims;
use aigos_types::{Mode, RiskLevel};

use crate::error::A2aError;

#[async_trait]
pub trait InboundPredicate: Send + Sync {
    fn name(&self) -> &str;
    async fn check(&self, claims: &AigosClaims) -> bool;
}

/// Gates applied to the caller's token on every inbound A2A call.
pub struct InboundPolicy {
    pub require_token: bool,
    pub max_risk_level: Option<RiskLevel>,
    pub require_kill_switch: bool,
    pub require_golden_thread_verified: bool,
    pub min_generation_depth: Option<u32>,
    pub max_generation_depth: Option<u32>,
    pub allowed_modes: Option<Vec<Mode>>,
    pub blocked_assets: Vec<String>,
    pub trusted_assets: Option<Vec<String>>,
    pub custom: Vec<Box<dyn InboundPredicate>>,
}

impl Default for InboundPolicy {
    fn default() -> Self {
        Self {
            require_token: true,
            max_risk_level: None,
            require_kill_switch: false,
            require_golden_thread_verified: false,
            min_generation_depth: None,
            max_generation_depth: None,
            allowed_modes: None,
            blocked_assets: Vec::new(),
            trusted_assets: None,
            custom: Vec::new(),
        }
    }
}

impl InboundPolicy {
    /// Runs every gate against a validated caller token, short-circuiting
    /// on the first violation.
    pub async fn evaluate(&self, claims: &AigosClaims) -> Result<(), A2aError> {
        if self.blocked_assets.contains(&claims.identity.asset_id) {
            return Err(A2aError::policy(
                "ASSET_BLOCKED",
                format!("asset '{}' is blocked", claims.identity.asset_id),
            ));
        }

        if let Some(trusted) = &self.trusted_assets {
            if !trusted.contains(&claims.identity.asset_id) {
                return Err(A2aError::policy(
                    "ASSET_NOT_TRUSTED",
                    format!("asset '{}' is not in the trusted set", claims.identity.asset_id),
                ));
            }
        }

        if let Some(max) = self.max_risk_level {
            if claims.governance.risk_level > max {
                return Err(A2aError::policy(
                    "RISK_LEVEL_EXCEEDED",
                    format!("risk level {:?} exceeds maximum {:?}", claims.governance.risk_level, max),
                ));
            }
        }

        if self.require_kill_switch && !claims.control.kill_switch.enabled {
            return Err(A2aError::policy(
                "KILL_SWITCH_REQUIRED",
                "caller does not report an enabled kill switch".to_string(),
            ));
        }

        if self.require_golden_thread_verified && !claims.governance.golden_thread.verified {
            return Err(A2aError::policy(
                "GOLDEN_THREAD_UNVERIFIED",
                "caller's golden thread is not verified".to_string(),
            ));
        }

        if let Some(min) = self.min_generation_depth {
            if claims.lineage.generation_depth < min {
                return Err(A2aError::policy(
                    "GENERATION_DEPTH_TOO_SHALLOW",
                    format!("generation depth {} is below minimum {min}", claims.lineage.generation_depth),
                ));
            }
        }
        if let Some(max) = self.max_generation_depth {
            if claims.lineage.generation_depth > max {
                return Err(A2aError::policy(
                    "GENERATION_DEPTH_TOO_DEEP",
                    format!("generation depth {} exceeds maximum {max}", claims.lineage.generation_depth),
                ));
            }
        }

        if let Some(allowed) = &self.allowed_modes {
            if !allowed.contains(&claims.governance.mode) {
                return Err(A2aError::policy(
                    "MODE_NOT_ALLOWED",
                    format!("mode {:?} is not in the allowed set", claims.governance.mode),
                ));
            }
        }

        for predicate in &self.custom {
            if !predicate.check(claims).await {
                return Err(A2aError::policy(
                    "CUSTOM_PREDICATE_FAILED",
                    format!("custom predicate '{}' rejected the caller", predicate.name()),
                ));
            }
        }

        Ok(())
    }
}
