use aigos_capability::pattern::{wildcard_allow_or_matches, PatternSet};
use aigos_token::AigosClaims;
use aigos_types::RiskLevel;

use crate::error::A2aError;

/// Gates applied before dialing a peer (pre-flight, on the target URL's
/// host) and after the peer's handshake response token validates
/// (post-handshake, on the peer's own claims).
pub struct OutboundPolicy {
    pub blocked_domains: PatternSet,
    pub allowed_domains: Option<PatternSet>,
    pub max_target_risk_level: Option<RiskLevel>,
    pub require_target_kill_switch: bool,
    pub require_target_golden_thread_verified: bool,
    pub blocked_target_assets: Vec<String>,
}

impl OutboundPolicy {
    pub fn new(blocked_domains: &[String], allowed_domains: Option<&[String]>) -> Self {
        Self {
            blocked_domains: PatternSet::compile(blocked_domains),
            allowed_domains: allowed_domains.map(PatternSet::compile),
            max_target_risk_level: None,
            require_target_kill_switch: false,
            require_target_golden_thread_verified: false,
            blocked_target_assets: Vec::new(),
        }
    }

    /// Host-based check run before the handshake is attempted at all.
    pub fn preflight(&self, host: &str) -> Result<(), A2aError> {
        if self.blocked_domains.matches(host) {
            return Err(A2aError::policy(
                "DOMAIN_BLOCKED",
                format!("target host '{host}' is blocked"),
            ));
        }
        if let Some(allowed) = &self.allowed_domains {
            if !wildcard_allow_or_matches(allowed, host) {
                return Err(A2aError::policy(
                    "DOMAIN_NOT_ALLOWED",
                    format!("target host '{host}' is not in the allowed domain list"),
                ));
            }
        }
        Ok(())
    }

    /// Claim-based check run against the peer's response token once it has
    /// validated.
    pub fn post_handshake(&self, peer_claims: &AigosClaims) -> Result<(), A2aError> {
        if self.blocked_target_assets.contains(&peer_claims.identity.asset_id) {
            return Err(A2aError::policy(
                "TARGET_ASSET_BLOCKED",
                format!("target asset '{}' is blocked", peer_claims.identity.asset_id),
            ));
        }
        if let Some(max) = self.max_target_risk_level {
            if peer_claims.governance.risk_level > max {
                return Err(A2aError::policy(
                    "TARGET_RISK_LEVEL_EXCEEDED",
                    format!(
                        "target risk level {:?} exceeds maximum {:?}",
                        peer_claims.governance.risk_level, max
                    ),
                ));
            }
        }
        if self.require_target_kill_switch && !peer_claims.control.kill_switch.enabled {
            return Err(A2aError::policy(
                "TARGET_KILL_SWITCH_REQUIRED",
                "target does not report an enabled kill switch".to_string(),
            ));
        }
        if self.require_target_golden_thread_verified && !peer_claims.governance.golden_thread.verified {
            return Err(A2aError::policy(
                "TARGET_GOLDEN_THREAD_UNVERIFIED",
                "target's golden thread is not verified".to_string(),
            ));
        }
        Ok(())
    }
}
