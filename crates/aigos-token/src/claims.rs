//! The AIGOS claim block carried inside a governance token, plus the
//! standard JWT claims it rides alongside.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aigos_killswitch::Channel;
use aigos_types::{InstanceId, Mode, RiskLevel};

use crate::error::TokenError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityClaim {
    pub instance_id: InstanceId,
    pub asset_id: String,
    pub asset_name: String,
    pub asset_version: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoldenThreadClaim {
    pub hash: String,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceClaim {
    pub risk_level: RiskLevel,
    pub mode: Mode,
    pub golden_thread: GoldenThreadClaim,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillSwitchClaim {
    pub enabled: bool,
    pub channel: Channel,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlClaim {
    pub kill_switch: KillSwitchClaim,
    pub paused: bool,
    pub termination_pending: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesClaim {
    pub hash: String,
    pub tools: Vec<String>,
    pub max_budget_usd: Option<f64>,
    pub can_spawn: bool,
    pub max_child_depth: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageClaim {
    pub generation_depth: u32,
    pub parent_instance_id: Option<InstanceId>,
    pub root_instance_id: InstanceId,
}

/// The full set of claims carried in an AIGOS governance token, standard
/// JWT registered claims included.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AigosClaims {
    pub version: u32,
    pub identity: IdentityClaim,
    pub governance: GovernanceClaim,
    pub control: ControlClaim,
    pub capabilities: CapabilitiesClaim,
    pub lineage: LineageClaim,

    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl AigosClaims {
    /// Shape/enum validation the validator runs after the signature check:
    /// `sub` must match the identity, lineage depth-zero iff parentless,
    /// and a spawn-capable token must reserve depth for its children.
    pub fn validate_shape(&self) -> Result<(), TokenError> {
        if self.sub != self.identity.instance_id.to_string() {
            return Err(TokenError::InvalidClaims(
                "sub does not match identity.instanceId".to_string(),
            ));
        }
        let depth_zero = self.lineage.generation_depth == 0;
        let parentless = self.lineage.parent_instance_id.is_none();
        if depth_zero != parentless {
            return Err(TokenError::InvalidClaims(
                "generationDepth == 0 must be equivalent to a null parentInstanceId".to_string(),
            ));
        }
        if self.capabilities.can_spawn && self.capabilities.max_child_depth < 1 {
            return Err(TokenError::InvalidClaims(
                "canSpawn=true requires maxChildDepth >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_expiring_soon(&self, now: DateTime<Utc>, within_seconds: i64) -> bool {
        self.exp - now.timestamp() <= within_seconds
    }
}
