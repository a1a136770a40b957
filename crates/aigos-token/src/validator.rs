use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};

use crate::algorithm::{SigningAlgorithm, VerifyingKey};
use crate::claims::{AigosClaims, CapabilitiesClaim};
use crate::error::{TokenError, TokenWarning};
use crate::jwks::JwksCache;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Locally trusted keys, keyed by `kid`. Consulted before falling back to
/// the JWKS cache.
#[derive(Default, Clone)]
pub struct TrustedKeys {
    keys: HashMap<String, VerifyingKey>,
}

impl TrustedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, kid: impl Into<String>, key: VerifyingKey) -> Self {
        self.keys.insert(kid.into(), key);
        self
    }

    pub fn get(&self, kid: &str) -> Option<VerifyingKey> {
        self.keys.get(kid).cloned()
    }
}

#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    pub allowed_algorithms: Vec<SigningAlgorithm>,
    pub issuer: String,
    pub audience: String,
    pub max_clock_skew_seconds: i64,
    pub validate_control_claims: bool,
    pub expiring_soon_seconds: i64,
}

impl ValidatorConfig {
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            allowed_algorithms: vec![
                SigningAlgorithm::Rs256,
                SigningAlgorithm::Es256,
                SigningAlgorithm::Hs256,
                SigningAlgorithm::EdDsa,
            ],
            issuer: issuer.into(),
            audience: audience.into(),
            max_clock_skew_seconds: 60,
            validate_control_claims: true,
            expiring_soon_seconds: 30,
        }
    }
}

pub struct ValidationOutcome {
    pub claims: AigosClaims,
    pub warnings: Vec<TokenWarning>,
}

/// Validates AIGOS governance tokens in the fixed order from the generator's
/// contract: format, key resolution, signature, standard claims, AIGOS
/// claim shape, control claims, then an optional capability-escalation
/// check against a known parent.
pub struct TokenValidator {
    trusted: TrustedKeys,
    jwks: Option<Arc<JwksCache>>,
    config: ValidatorConfig,
}

impl TokenValidator {
    pub fn new(trusted: TrustedKeys, jwks: Option<Arc<JwksCache>>, config: ValidatorConfig) -> Self {
        Self { trusted, jwks, config }
    }

    pub async fn validate(
        &self,
        token: &str,
        now: DateTime<Utc>,
        parent_capabilities: Option<&CapabilitiesClaim>,
    ) -> Result<ValidationOutcome, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, payload_b64, signature_b64] = parts.as_slice() else {
            return Err(TokenError::InvalidFormat);
        };

        let header_bytes = B64.decode(header_b64).map_err(|_| TokenError::InvalidFormat)?;
        let header: serde_json::Value =
            serde_json::from_slice(&header_bytes).map_err(|_| TokenError::InvalidFormat)?;
        let alg_name = header.get("alg").and_then(|v| v.as_str()).ok_or(TokenError::InvalidFormat)?;
        let algorithm = SigningAlgorithm::from_header_name(alg_name).ok_or(TokenError::InvalidFormat)?;
        if !self.config.allowed_algorithms.contains(&algorithm) {
            return Err(TokenError::InvalidFormat);
        }
        let kid = header
            .get("kid")
            .and_then(|v| v.as_str())
            .ok_or(TokenError::InvalidFormat)?
            .to_string();

        let payload_bytes = B64.decode(payload_b64).map_err(|_| TokenError::InvalidFormat)?;
        let claims: AigosClaims =
            serde_json::from_slice(&payload_bytes).map_err(|_| TokenError::InvalidFormat)?;
        let signature_bytes = B64.decode(signature_b64).map_err(|_| TokenError::InvalidFormat)?;

        let key = match self.trusted.get(&kid) {
            Some(key) => key,
            None => match &self.jwks {
                Some(cache) => cache.get(&kid, now).await?,
                None => {
                    return Err(TokenError::KeyNotFound(Some(kid), algorithm.header_name().to_string()))
                }
            },
        };
        if key.algorithm() != algorithm {
            return Err(TokenError::KeyNotFound(Some(kid), algorithm.header_name().to_string()));
        }

        let signing_input = format!("{header_b64}.{payload_b64}");
        key.verify(signing_input.as_bytes(), &signature_bytes)?;

        if claims.iss != self.config.issuer {
            return Err(TokenError::InvalidIssuer);
        }
        if claims.aud != self.config.audience {
            return Err(TokenError::InvalidAudience);
        }
        let skew = self.config.max_clock_skew_seconds;
        if claims.nbf > now.timestamp() + skew {
            return Err(TokenError::NotYetValid);
        }
        if claims.exp < now.timestamp() - skew {
            return Err(TokenError::Expired);
        }

        claims.validate_shape()?;

        if self.config.validate_control_claims {
            if claims.control.paused {
                return Err(TokenError::Paused);
            }
            if claims.control.termination_pending {
                return Err(TokenError::TerminationPending);
            }
        }

        if let Some(parent) = parent_capabilities {
            for tool in &claims.capabilities.tools {
                if !parent.tools.iter().any(|t| t == tool) {
                    return Err(TokenError::CapabilityEscalation(format!(
                        "tool '{tool}' is not in the parent's capability set"
                    )));
                }
            }
            if let (Some(child_budget), Some(parent_budget)) =
                (claims.capabilities.max_budget_usd, parent.max_budget_usd)
            {
                if child_budget > parent_budget {
                    return Err(TokenError::CapabilityEscalation(
                        "maxBudgetUsd exceeds the parent's budget".to_string(),
                    ));
                }
            }
        }

        let mut warnings = Vec::new();
        if claims.is_expiring_soon(now, self.config.expiring_soon_seconds) {
            warnings.push(TokenWarning::ExpiringSoon);
        }

        Ok(ValidationOutcome { claims, warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::SigningKey;
    use crate::claims::{
        CapabilitiesClaim, ControlClaim, GoldenThreadClaim, GovernanceClaim, IdentityClaim,
        KillSwitchClaim, LineageClaim,
    };
    use crate::generator::{TokenConfig, TokenGenerator};
    use aigos_killswitch::Channel;
    use aigos_types::{InstanceId, Mode, RiskLevel};
    use chrono::Duration;

    fn issue_token(
        signing_key: SigningKey,
        config: TokenConfig,
        now: DateTime<Utc>,
        mutate: impl FnOnce(&mut CapabilitiesClaim, &mut ControlClaim),
    ) -> (String, InstanceId) {
        let generator = TokenGenerator::new(signing_key, config);
        let instance_id = InstanceId::new();
        let identity = IdentityClaim {
            instance_id,
            asset_id: "asset-1".into(),
            asset_name: "demo".into(),
            asset_version: "1.0.0".into(),
        };
        let governance = GovernanceClaim {
            risk_level: RiskLevel::Limited,
            mode: Mode::Normal,
            golden_thread: GoldenThreadClaim {
                hash: "sha256:abc".into(),
                verified: true,
                ticket_id: None,
            },
        };
        let mut control = ControlClaim {
            kill_switch: KillSwitchClaim { enabled: true, channel: Channel::Sse },
            paused: false,
            termination_pending: false,
        };
        let mut capabilities = CapabilitiesClaim {
            hash: "sha256:def".into(),
            tools: vec!["search_*".into()],
            max_budget_usd: Some(10.0),
            can_spawn: false,
            max_child_depth: 0,
        };
        mutate(&mut capabilities, &mut control);
        let lineage = LineageClaim {
            generation_depth: 0,
            parent_instance_id: None,
            root_instance_id: instance_id,
        };
        let (token, _) = generator
            .issue(identity, governance, control, capabilities, lineage, now)
            .unwrap();
        (token, instance_id)
    }

    fn base_config() -> (SigningKey, TokenConfig, TrustedKeys, ValidatorConfig) {
        let secret = b"shared-secret".to_vec();
        let signing_key = SigningKey::Hmac(secret.clone());
        let gen_config = TokenConfig::new("key-1", "aigos", "aigos-agents");
        let trusted = TrustedKeys::new().with_key("key-1", VerifyingKey::Hmac(secret));
        let validator_config = ValidatorConfig::new("aigos", "aigos-agents");
        (signing_key, gen_config, trusted, validator_config)
    }

    #[tokio::test]
    async fn valid_token_round_trips() {
        let (key, gen_config, trusted, validator_config) = base_config();
        let now = Utc::now();
        let (token, instance_id) = issue_token(key, gen_config, now, |_, _| {});

        let validator = TokenValidator::new(trusted, None, validator_config);
        let outcome = validator.validate(&token, now, None).await.unwrap();
        assert_eq!(outcome.claims.sub, instance_id.to_string());
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let (key, gen_config, trusted, validator_config) = base_config();
        let now = Utc::now();
        let (mut token, _) = issue_token(key, gen_config, now, |_, _| {});
        token.push('x');

        let validator = TokenValidator::new(trusted, None, validator_config);
        let result = validator.validate(&token, now, None).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn expiry_accepted_within_skew_rejected_beyond() {
        let (key, mut gen_config, trusted, mut validator_config) = base_config();
        gen_config.default_ttl_seconds = 1;
        validator_config.max_clock_skew_seconds = 60;
        let now = Utc::now();
        let (token, _) = issue_token(key, gen_config, now, |_, _| {});

        let validator = TokenValidator::new(trusted, None, validator_config);
        let exp = now.timestamp() + 1;

        let accepted_at = DateTime::from_timestamp(exp + 60, 0).unwrap();
        assert!(validator.validate(&token, accepted_at, None).await.is_ok());

        let rejected_at = DateTime::from_timestamp(exp + 62, 0).unwrap();
        let err = validator.validate(&token, rejected_at, None).await.unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[tokio::test]
    async fn paused_control_claim_is_rejected() {
        let (key, gen_config, trusted, validator_config) = base_config();
        let now = Utc::now();
        let (token, _) = issue_token(key, gen_config, now, |_, control| control.paused = true);

        let validator = TokenValidator::new(trusted, None, validator_config);
        let err = validator.validate(&token, now, None).await.unwrap_err();
        assert_eq!(err, TokenError::Paused);
    }

    #[tokio::test]
    async fn capability_escalation_beyond_parent_is_rejected() {
        let (key, gen_config, trusted, validator_config) = base_config();
        let now = Utc::now();
        let (token, _) = issue_token(key, gen_config, now, |caps, _| {
            caps.tools = vec!["search_*".into(), "admin_*".into()];
        });

        let validator = TokenValidator::new(trusted, None, validator_config);
        let parent = CapabilitiesClaim {
            hash: "sha256:parent".into(),
            tools: vec!["search_*".into()],
            max_budget_usd: Some(10.0),
            can_spawn: false,
            max_child_depth: 0,
        };
        let err = validator.validate(&token, now, Some(&parent)).await.unwrap_err();
        assert!(matches!(err, TokenError::CapabilityEscalation(_)));
    }

    #[tokio::test]
    async fn expiring_soon_warning_is_non_fatal() {
        let (key, mut gen_config, trusted, mut validator_config) = base_config();
        gen_config.default_ttl_seconds = 10;
        validator_config.expiring_soon_seconds = 30;
        let now = Utc::now();
        let (token, _) = issue_token(key, gen_config, now, |_, _| {});

        let validator = TokenValidator::new(trusted, None, validator_config);
        let outcome = validator.validate(&token, now, None).await.unwrap();
        assert!(outcome.warnings.contains(&TokenWarning::ExpiringSoon));
    }
}
