use chrono::{DateTime, Utc};

use aigos_token::{
    AigosClaims, CapabilitiesClaim, ControlClaim, GovernanceClaim, IdentityClaim, LineageClaim,
    TokenGenerator, TokenValidator,
};

use crate::error::A2aError;
use crate::events::{A2aEventBus, PolicyViolatedEvent};
use crate::headers::{A2aHeaders, TOKEN_HEADER};
use crate::inbound::InboundPolicy;
use crate::outbound::OutboundPolicy;

/// The instance's own claim material, reused verbatim on every token this
/// handshake mints — only `iat`/`nbf`/`exp`/`jti` change per call.
#[derive(Clone)]
pub struct ClaimTemplate {
    pub identity: IdentityClaim,
    pub governance: GovernanceClaim,
    pub control: ControlClaim,
    pub capabilities: CapabilitiesClaim,
    pub lineage: LineageClaim,
}

pub struct InboundOutcome {
    pub caller_claims: Option<AigosClaims>,
    pub response_headers: A2aHeaders,
}

/// Ties token issuance and validation to the inbound/outbound policy gates
/// into the symmetric handshake: a caller attaches its token, the callee
/// validates it and applies inbound policy, then replies with its own
/// token; the caller validates that response token and applies outbound
/// policy to the peer it just dialed.
pub struct Handshake {
    generator: TokenGenerator,
    validator: TokenValidator,
    claim_template: ClaimTemplate,
    inbound: InboundPolicy,
    outbound: OutboundPolicy,
    events: A2aEventBus,
}

impl Handshake {
    pub fn new(
        generator: TokenGenerator,
        validator: TokenValidator,
        claim_template: ClaimTemplate,
        inbound: InboundPolicy,
        outbound: OutboundPolicy,
    ) -> Self {
        Self {
            generator,
            validator,
            claim_template,
            inbound,
            outbound,
            events: A2aEventBus::new(),
        }
    }

    pub fn events(&self) -> &A2aEventBus {
        &self.events
    }

    fn mint(&self, now: DateTime<Utc>) -> Result<(String, AigosClaims), A2aError> {
        let template = self.claim_template.clone();
        let (token, claims) = self.generator.issue(
            template.identity,
            template.governance,
            template.control,
            template.capabilities,
            template.lineage,
            now,
        )?;
        Ok((token, claims))
    }

    fn emit_violation(&self, code: &str, reason: &str, now: DateTime<Utc>) {
        self.events.emit(PolicyViolatedEvent {
            code: code.to_string(),
            reason: reason.to_string(),
            at: now,
        });
    }

    /// Callee side: validate the caller's token (if any), apply inbound
    /// policy, and mint the symmetric response token.
    pub async fn accept_inbound(
        &self,
        headers: &A2aHeaders,
        now: DateTime<Utc>,
        parent_capabilities: Option<&CapabilitiesClaim>,
    ) -> Result<InboundOutcome, A2aError> {
        let Some(token) = &headers.token else {
            if self.inbound.require_token {
                self.emit_violation("MISSING_TOKEN", "request carried no governance token", now);
                return Err(A2aError::MissingToken(TOKEN_HEADER));
            }
            let (response_token, _) = self.mint(now)?;
            return Ok(InboundOutcome {
                caller_claims: None,
                response_headers: A2aHeaders::new(Some(response_token)),
            });
        };

        let outcome = self.validator.validate(token, now, parent_capabilities).await.map_err(|err| {
            self.emit_violation(err.code(), &err.to_string(), now);
            A2aError::from(err)
        })?;

        self.inbound.evaluate(&outcome.claims).await.map_err(|err| {
            if let A2aError::PolicyViolated { code, reason } = &err {
                self.emit_violation(code, reason, now);
            }
            err
        })?;

        let (response_token, _) = self.mint(now)?;
        Ok(InboundOutcome {
            caller_claims: Some(outcome.claims),
            response_headers: A2aHeaders::new(Some(response_token)),
        })
    }

    /// Caller side, pre-dial: run the outbound domain gate and mint the
    /// request headers carrying our own token.
    pub fn initiate_outbound(&self, host: &str, now: DateTime<Utc>) -> Result<A2aHeaders, A2aError> {
        self.outbound.preflight(host).map_err(|err| {
            if let A2aError::PolicyViolated { code, reason } = &err {
                self.emit_violation(code, reason, now);
            }
            err
        })?;
        let (token, _) = self.mint(now)?;
        Ok(A2aHeaders::new(Some(token)))
    }

    /// Caller side, post-dial: validate the peer's response token and apply
    /// the outbound claim-based gate to it.
    pub async fn finalize_outbound(
        &self,
        response_headers: &A2aHeaders,
        now: DateTime<Utc>,
    ) -> Result<AigosClaims, A2aError> {
        let Some(token) = &response_headers.token else {
            self.emit_violation("MISSING_TOKEN", "peer responded with no governance token", now);
            return Err(A2aError::MissingToken(TOKEN_HEADER));
        };

        let outcome = self.validator.validate(token, now, None).await.map_err(|err| {
            self.emit_violation(err.code(), &err.to_string(), now);
            A2aError::from(err)
        })?;

        self.outbound.post_handshake(&outcome.claims).map_err(|err| {
            if let A2aError::PolicyViolated { code, reason } = &err {
                self.emit_violation(code, reason, now);
            }
            err
        })?;

        Ok(outcome.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigos_killswitch::Channel;
    use aigos_token::algorithm::{SigningKey, VerifyingKey};
    use aigos_token::claims::{GoldenThreadClaim, KillSwitchClaim};
    use aigos_token::validator::{TrustedKeys, ValidatorConfig};
    use aigos_token::generator::TokenConfig;
    use aigos_types::{InstanceId, Mode, RiskLevel};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn template() -> ClaimTemplate {
        let instance_id = InstanceId::new();
        ClaimTemplate {
            identity: IdentityClaim {
                instance_id,
                asset_id: "asset-1".into(),
                asset_name: "demo".into(),
                asset_version: "1.0.0".into(),
            },
            governance: GovernanceClaim {
                risk_level: RiskLevel::Limited,
                mode: Mode::Normal,
                golden_thread: GoldenThreadClaim {
                    hash: "sha256:abc".into(),
                    verified: true,
                    ticket_id: None,
                },
            },
            control: ControlClaim {
                kill_switch: KillSwitchClaim { enabled: true, channel: Channel::Sse },
                paused: false,
                termination_pending: false,
            },
            capabilities: CapabilitiesClaim {
                hash: "sha256:def".into(),
                tools: vec!["search_*".into()],
                max_budget_usd: Some(10.0),
                can_spawn: false,
                max_child_depth: 0,
            },
            lineage: LineageClaim {
                generation_depth: 0,
                parent_instance_id: None,
                root_instance_id: instance_id,
            },
        }
    }

    fn build_handshake() -> Handshake {
        let secret = b"shared-secret".to_vec();
        let generator = TokenGenerator::new(SigningKey::Hmac(secret.clone()), TokenConfig::new("key-1", "aigos", "aigos-agents"));
        let trusted = TrustedKeys::new().with_key("key-1", VerifyingKey::Hmac(secret));
        let validator = TokenValidator::new(trusted, None, ValidatorConfig::new("aigos", "aigos-agents"));
        Handshake::new(generator, validator, template(), InboundPolicy::default(), OutboundPolicy::new(&[], None))
    }

    #[tokio::test]
    async fn missing_token_rejected_when_required() {
        let handshake = build_handshake();
        let headers = A2aHeaders::new(None);
        let err = handshake.accept_inbound(&headers, Utc::now(), None).await.unwrap_err();
        assert!(matches!(err, A2aError::MissingToken(_)));
    }

    #[tokio::test]
    async fn missing_token_allowed_on_exempt_path() {
        let mut handshake = build_handshake();
        handshake.inbound.require_token = false;
        let headers = A2aHeaders::new(None);
        let outcome = handshake.accept_inbound(&headers, Utc::now(), None).await.unwrap();
        assert!(outcome.caller_claims.is_none());
        assert!(outcome.response_headers.token.is_some());
    }

    #[tokio::test]
    async fn valid_caller_token_is_accepted_and_answered_symmetrically() {
        let handshake = build_handshake();
        let now = Utc::now();
        let (token, _) = handshake.mint(now).unwrap();
        let headers = A2aHeaders::new(Some(token));

        let outcome = handshake.accept_inbound(&headers, now, None).await.unwrap();
        assert!(outcome.caller_claims.is_some());
        assert!(outcome.response_headers.token.is_some());
    }

    #[tokio::test]
    async fn inbound_policy_violation_emits_event_with_stable_code() {
        let mut handshake = build_handshake();
        handshake.inbound.blocked_assets = vec!["asset-1".into()];
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        handshake.events().subscribe(move |event| {
            assert_eq!(event.code, "ASSET_BLOCKED");
            seen_clone.fetch_add(1, Ordering::SeqCst);
        });

        let now = Utc::now();
        let (token, _) = handshake.mint(now).unwrap();
        let headers = A2aHeaders::new(Some(token));
        let err = handshake.accept_inbound(&headers, now, None).await.unwrap_err();
        assert!(matches!(err, A2aError::PolicyViolated { .. }));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn outbound_preflight_blocks_denied_domain() {
        let mut handshake = build_handshake();
        handshake.outbound = OutboundPolicy::new(&["evil.example.com".to_string()], None);
        let err = handshake.initiate_outbound("evil.example.com", Utc::now()).unwrap_err();
        assert!(matches!(err, A2aError::PolicyViolated { .. }));
    }

    #[tokio::test]
    async fn outbound_finalize_validates_peer_response_token() {
        let handshake = build_handshake();
        let now = Utc::now();
        let (token, _) = handshake.mint(now).unwrap();
        let response_headers = A2aHeaders::new(Some(token));

        let claims = handshake.finalize_outbound(&response_headers, now).await.unwrap();
        assert_eq!(claims.sub, handshake.claim_template.identity.instance_id.to_string());
    }
}
