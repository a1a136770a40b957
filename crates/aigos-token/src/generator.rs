use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::algorithm::SigningKey;
use crate::claims::{AigosClaims, CapabilitiesClaim, ControlClaim, GovernanceClaim, IdentityClaim, LineageClaim};
use crate::error::TokenError;

const B64: base64::engine::GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

#[derive(Clone, Debug)]
pub struct TokenConfig {
    pub kid: String,
    pub issuer: String,
    pub audience: String,
    pub default_ttl_seconds: i64,
    pub jwks_endpoint: Option<String>,
}

impl TokenConfig {
    pub fn new(kid: impl Into<String>, issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            kid: kid.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            default_ttl_seconds: 300,
            jwks_endpoint: None,
        }
    }
}

/// Issues AIGOS governance tokens: JWTs with `header.typ = "AIGOS-A2A+JWT"`
/// carrying the claim block from [`crate::claims`].
pub struct TokenGenerator {
    key: SigningKey,
    config: TokenConfig,
}

impl TokenGenerator {
    pub fn new(key: SigningKey, config: TokenConfig) -> Self {
        Self { key, config }
    }

    pub fn issue(
        &self,
        identity: IdentityClaim,
        governance: GovernanceClaim,
        control: ControlClaim,
        capabilities: CapabilitiesClaim,
        lineage: LineageClaim,
        now: DateTime<Utc>,
    ) -> Result<(String, AigosClaims), TokenError> {
        let claims = AigosClaims {
            version: 1,
            sub: identity.instance_id.to_string(),
            identity,
            governance,
            control,
            capabilities,
            lineage,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: now.timestamp() + self.config.default_ttl_seconds,
            jti: Uuid::new_v4(),
        };
        claims.validate_shape()?;

        let header = json!({
            "alg": self.key.algorithm().header_name(),
            "typ": "AIGOS-A2A+JWT",
            "kid": self.config.kid,
        });
        let header_b64 = B64.encode(serde_json::to_vec(&header).expect("header always serializes"));
        let payload_b64 = B64.encode(serde_json::to_vec(&claims).expect("claims always serialize"));
        let signing_input = format!("{header_b64}.{payload_b64}");
        let signature = self.key.sign(signing_input.as_bytes())?;
        let signature_b64 = B64.encode(signature);

        Ok((format!("{signing_input}.{signature_b64}"), claims))
    }
}
