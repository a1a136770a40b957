use thiserror::Error;

/// Enumerated validator failure, in the order the validator checks them.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid token format")]
    InvalidFormat,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("invalid issuer")]
    InvalidIssuer,
    #[error("invalid audience")]
    InvalidAudience,
    #[error("invalid AIGOS claims: {0}")]
    InvalidClaims(String),
    #[error("signing/verification key not found for kid={0:?} alg={1}")]
    KeyNotFound(Option<String>, String),
    #[error("caller is paused")]
    Paused,
    #[error("caller has a termination pending")]
    TerminationPending,
    #[error("capability escalation: {0}")]
    CapabilityEscalation(String),
}

impl TokenError {
    /// Stable machine-readable code, matching the validator's enumerated
    /// error contract.
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidFormat => "INVALID_FORMAT",
            TokenError::InvalidSignature => "INVALID_SIGNATURE",
            TokenError::Expired => "EXPIRED",
            TokenError::NotYetValid => "NOT_YET_VALID",
            TokenError::InvalidIssuer => "INVALID_ISSUER",
            TokenError::InvalidAudience => "INVALID_AUDIENCE",
            TokenError::InvalidClaims(_) => "INVALID_CLAIMS",
            TokenError::KeyNotFound(_, _) => "KEY_NOT_FOUND",
            TokenError::Paused => "PAUSED",
            TokenError::TerminationPending => "TERMINATION_PENDING",
            TokenError::CapabilityEscalation(_) => "CAPABILITY_ESCALATION",
        }
    }
}

/// Non-fatal validator warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenWarning {
    ExpiringSoon,
}

impl TokenWarning {
    pub fn code(&self) -> &'static str {
        match self {
            TokenWarning::ExpiringSoon => "EXPIRING_SOON",
        }
    }
}
