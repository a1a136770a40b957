use thiserror::Error;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("invalid capability manifest: {0}")]
    InvalidManifest(String),
}

/// Stable error codes surfaced in [`crate::decay::DecayResult::errors`].
/// Never raised as a Rust error — capability escalation blocks a spawn but
/// is reported in-band, per the outer error taxonomy.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecayError {
    #[error("TOOL_ESCALATION: child requested tool '{0}' not permitted by parent")]
    ToolEscalation(String),
    #[error("DOMAIN_ESCALATION: child requested domain '{0}' not permitted by parent")]
    DomainEscalation(String),
    #[error("DEPTH_EXHAUSTED: parent has no remaining spawn depth")]
    DepthExhausted,
}

impl DecayError {
    pub fn code(&self) -> &'static str {
        match self {
            DecayError::ToolEscalation(_) => "TOOL_ESCALATION",
            DecayError::DomainEscalation(_) => "DOMAIN_ESCALATION",
            DecayError::DepthExhausted => "DEPTH_EXHAUSTED",
        }
    }
}
