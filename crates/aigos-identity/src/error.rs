use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("lineage invariant violated: {0}")]
    LineageInvariant(String),
    #[error("capability manifest invalid: {0}")]
    InvalidCapabilities(#[from] aigos_capability::CapabilityError),
}
