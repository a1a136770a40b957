use thiserror::Error;

use aigos_identity::IdentityError;
use aigos_policy::PolicyError;

use crate::guard::GuardDenied;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no capability decay manager configured for this context")]
    NoDecayManager,

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("policy engine error: {0}")]
    Policy(#[from] PolicyError),

    #[error("{0}")]
    GuardDenied(#[from] GuardDenied),
}
