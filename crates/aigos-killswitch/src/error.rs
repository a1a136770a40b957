use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum KillSwitchError {
    #[error("signature invalid for command {0}")]
    SignatureInvalid(Uuid),
    #[error("command {0} timestamp is outside the allowed age window (stale or future)")]
    StaleOrFuture(Uuid),
    #[error("lock poisoned")]
    LockPoisoned,
}
