use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("lock poisoned")]
    LockPoisoned,
}
