use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("event store lock poisoned")]
    LockPoisoned,
}
