use thiserror::Error;

use aigos_eventstore::EventStoreError;

#[derive(Debug, Error)]
pub enum IntegrityError {
    #[error("event store error: {0}")]
    EventStore(#[from] EventStoreError),
    #[error("checkpoint store error: {0}")]
    CheckpointStore(String),
}
