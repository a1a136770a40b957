use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IntegrityError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub org_id: String,
    pub date: NaiveDate,
    pub merkle_root: String,
    pub event_count: usize,
    pub computed_at: DateTime<Utc>,
}

/// External collaborator persisting one checkpoint per `(orgId, date)`.
/// `upsert` must be idempotent: calling it twice with the same arguments
/// yields the same stored record.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn upsert(
        &self,
        org_id: &str,
        date: NaiveDate,
        merkle_root: &str,
        event_count: usize,
        computed_at: DateTime<Utc>,
    ) -> Result<Checkpoint, IntegrityError>;

    async fn get(&self, org_id: &str, date: NaiveDate) -> Result<Option<Checkpoint>, IntegrityError>;
}

#[derive(Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: RwLock<HashMap<(String, NaiveDate), Checkpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn upsert(
        &self,
        org_id: &str,
        date: NaiveDate,
        merkle_root: &str,
        event_count: usize,
        computed_at: DateTime<Utc>,
    ) -> Result<Checkpoint, IntegrityError> {
        let checkpoint = Checkpoint {
            org_id: org_id.to_string(),
            date,
            merkle_root: merkle_root.to_string(),
            event_count,
            computed_at,
        };
        self.checkpoints
            .write()
            .map_err(|_| IntegrityError::CheckpointStore("lock poisoned".to_string()))?
            .insert((org_id.to_string(), date), checkpoint.clone());
        Ok(checkpoint)
    }

    async fn get(&self, org_id: &str, date: NaiveDate) -> Result<Option<Checkpoint>, IntegrityError> {
        Ok(self
            .checkpoints
            .read()
            .map_err(|_| IntegrityError::CheckpointStore("lock poisoned".to_string()))?
            .get(&(org_id.to_string(), date))
            .cloned())
    }
}
