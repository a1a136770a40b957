use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use aigos_crypto::build_merkle_tree;
use aigos_eventstore::EventStore;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::IntegrityError;
use crate::events::{IntegrityEvent, IntegrityEventBus};

/// Folds one organisation's events for one UTC day into a deterministic
/// Merkle root and persists it. `list_events_for_date` is already ordered
/// `receivedAt` ASC with a stable id tie-break, so the leaf order here is
/// exactly the order the store returns.
pub struct IntegrityCheckpointer {
    event_store: Arc<dyn EventStore>,
    checkpoint_store: Arc<dyn CheckpointStore>,
    pub events: IntegrityEventBus,
}

impl IntegrityCheckpointer {
    pub fn new(event_store: Arc<dyn EventStore>, checkpoint_store: Arc<dyn CheckpointStore>) -> Self {
        Self {
            event_store,
            checkpoint_store,
            events: IntegrityEventBus::new(),
        }
    }

    pub async fn checkpoint_org_for_date(
        &self,
        org_id: &str,
        date: NaiveDate,
        computed_at: DateTime<Utc>,
    ) -> Result<Checkpoint, IntegrityError> {
        let events = self.event_store.list_events_for_date(org_id, date).await?;
        let leaves: Vec<String> = events.iter().map(|e| e.hash.clone()).collect();
        let root = build_merkle_tree(&leaves);

        let checkpoint = self
            .checkpoint_store
            .upsert(org_id, date, &root, leaves.len(), computed_at)
            .await?;

        info!(org_id, %date, event_count = leaves.len(), "integrity checkpoint computed");
        self.events.emit(IntegrityEvent::ChainVerified {
            audit_id: format!("checkpoint_{org_id}_{date}"),
            merkle_root: root,
            event_count: leaves.len(),
            verified: true,
        });

        Ok(checkpoint)
    }

    /// Checkpoints every organisation with at least one event on `date`.
    pub async fn checkpoint_all_orgs_for_date(
        &self,
        date: NaiveDate,
        computed_at: DateTime<Utc>,
    ) -> Result<Vec<Checkpoint>, IntegrityError> {
        let orgs = self.event_store.get_orgs_with_events_on_date(date).await?;
        let mut checkpoints = Vec::with_capacity(orgs.len());
        for org_id in orgs {
            checkpoints.push(self.checkpoint_org_for_date(&org_id, date, computed_at).await?);
        }
        Ok(checkpoints)
    }
}
