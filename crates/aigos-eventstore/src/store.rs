use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bundle::PolicyBundleStore;
use crate::error::EventStoreError;
use crate::event::{Criticality, GovernanceEvent};
use crate::evaluator::{EvaluationOutcome, PolicyEvaluator};

const DEFAULT_LIST_LIMIT: usize = 100;
const DEFAULT_DEDUP_CAPACITY: usize = 10_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppendStatus {
    Accepted,
    Rejected,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppendResult {
    pub status: AppendStatus,
    pub received_at: DateTime<Utc>,
    pub is_new: bool,
    pub error: Option<String>,
    pub evaluation: Option<EvaluationOutcome>,
}

impl AppendResult {
    fn duplicate(existing: &GovernanceEvent) -> Self {
        Self {
            status: AppendStatus::Accepted,
            received_at: existing.received_at,
            is_new: false,
            error: None,
            evaluation: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ListFilters {
    pub asset_id: Option<String>,
    pub event_type: Option<String>,
    pub criticality: Option<Criticality>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

/// Minimum external contract a governance event store must implement:
/// dedup-on-append, independent-per-event batch append, and the listing
/// shapes the integrity checkpoint and API layer need.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn append(&self, event: GovernanceEvent, org_id: &str) -> Result<AppendResult, EventStoreError>;
    async fn append_batch(&self, events: Vec<GovernanceEvent>, org_id: &str) -> Vec<AppendResult>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<GovernanceEvent>, EventStoreError>;
    async fn list(&self, org_id: &str, filters: ListFilters) -> Result<Vec<GovernanceEvent>, EventStoreError>;
    async fn list_events_for_date(&self, org_id: &str, date: NaiveDate) -> Result<Vec<GovernanceEvent>, EventStoreError>;
    async fn get_orgs_with_events_on_date(&self, date: NaiveDate) -> Result<Vec<String>, EventStoreError>;
}

struct DedupCache {
    capacity: usize,
    order: VecDeque<Uuid>,
    seen: HashSet<Uuid>,
}

impl DedupCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    fn contains(&self, id: &Uuid) -> bool {
        self.seen.contains(id)
    }

    fn insert(&mut self, id: Uuid) {
        if self.seen.insert(id) {
            self.order.push_back(id);
            if self.order.len() > self.capacity {
                if let Some(evicted) = self.order.pop_front() {
                    self.seen.remove(&evicted);
                }
            }
        }
    }
}

/// Reference event store: a full append-only in-memory log, accelerated by
/// a bounded FIFO dedup cache of recently-seen event ids. A real backing
/// store enforces the PK constraint itself; the cache here only saves a
/// lookup round-trip for the common case of a recent duplicate.
pub struct InMemoryEventStore {
    events: RwLock<HashMap<Uuid, GovernanceEvent>>,
    dedup: RwLock<DedupCache>,
    bundles: Option<Arc<dyn PolicyBundleStore>>,
    evaluator: PolicyEvaluator,
}

impl InMemoryEventStore {
    pub fn new(bundles: Option<Arc<dyn PolicyBundleStore>>) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            dedup: RwLock::new(DedupCache::new(DEFAULT_DEDUP_CAPACITY)),
            bundles,
            evaluator: PolicyEvaluator::new(),
        }
    }

    async fn append_one(&self, event: GovernanceEvent) -> Result<AppendResult, EventStoreError> {
        let already_seen = {
            let dedup = self.dedup.read().map_err(|_| EventStoreError::LockPoisoned)?;
            dedup.contains(&event.id)
        } || self
            .events
            .read()
            .map_err(|_| EventStoreError::LockPoisoned)?
            .contains_key(&event.id);

        if already_seen {
            let existing = self
                .events
                .read()
                .map_err(|_| EventStoreError::LockPoisoned)?
                .get(&event.id)
                .cloned();
            return Ok(match existing {
                Some(existing) => AppendResult::duplicate(&existing),
                None => AppendResult {
                    status: AppendStatus::Accepted,
                    received_at: event.received_at,
                    is_new: false,
                    error: None,
                    evaluation: None,
                },
            });
        }

        let evaluation = match &self.bundles {
            Some(bundles) => {
                let bundle = bundles.get_active_bundle(&event.org_id).await?;
                self.evaluator.evaluate(&event, bundle.as_ref(), Utc::now())
            }
            None => None,
        };

        let received_at = event.received_at;
        let id = event.id;
        self.events
            .write()
            .map_err(|_| EventStoreError::LockPoisoned)?
            .insert(id, event);
        self.dedup
            .write()
            .map_err(|_| EventStoreError::LockPoisoned)?
            .insert(id);

        Ok(AppendResult {
            status: AppendStatus::Accepted,
            received_at,
            is_new: true,
            error: None,
            evaluation,
        })
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: GovernanceEvent, org_id: &str) -> Result<AppendResult, EventStoreError> {
        debug_assert_eq!(event.org_id, org_id);
        self.append_one(event).await
    }

    async fn append_batch(&self, events: Vec<GovernanceEvent>, org_id: &str) -> Vec<AppendResult> {
        let mut results = Vec::with_capacity(events.len());
        for event in events {
            let result = self.append(event, org_id).await.unwrap_or_else(|err| AppendResult {
                status: AppendStatus::Rejected,
                received_at: Utc::now(),
                is_new: false,
                error: Some(err.to_string()),
                evaluation: None,
            });
            results.push(result);
        }
        results
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<GovernanceEvent>, EventStoreError> {
        Ok(self.events.read().map_err(|_| EventStoreError::LockPoisoned)?.get(&id).cloned())
    }

    async fn list(&self, org_id: &str, filters: ListFilters) -> Result<Vec<GovernanceEvent>, EventStoreError> {
        let events = self.events.read().map_err(|_| EventStoreError::LockPoisoned)?;
        let mut matched: Vec<GovernanceEvent> = events
            .values()
            .filter(|e| e.org_id == org_id)
            .filter(|e| filters.asset_id.as_deref().map_or(true, |a| e.asset_id.as_deref() == Some(a)))
            .filter(|e| filters.event_type.as_deref().map_or(true, |t| e.event_type == t))
            .filter(|e| filters.criticality.map_or(true, |c| e.criticality == c))
            .filter(|e| filters.since.map_or(true, |since| e.produced_at >= since))
            .cloned()
            .collect();

        matched.sort_by(|a, b| b.produced_at.cmp(&a.produced_at));

        let limit = filters.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(DEFAULT_LIST_LIMIT);
        let page = matched.into_iter().skip(filters.offset).take(limit).collect();
        Ok(page)
    }

    async fn list_events_for_date(&self, org_id: &str, date: NaiveDate) -> Result<Vec<GovernanceEvent>, EventStoreError> {
        let events = self.events.read().map_err(|_| EventStoreError::LockPoisoned)?;
        let mut matched: Vec<GovernanceEvent> = events
            .values()
            .filter(|e| e.org_id == org_id && e.received_at.date_naive() == date)
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.received_at.cmp(&b.received_at).then(a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn get_orgs_with_events_on_date(&self, date: NaiveDate) -> Result<Vec<String>, EventStoreError> {
        let events = self.events.read().map_err(|_| EventStoreError::LockPoisoned)?;
        let mut orgs: Vec<String> = events
            .values()
            .filter(|e| e.received_at.date_naive() == date)
            .map(|e| e.org_id.clone())
            .collect();
        orgs.sort();
        orgs.dedup();
        Ok(orgs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::InMemoryPolicyBundleStore;
    use aigos_identity::GoldenThread;
    use serde_json::json;

    fn event(org_id: &str, received_at: DateTime<Utc>) -> GovernanceEvent {
        GovernanceEvent {
            id: Uuid::new_v4(),
            spec_version: 1,
            schema_version: 1,
            event_type: "scan.completed".into(),
            category: "security".into(),
            criticality: Criticality::Low,
            org_id: org_id.into(),
            asset_id: Some("asset-1".into()),
            produced_at: received_at,
            received_at,
            hash: "sha256:stub".into(),
            previous_hash: None,
            signature: None,
            parent_event_id: None,
            correlation_id: None,
            golden_thread: GoldenThread::Linked {
                system: "jira".into(),
                reference: "PROJ-1".into(),
                url: "https://example.com".into(),
                status: "active".into(),
                verified_at: None,
            },
            source: "scanner".into(),
            data: json!({}),
        }
    }

    #[tokio::test]
    async fn duplicate_append_is_accepted_as_not_new() {
        let store = InMemoryEventStore::new(None);
        let e = event("org-1", Utc::now());
        let first = store.append(e.clone(), "org-1").await.unwrap();
        assert!(first.is_new);
        let second = store.append(e, "org-1").await.unwrap();
        assert!(!second.is_new);
        assert_eq!(second.status, AppendStatus::Accepted);
    }

    #[tokio::test]
    async fn batch_append_is_independent_per_event() {
        let store = InMemoryEventStore::new(None);
        let now = Utc::now();
        let events = vec![event("org-1", now), event("org-1", now)];
        let results = store.append_batch(events, "org-1").await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_new));
    }

    #[tokio::test]
    async fn list_orders_by_produced_at_desc_and_caps_at_100() {
        let store = InMemoryEventStore::new(None);
        let base = Utc::now();
        for i in 0..5 {
            store
                .append(event("org-1", base + chrono::Duration::seconds(i)), "org-1")
                .await
                .unwrap();
        }
        let listed = store.list("org-1", ListFilters::default()).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed[0].produced_at >= listed[1].produced_at);
    }

    #[tokio::test]
    async fn list_events_for_date_is_sorted_by_received_at_asc() {
        let store = InMemoryEventStore::new(None);
        let day = Utc::now();
        let date = day.date_naive();
        store.append(event("org-1", day), "org-1").await.unwrap();
        store
            .append(event("org-1", day + chrono::Duration::minutes(1)), "org-1")
            .await
            .unwrap();
        let events = store.list_events_for_date("org-1", date).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].received_at <= events[1].received_at);
    }

    #[tokio::test]
    async fn append_runs_policy_evaluator_when_bundle_store_is_configured() {
        let bundles = Arc::new(InMemoryPolicyBundleStore::new());
        let store = InMemoryEventStore::new(Some(bundles));
        let e = event("org-1", Utc::now());
        let result = store.append(e, "org-1").await.unwrap();
        assert!(result.is_new);
        assert!(result.evaluation.is_none());
    }

    #[tokio::test]
    async fn get_orgs_with_events_on_date_deduplicates() {
        let store = InMemoryEventStore::new(None);
        let now = Utc::now();
        store.append(event("org-1", now), "org-1").await.unwrap();
        store.append(event("org-1", now), "org-1").await.unwrap();
        store.append(event("org-2", now), "org-2").await.unwrap();
        let orgs = store.get_orgs_with_events_on_date(now.date_naive()).await.unwrap();
        assert_eq!(orgs, vec!["org-1".to_string(), "org-2".to_string()]);
    }
}
