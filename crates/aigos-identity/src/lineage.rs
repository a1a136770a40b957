use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aigos_types::InstanceId;

use crate::error::IdentityError;

/// Spawn provenance of a runtime identity. Stores only opaque instance ids,
/// never references to ancestor identities — the caller resolves lookups.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub parent_instance_id: Option<InstanceId>,
    pub generation_depth: u32,
    pub ancestor_chain: Vec<InstanceId>,
    pub root_instance_id: InstanceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawned_at: Option<DateTime<Utc>>,
}

impl Lineage {
    /// Root lineage for a freshly created (non-spawned) identity.
    pub fn root(instance_id: InstanceId) -> Self {
        Self {
            parent_instance_id: None,
            generation_depth: 0,
            ancestor_chain: vec![],
            root_instance_id: instance_id,
            spawned_at: None,
        }
    }

    /// Lineage for a child spawned from `parent` at `instance_id`.
    pub fn spawned_from(parent_instance_id: InstanceId, parent: &Lineage, at: DateTime<Utc>) -> Self {
        let mut ancestor_chain = parent.ancestor_chain.clone();
        ancestor_chain.push(parent_instance_id);
        Self {
            parent_instance_id: Some(parent_instance_id),
            generation_depth: parent.generation_depth + 1,
            ancestor_chain,
            root_instance_id: parent.root_instance_id,
            spawned_at: Some(at),
        }
    }

    /// Validates the three lineage invariants against the identity's own id.
    pub fn validate(&self, instance_id: InstanceId) -> Result<(), IdentityError> {
        let root_is_self = self.root_instance_id == instance_id;
        let is_root = self.generation_depth == 0;
        let parent_is_none = self.parent_instance_id.is_none();

        if is_root != parent_is_none || is_root != root_is_self {
            return Err(IdentityError::LineageInvariant(
                "generationDepth == 0 must coincide with parentInstanceId == null and rootInstanceId == instanceId"
                    .to_string(),
            ));
        }

        if self.ancestor_chain.len() as u32 != self.generation_depth {
            return Err(IdentityError::LineageInvariant(
                "ancestorChain.length must equal generationDepth".to_string(),
            ));
        }

        match (self.ancestor_chain.last(), self.parent_instance_id) {
            (Some(leaf), Some(parent)) if *leaf == parent => {}
            (None, None) => {}
            _ => {
                return Err(IdentityError::LineageInvariant(
                    "the leaf of ancestorChain must equal parentInstanceId".to_string(),
                ))
            }
        }

        Ok(())
    }
}
