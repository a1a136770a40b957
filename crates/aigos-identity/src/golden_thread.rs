use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The business justification binding an AI asset to an authorising record,
/// or the declared gap when none exists yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GoldenThread {
    Linked {
        system: String,
        #[serde(rename = "ref")]
        reference: String,
        url: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        verified_at: Option<DateTime<Utc>>,
    },
    Orphan {
        reason: String,
        declared_by: String,
        declared_at: DateTime<Utc>,
        remediation_deadline: DateTime<Utc>,
        remediation_note: String,
    },
}

impl GoldenThread {
    pub fn is_linked(&self) -> bool {
        matches!(self, GoldenThread::Linked { .. })
    }

    pub fn is_orphan_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(self, GoldenThread::Orphan { remediation_deadline, .. } if now > *remediation_deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn orphan_overdue_detection() {
        let now = Utc::now();
        let orphan = GoldenThread::Orphan {
            reason: "pending ticket".into(),
            declared_by: "agent-owner".into(),
            declared_at: now - Duration::days(10),
            remediation_deadline: now - Duration::days(1),
            remediation_note: "awaiting approval".into(),
        };
        assert!(orphan.is_orphan_overdue(now));
    }

    #[test]
    fn linked_thread_is_not_orphan_overdue() {
        let linked = GoldenThread::Linked {
            system: "jira".into(),
            reference: "PROJ-1".into(),
            url: "https://example.com/PROJ-1".into(),
            status: "approved".into(),
            verified_at: Some(Utc::now()),
        };
        assert!(!linked.is_orphan_overdue(Utc::now()));
    }
}
