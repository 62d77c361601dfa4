//! First/last-seen bookkeeping for deployment ids.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use flotilla_cloud::model::DeploymentState;

/// What the ledger remembers about one deployment id.
#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub status: String,
    pub task_definition: String,
}

/// Tracks every deployment id reported during one monitoring session.
///
/// An id that disappears from the service's reported deployments stays
/// in the ledger; its record anchors the lookback window for rollback
/// inference.
#[derive(Debug, Default)]
pub struct DeploymentLedger {
    records: HashMap<String, LedgerRecord>,
}

impl DeploymentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the currently-reported deployments at `now`.
    pub fn observe(&mut self, deployments: &[DeploymentState], now: DateTime<Utc>) {
        for deployment in deployments {
            self.records
                .entry(deployment.id.clone())
                .and_modify(|record| {
                    record.last_seen = now;
                    record.status = deployment.status.clone();
                })
                .or_insert_with(|| LedgerRecord {
                    first_seen: now,
                    last_seen: now,
                    status: deployment.status.clone(),
                    task_definition: deployment.task_definition.clone(),
                });
        }
    }

    pub fn get(&self, id: &str) -> Option<&LedgerRecord> {
        self.records.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployment(id: &str, status: &str) -> DeploymentState {
        DeploymentState {
            id: id.into(),
            status: status.into(),
            task_definition: "td:1".into(),
            desired_count: 1,
            running_count: 1,
            pending_count: 0,
            failed_tasks: 0,
            created_at: None,
            updated_at: None,
            service_connect: None,
        }
    }

    #[test]
    fn vanished_ids_keep_their_first_seen() {
        let mut ledger = DeploymentLedger::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(30);

        ledger.observe(&[deployment("d1", "PRIMARY")], t0);
        ledger.observe(&[deployment("d2", "PRIMARY")], t1);

        let record = ledger.get("d1").unwrap();
        assert_eq!(record.first_seen, t0);
        assert!(ledger.get("d2").is_some());
    }

    #[test]
    fn reobserved_ids_refresh_last_seen_and_status() {
        let mut ledger = DeploymentLedger::new();
        let t0 = Utc::now();
        let t1 = t0 + chrono::Duration::seconds(30);

        ledger.observe(&[deployment("d1", "PRIMARY")], t0);
        ledger.observe(&[deployment("d1", "ACTIVE")], t1);

        let record = ledger.get("d1").unwrap();
        assert_eq!(record.first_seen, t0);
        assert_eq!(record.last_seen, t1);
        assert_eq!(record.status, "ACTIVE");
    }
}
