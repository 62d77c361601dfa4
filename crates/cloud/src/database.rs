//! Database deployer collaborator port.
//!
//! Schema packages are deployed by an external tool; the engine only
//! consumes the per-database status list it produces. Failures are
//! captured in the statuses, never raised.

use async_trait::async_trait;
use dashmap::DashMap;

use flotilla_types::{CatalogEntry, DbComponentStatus, OpContext, Verdict};

/// Deploys a catalog entry's schema package and reports per-database
/// outcomes.
#[async_trait]
pub trait DatabaseDeployer: Send + Sync {
    /// Deploy the entry's package for the given customer/tenant. Called
    /// only when the entry carries a package reference.
    async fn deploy(
        &self,
        ctx: &OpContext,
        entry: &CatalogEntry,
        customer: &str,
        tenant: &str,
    ) -> Vec<DbComponentStatus>;
}

/// Simulated deployer with per-service scripted outcomes.
#[derive(Default)]
pub struct SimulatedDatabaseDeployer {
    outcomes: DashMap<String, Vec<DbComponentStatus>>,
}

impl SimulatedDatabaseDeployer {
    /// Deployer that succeeds for every package.
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Script the statuses returned for one service name.
    pub fn script(&self, service_name: &str, statuses: Vec<DbComponentStatus>) {
        self.outcomes.insert(service_name.to_string(), statuses);
    }

    /// Script a single failed component for one service name.
    pub fn script_failure(&self, service_name: &str, message: &str) {
        self.script(
            service_name,
            vec![DbComponentStatus {
                file: format!("{}.dacpac", service_name),
                db: service_name.to_uppercase(),
                status: Verdict::Failed,
                message: message.to_string(),
            }],
        );
    }
}

#[async_trait]
impl DatabaseDeployer for SimulatedDatabaseDeployer {
    async fn deploy(
        &self,
        ctx: &OpContext,
        entry: &CatalogEntry,
        _customer: &str,
        _tenant: &str,
    ) -> Vec<DbComponentStatus> {
        tracing::info!(
            correlation_id = %ctx.correlation_id,
            service = %entry.service_name,
            "simulated database deployment"
        );
        if let Some(scripted) = self.outcomes.get(&entry.service_name) {
            return scripted.clone();
        }
        let file = entry
            .dacpac
            .as_ref()
            .map(|d| d.file.rsplit('/').next().unwrap_or(&d.file).to_string())
            .unwrap_or_else(|| "NA".into());
        vec![DbComponentStatus {
            file,
            db: entry
                .dacpac
                .as_ref()
                .and_then(|d| d.target_db.clone())
                .unwrap_or_else(|| entry.product.to_uppercase()),
            status: Verdict::Success,
            message: "Deployment completed".into(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_types::DacpacRef;

    fn entry_with_dacpac() -> CatalogEntry {
        CatalogEntry {
            service_name: "billing".into(),
            region: "EU1".into(),
            product: "hps".into(),
            service_line: None,
            cluster: None,
            image: None,
            config_bucket: None,
            release_identifier: None,
            execution_order: 0,
            dacpac: Some(DacpacRef {
                file: "packages/billing.dacpac".into(),
                bucket: Some("pkg-bucket".into()),
                target_db: None,
            }),
            tg_arn: None,
            port: None,
        }
    }

    #[tokio::test]
    async fn default_outcome_succeeds_with_package_file() {
        let deployer = SimulatedDatabaseDeployer::succeeding();
        let ctx = OpContext::new_root("t");
        let statuses = deployer.deploy(&ctx, &entry_with_dacpac(), "ACME", "CORE").await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].status, Verdict::Success);
        assert_eq!(statuses[0].file, "billing.dacpac");
        assert_eq!(statuses[0].db, "HPS");
    }

    #[tokio::test]
    async fn scripted_failure_wins() {
        let deployer = SimulatedDatabaseDeployer::succeeding();
        deployer.script_failure("billing", "constraint violation");
        let ctx = OpContext::new_root("t");
        let statuses = deployer.deploy(&ctx, &entry_with_dacpac(), "ACME", "CORE").await;
        assert_eq!(statuses[0].status, Verdict::Failed);
        assert!(statuses[0].message.contains("constraint violation"));
    }
}
