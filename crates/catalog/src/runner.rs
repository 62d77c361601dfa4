//! Top-level deployment run over a directory of catalog files.
//!
//! Each `*-catalog.yml` file is processed under its own child context;
//! a file that fails to parse is logged and skipped, and nothing raised
//! by one catalog ever reaches another. The runner's boundary never
//! propagates an error: its output is the per-catalog status lists.

use std::path::Path;
use std::sync::Arc;

use flotilla_cloud::Notifier;
use flotilla_types::{CatalogDocument, DeploymentStatus, OpContext};
use tracing::{error, info};

use crate::sequencer::CatalogSequencer;

pub const DEFAULT_CUSTOMER: &str = "USTHP";
pub const DEFAULT_TENANT: &str = "HPP";

const CATALOG_SUFFIX: &str = "-catalog.yml";

pub struct DeploymentRunner {
    sequencer: CatalogSequencer,
    notifier: Arc<dyn Notifier>,
}

impl DeploymentRunner {
    pub fn new(sequencer: CatalogSequencer, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            sequencer,
            notifier,
        }
    }

    /// Run every catalog found in `directory`, returning one status
    /// list per successfully parsed catalog, in file-name order.
    pub async fn run(
        &self,
        ctx: &OpContext,
        directory: &Path,
    ) -> Vec<(String, Vec<DeploymentStatus>)> {
        info!(path = %directory.display(), "starting deployment run");
        let catalogs = match discover_catalogs(directory) {
            Ok(catalogs) => catalogs,
            Err(err) => {
                error!(%err, path = %directory.display(), "could not read catalog directory");
                return Vec::new();
            }
        };
        info!(found = catalogs.len(), "catalog files discovered");

        let mut reports = Vec::new();
        for catalog in catalogs {
            let path = directory.join(&catalog);
            let verified = verify_signature(&path);
            info!(%catalog, verified, "signature validation");

            let document = match read_catalog(&path) {
                Ok(document) => document,
                Err(err) => {
                    error!(%catalog, %err, "catalog rejected, continuing with the next");
                    continue;
                }
            };

            let (customer, tenant) = resolve_principal(&document);
            let scope = catalog_scope(&catalog, &document);
            let catalog_ctx = ctx.child(scope);
            let statuses = self
                .sequencer
                .run(&catalog_ctx, &document, &customer, &tenant)
                .await;
            self.notifier.notify(&catalog_ctx, &catalog, &statuses).await;
            reports.push((catalog, statuses));
        }
        reports
    }
}

/// Customer and tenant for one catalog. A header tenant is honored only
/// when the header also names a customer; a bare tenant would otherwise
/// pair with the default customer's namespace.
fn resolve_principal(document: &CatalogDocument) -> (String, String) {
    let mut customer = DEFAULT_CUSTOMER.to_string();
    let mut tenant = DEFAULT_TENANT.to_string();
    if let Some(header) = document.header() {
        if let Some(name) = &header.customer {
            info!(customer = %name, "customer found in catalog");
            customer = name.clone();
            if let Some(name) = &header.tenant {
                info!(tenant = %name, "tenant found in catalog");
                tenant = name.clone();
            }
        }
    }
    (customer, tenant)
}

fn catalog_scope(catalog: &str, document: &CatalogDocument) -> String {
    let base = format!("Catalog:{}", catalog);
    match document.header().and_then(|h| h.run_id.as_deref()) {
        Some(run_id) => format!("{}-{}", base, run_id),
        None => base,
    }
}

fn discover_catalogs(directory: &Path) -> std::io::Result<Vec<String>> {
    let mut catalogs: Vec<String> = std::fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(CATALOG_SUFFIX))
        .collect();
    catalogs.sort();
    Ok(catalogs)
}

fn read_catalog(path: &Path) -> Result<CatalogDocument, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_yaml::from_str(&raw).map_err(|e| e.to_string())
}

/// Catalog files are signed by the release pipeline; verification is
/// recorded per file and currently always passes.
fn verify_signature(path: &Path) -> bool {
    info!(path = %path.display(), "validating catalog signature");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_cloud::{
        SimulatedCloud, SimulatedConfigStore, SimulatedDatabaseDeployer, TracingNotifier,
    };

    fn runner() -> DeploymentRunner {
        let cloud = Arc::new(SimulatedCloud::new());
        let store = Arc::new(SimulatedConfigStore::new());
        let sequencer = CatalogSequencer::new(
            cloud.clone(),
            cloud.clone(),
            cloud,
            store,
            Arc::new(SimulatedDatabaseDeployer::succeeding()),
        );
        DeploymentRunner::new(sequencer, Arc::new(TracingNotifier::new()))
    }

    const STOP_CATALOG: &str = "header:\n  mode: stop\ndata:\n  - serviceName: billing\n    region: EU1\n    product: caps\n    executionOrder: 1\n";

    #[tokio::test]
    async fn broken_catalog_aborts_only_itself() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a-catalog.yml"), "{{not yaml").unwrap();
        std::fs::write(dir.path().join("b-catalog.yml"), STOP_CATALOG).unwrap();
        std::fs::write(dir.path().join("notes.yml"), "ignored: true").unwrap();

        let reports = runner().run(&OpContext::new_root("run"), dir.path()).await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "b-catalog.yml");
        // Stop mode against a catalog entry without a cluster.
        assert_eq!(
            reports[0].1[0].app.status,
            "Failed- Cluster Not Defined"
        );
    }

    #[tokio::test]
    async fn catalogs_run_in_file_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("z-catalog.yml"), STOP_CATALOG).unwrap();
        std::fs::write(dir.path().join("a-catalog.yml"), STOP_CATALOG).unwrap();

        let reports = runner().run(&OpContext::new_root("run"), dir.path()).await;
        let names: Vec<&str> = reports.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["a-catalog.yml", "z-catalog.yml"]);
    }

    #[tokio::test]
    async fn missing_directory_yields_no_reports() {
        let reports = runner()
            .run(&OpContext::new_root("run"), Path::new("/nonexistent/catalogs"))
            .await;
        assert!(reports.is_empty());
    }

    #[test]
    fn header_tenant_requires_header_customer() {
        let with_both: CatalogDocument = serde_yaml::from_str(
            "header:\n  customer: ACME\n  tenant: CORE\ndata: []\n",
        )
        .unwrap();
        assert_eq!(
            resolve_principal(&with_both),
            ("ACME".to_string(), "CORE".to_string())
        );

        let tenant_only: CatalogDocument =
            serde_yaml::from_str("header:\n  tenant: CORE\ndata: []\n").unwrap();
        assert_eq!(
            resolve_principal(&tenant_only),
            (DEFAULT_CUSTOMER.to_string(), DEFAULT_TENANT.to_string())
        );
    }

    #[test]
    fn run_id_lands_in_the_catalog_scope() {
        let document: CatalogDocument =
            serde_yaml::from_str("header:\n  runId: r-77\ndata: []\n").unwrap();
        assert_eq!(
            catalog_scope("a-catalog.yml", &document),
            "Catalog:a-catalog.yml-r-77"
        );
    }
}
