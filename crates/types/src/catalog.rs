//! Catalog documents and entries.
//!
//! A catalog is an ordered YAML document describing the services to
//! converge or clean up in one run. Two wire forms exist: the preferred
//! headered form `{header: {...}, data: [...]}` and the legacy bare
//! sequence of entries.

use serde::{Deserialize, Serialize};

/// Reference to a database schema package deployed alongside a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DacpacRef {
    /// Object key of the package.
    pub file: String,

    /// Bucket holding the package.
    #[serde(default)]
    pub bucket: Option<String>,

    /// Logical database pointer; defaults to the product when absent.
    #[serde(default, rename = "targetDB")]
    pub target_db: Option<String>,
}

/// One desired service revision within a catalog.
///
/// Immutable once read; ordering within a catalog is defined by
/// `execution_order` (ties keep input order).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub service_name: String,

    #[serde(default)]
    pub region: String,

    pub product: String,

    /// Optional service line used for cluster selection overrides.
    #[serde(default)]
    pub service_line: Option<String>,

    /// Cluster hint; the resolved cluster may come from layered config.
    #[serde(default)]
    pub cluster: Option<String>,

    /// Container image; entries without one skip the app stage.
    #[serde(default)]
    pub image: Option<String>,

    /// Bucket holding the service's configuration blobs.
    #[serde(default, rename = "configbucket")]
    pub config_bucket: Option<String>,

    /// Release path segment for configuration blobs.
    #[serde(default)]
    pub release_identifier: Option<String>,

    /// Total order within the catalog.
    #[serde(default)]
    pub execution_order: i64,

    /// Paired database schema package, if any.
    #[serde(default)]
    pub dacpac: Option<DacpacRef>,

    /// Target group ARN, used by the `cleanupTg` mode.
    #[serde(default, rename = "tgArn")]
    pub tg_arn: Option<String>,

    /// Listener port, used by the `cleanupTg` mode.
    #[serde(default)]
    pub port: Option<u16>,
}

impl CatalogEntry {
    /// The live service name: `{serviceName}-{region_lower}` when a region
    /// is present, otherwise the bare service name.
    pub fn qualified_service_name(&self) -> String {
        if self.region.is_empty() {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.region.to_lowercase())
        }
    }
}

/// Non-convergence modes a catalog header can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployMode {
    /// Drop a target group and its listener mapping only.
    #[serde(rename = "cleanupTg")]
    CleanupTg,

    /// Scale to zero, drop target group + listener, delete the service.
    #[serde(rename = "cleanup")]
    Cleanup,

    /// Scale the service's desired count to zero.
    #[serde(rename = "stop")]
    Stop,

    /// Scale the service's desired count back to one.
    #[serde(rename = "start")]
    Start,
}

/// Optional catalog header carried by the preferred document form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogHeader {
    #[serde(default)]
    pub mode: Option<DeployMode>,

    #[serde(default, rename = "runId")]
    pub run_id: Option<String>,

    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub tenant: Option<String>,
}

/// A parsed catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogDocument {
    /// Preferred form: header plus entry sequence.
    Headered {
        #[serde(default)]
        header: CatalogHeader,
        data: Vec<CatalogEntry>,
    },

    /// Legacy form: bare entry sequence, no header.
    Legacy(Vec<CatalogEntry>),
}

impl CatalogDocument {
    /// The header, when the document carries one.
    pub fn header(&self) -> Option<&CatalogHeader> {
        match self {
            CatalogDocument::Headered { header, .. } => Some(header),
            CatalogDocument::Legacy(_) => None,
        }
    }

    /// Entries sorted by ascending `execution_order`, ties keeping input
    /// order (stable sort).
    pub fn sorted_entries(&self) -> Vec<CatalogEntry> {
        let mut entries = match self {
            CatalogDocument::Headered { data, .. } => data.clone(),
            CatalogDocument::Legacy(data) => data.clone(),
        };
        entries.sort_by_key(|e| e.execution_order);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_document() {
        let yaml = r#"
- serviceName: billing
  region: EU1
  product: hps
  executionOrder: 2
- serviceName: ledger
  region: EU1
  product: hps
  executionOrder: 1
"#;
        let doc: CatalogDocument = serde_yaml::from_str(yaml).unwrap();
        assert!(doc.header().is_none());
        let entries = doc.sorted_entries();
        assert_eq!(entries[0].service_name, "ledger");
        assert_eq!(entries[1].service_name, "billing");
    }

    #[test]
    fn parses_headered_document() {
        let yaml = r#"
header:
  mode: stop
  runId: r-77
  customer: ACME
  tenant: CORE
data:
  - serviceName: billing
    region: EU1
    product: hps
    cluster: ecs-hps-eu1
    executionOrder: 1
"#;
        let doc: CatalogDocument = serde_yaml::from_str(yaml).unwrap();
        let header = doc.header().unwrap();
        assert_eq!(header.mode, Some(DeployMode::Stop));
        assert_eq!(header.customer.as_deref(), Some("ACME"));
        assert_eq!(doc.sorted_entries().len(), 1);
    }

    #[test]
    fn sort_is_stable_on_ties() {
        let yaml = r#"
- serviceName: a
  product: p
  executionOrder: 1
- serviceName: b
  product: p
  executionOrder: 1
- serviceName: c
  product: p
  executionOrder: 0
"#;
        let doc: CatalogDocument = serde_yaml::from_str(yaml).unwrap();
        let names: Vec<_> = doc
            .sorted_entries()
            .into_iter()
            .map(|e| e.service_name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn qualified_service_name_lowers_region() {
        let entry = CatalogEntry {
            service_name: "billing".into(),
            region: "EU1".into(),
            product: "hps".into(),
            service_line: None,
            cluster: None,
            image: None,
            config_bucket: None,
            release_identifier: None,
            execution_order: 0,
            dacpac: None,
            tg_arn: None,
            port: None,
        };
        assert_eq!(entry.qualified_service_name(), "billing-eu1");
    }
}
