//! Platform metadata parameters.
//!
//! Deployment metadata is a JSON document whose top level mixes a
//! `cluster` defaults block with one entry per product, so the product
//! map is captured through a flattened map alongside the typed fields.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cluster-related defaults, present at the global and product levels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterDefaults {
    #[serde(default, rename = "doCreateService")]
    pub do_create_service: Option<bool>,
    #[serde(default, rename = "IsUserPriority")]
    pub is_user_priority: Option<bool>,
}

/// Cluster selection for one product+region: per service-line names with
/// a catch-all default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSelection {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(flatten)]
    pub service_lines: HashMap<String, String>,
}

/// Overrides scoped to one product+region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionOverrides {
    #[serde(default, rename = "doCreateService")]
    pub do_create_service: Option<bool>,
    #[serde(default, rename = "IsUserPriority")]
    pub is_user_priority: Option<bool>,
    #[serde(default)]
    pub cluster: Option<ClusterSelection>,
}

/// The `config` block of a product entry: product-wide cluster defaults
/// plus per-region overrides keyed by region code.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductConfig {
    #[serde(default)]
    pub cluster: Option<ClusterDefaults>,
    #[serde(flatten)]
    pub regions: HashMap<String, RegionOverrides>,
}

/// One product's entry in the deployment metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductMetadata {
    #[serde(default, rename = "secretNamespace")]
    pub secret_namespace: Option<String>,
    #[serde(default, rename = "parameterNamespace")]
    pub parameter_namespace: Option<String>,
    #[serde(default, rename = "taskRole")]
    pub task_role: Option<String>,
    #[serde(default, rename = "taskecsExecutionRole")]
    pub execution_role: Option<String>,
    #[serde(default)]
    pub cluster: Option<ClusterDefaults>,
    #[serde(default)]
    pub config: Option<ProductConfig>,
}

/// Customer/tenant-scoped deployment metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentMetadata {
    #[serde(default)]
    pub cluster: Option<ClusterDefaults>,
    #[serde(flatten)]
    pub products: HashMap<String, ProductMetadata>,
}

impl DeploymentMetadata {
    fn product(&self, product: &str) -> Option<&ProductMetadata> {
        self.products.get(product)
    }

    /// Whether service creation is enabled for this product+region,
    /// walking global → product → product+region; each layer only takes
    /// effect when it sets the flag.
    pub fn create_enabled(&self, product: &str, region: &str) -> bool {
        let mut enabled = self
            .cluster
            .as_ref()
            .and_then(|c| c.do_create_service)
            .unwrap_or(false);
        if let Some(config) = self.product(product).and_then(|p| p.config.as_ref()) {
            if let Some(value) = config.cluster.as_ref().and_then(|c| c.do_create_service) {
                enabled = value;
            }
            if let Some(value) = config
                .regions
                .get(region)
                .and_then(|r| r.do_create_service)
            {
                enabled = value;
            }
        }
        enabled
    }

    /// Namespace used when resolving secret references; the product name
    /// itself unless overridden.
    pub fn secret_namespace<'a>(&'a self, product: &'a str) -> &'a str {
        self.product(product)
            .and_then(|p| p.secret_namespace.as_deref())
            .unwrap_or(product)
    }

    /// Namespace used when resolving parameter references; the product
    /// name itself unless overridden.
    pub fn parameter_namespace<'a>(&'a self, product: &'a str) -> &'a str {
        self.product(product)
            .and_then(|p| p.parameter_namespace.as_deref())
            .unwrap_or(product)
    }

    pub fn task_role(&self, product: &str) -> Option<&str> {
        self.product(product).and_then(|p| p.task_role.as_deref())
    }

    pub fn execution_role(&self, product: &str) -> Option<&str> {
        self.product(product).and_then(|p| p.execution_role.as_deref())
    }

    /// Resolve the target cluster.
    ///
    /// Starts from the spec-derived default, then consults the layered
    /// cluster configuration (product+region, per service-line with a
    /// default). The configured name only wins when no layer marked the
    /// user-supplied name as priority.
    pub fn resolve_cluster(
        &self,
        spec_default: String,
        product: &str,
        region: &str,
        service_line: Option<&str>,
    ) -> String {
        let mut user_priority = self
            .cluster
            .as_ref()
            .and_then(|c| c.is_user_priority)
            .unwrap_or(false);
        let mut configured: Option<String> = None;

        if let Some(product_meta) = self.product(product) {
            if let Some(value) = product_meta
                .cluster
                .as_ref()
                .and_then(|c| c.is_user_priority)
            {
                user_priority = value;
            }
            if let Some(overrides) = product_meta
                .config
                .as_ref()
                .and_then(|c| c.regions.get(region))
            {
                if let Some(value) = overrides.is_user_priority {
                    user_priority = value;
                }
                if let Some(selection) = overrides.cluster.as_ref() {
                    configured = service_line
                        .and_then(|line| selection.service_lines.get(line))
                        .or(selection.default.as_ref())
                        .cloned();
                }
            }
        }

        match configured {
            Some(name) if !user_priority => name,
            _ => spec_default,
        }
    }
}

/// Service-connect settings for a product within a region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConnectSettings {
    #[serde(default, rename = "nameSpace")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductClusterEntry {
    #[serde(default, rename = "serviceConnect")]
    pub service_connect: Option<ServiceConnectSettings>,
    /// Load-balancer short names this product may attach listeners to;
    /// empty means no restriction.
    #[serde(default)]
    pub alb: Option<Vec<String>>,
}

/// Cluster metadata: region code → product → cluster-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterMetadata {
    #[serde(flatten)]
    pub regions: HashMap<String, HashMap<String, ProductClusterEntry>>,
}

impl ClusterMetadata {
    /// Namespace to publish into when inter-service communication is
    /// enabled; `None` means service connect stays off.
    pub fn service_connect_namespace(&self, region: &str, product: &str) -> Option<&str> {
        self.regions
            .get(&region.to_uppercase())?
            .get(product)?
            .service_connect
            .as_ref()?
            .namespace
            .as_deref()
    }

    /// Load-balancer allow-list for a product within a region; empty
    /// means any permitted balancer qualifies.
    pub fn alb_allowlist(&self, region: &str, product: &str) -> Vec<String> {
        self.regions
            .get(&region.to_uppercase())
            .and_then(|products| products.get(product))
            .and_then(|entry| entry.alb.clone())
            .unwrap_or_default()
    }
}
