//! Fetches and parses the configuration planes through the store port.

use std::sync::Arc;

use flotilla_cloud::error::StoreError;
use flotilla_cloud::store::ConfigStorePort;
use flotilla_types::catalog::CatalogEntry;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::metadata::{ClusterMetadata, DeploymentMetadata};
use crate::spec::{AppSpec, InfraSpec, ServiceSpecSet};

/// Loads deployment metadata and per-service spec documents.
pub struct SpecResolver {
    store: Arc<dyn ConfigStorePort>,
}

impl SpecResolver {
    pub fn new(store: Arc<dyn ConfigStorePort>) -> Self {
        Self { store }
    }

    fn parameter_path(customer: &str, tenant: &str, leaf: &str) -> String {
        format!("/{}/{}/framework/CD/{}", customer, tenant, leaf)
    }

    async fn load_parameter<T: DeserializeOwned>(&self, name: &str) -> ConfigResult<T> {
        let value = self.store.get_parameter(name).await?;
        serde_json::from_value(value).map_err(|e| ConfigError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn deployment_metadata(
        &self,
        customer: &str,
        tenant: &str,
    ) -> ConfigResult<DeploymentMetadata> {
        self.load_parameter(&Self::parameter_path(customer, tenant, "DEPLOYMENT/METADATA"))
            .await
    }

    pub async fn cluster_metadata(
        &self,
        customer: &str,
        tenant: &str,
    ) -> ConfigResult<ClusterMetadata> {
        self.load_parameter(&Self::parameter_path(customer, tenant, "CLUSTER/METADATA"))
            .await
    }

    async fn document<T: DeserializeOwned>(&self, bucket: &str, key: &str) -> ConfigResult<T> {
        let value = self.store.get_document(bucket, key).await.map_err(|e| match e {
            StoreError::DocumentNotFound { .. } => ConfigError::MandatoryFilesMissing,
            other => ConfigError::Store(other),
        })?;
        serde_yaml::from_value(value).map_err(|e| ConfigError::Invalid {
            name: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load the four spec documents for one catalog entry. The common
    /// documents are mandatory; region documents fall back to them.
    pub async fn service_specs(&self, entry: &CatalogEntry) -> ConfigResult<ServiceSpecSet> {
        let bucket = entry
            .config_bucket
            .as_deref()
            .ok_or(ConfigError::MandatoryFilesMissing)?;
        let release = entry
            .release_identifier
            .as_deref()
            .ok_or(ConfigError::MandatoryFilesMissing)?;
        let base = format!(
            "variables/{}/{}/{}",
            entry.product, entry.service_name, release
        );
        let region = entry.region.to_lowercase();
        debug!(%bucket, %base, %region, "loading service spec documents");

        let common_app: AppSpec = self.document(bucket, &format!("{}/app.common.yml", base)).await?;
        let common_infra: InfraSpec =
            self.document(bucket, &format!("{}/infra.common.yml", base)).await?;

        let region_app = match self
            .document::<AppSpec>(bucket, &format!("{}/app.{}.yml", base, region))
            .await
        {
            Ok(spec) => spec,
            Err(ConfigError::MandatoryFilesMissing) => {
                warn!(%region, "no region app spec, falling back to common");
                common_app.clone()
            }
            Err(other) => return Err(other),
        };
        let region_infra = match self
            .document::<InfraSpec>(bucket, &format!("{}/infra.{}.yml", base, region))
            .await
        {
            Ok(spec) => spec,
            Err(ConfigError::MandatoryFilesMissing) => {
                warn!(%region, "no region infra spec, falling back to common");
                common_infra.clone()
            }
            Err(other) => return Err(other),
        };

        Ok(ServiceSpecSet {
            common_app,
            region_app,
            common_infra,
            region_infra,
        })
    }
}
