//! Config collaborator port.
//!
//! Configuration parameters are keyed by hierarchical namespace paths;
//! service specification documents are keyed by (bucket, key). Missing
//! values surface as typed not-found errors.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;

/// Read access to configuration parameters and spec documents. Secret
/// values are never read; container definitions carry reference paths
/// the runtime resolves on its own.
#[async_trait]
pub trait ConfigStorePort: Send + Sync {
    /// Fetch and parse a JSON configuration parameter.
    async fn get_parameter(&self, name: &str) -> Result<serde_json::Value, StoreError>;

    /// Fetch a YAML specification document.
    async fn get_document(&self, bucket: &str, key: &str) -> Result<serde_yaml::Value, StoreError>;
}

/// In-memory config store for tests and the simulation-backed CLI.
#[derive(Default)]
pub struct SimulatedConfigStore {
    parameters: DashMap<String, serde_json::Value>,
    documents: DashMap<String, serde_yaml::Value>,
}

impl SimulatedConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_parameter(&self, name: impl Into<String>, value: serde_json::Value) {
        self.parameters.insert(name.into(), value);
    }

    pub fn put_document(&self, bucket: &str, key: &str, value: serde_yaml::Value) {
        self.documents.insert(format!("{}/{}", bucket, key), value);
    }
}

#[async_trait]
impl ConfigStorePort for SimulatedConfigStore {
    async fn get_parameter(&self, name: &str) -> Result<serde_json::Value, StoreError> {
        self.parameters
            .get(name)
            .map(|v| v.clone())
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn get_document(&self, bucket: &str, key: &str) -> Result<serde_yaml::Value, StoreError> {
        self.documents
            .get(&format!("{}/{}", bucket, key))
            .map(|v| v.clone())
            .ok_or_else(|| StoreError::DocumentNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_parameter_is_typed_not_found() {
        let store = SimulatedConfigStore::new();
        let err = store.get_parameter("/ACME/CORE/missing").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn documents_round_trip() {
        let store = SimulatedConfigStore::new();
        let doc: serde_yaml::Value = serde_yaml::from_str("variables:\n  APP_PORT: 8080").unwrap();
        store.put_document("cfg-bucket", "variables/hps/billing/r1/app.common.yml", doc);
        let fetched = store
            .get_document("cfg-bucket", "variables/hps/billing/r1/app.common.yml")
            .await
            .unwrap();
        assert!(fetched.get("variables").is_some());
    }
}
