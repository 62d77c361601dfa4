//! Service specification documents.
//!
//! Each service ships four YAML documents per release:
//! `app.common.yml` / `app.{region}.yml` with variables and mount points,
//! and `infra.common.yml` / `infra.{region}.yml` with sizing and cluster
//! hints. Region documents shadow common ones value by value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ConfigResult};

/// One entry in an app spec's `variables` block: either a reference to a
/// parameter/secret, or a plain scalar consumed directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableSpec {
    Reference {
        reference: String,
        #[serde(default, rename = "type")]
        kind: Option<String>,
    },
    Scalar(serde_yaml::Value),
}

impl VariableSpec {
    pub fn as_str(&self) -> Option<String> {
        match self {
            VariableSpec::Scalar(serde_yaml::Value::String(s)) => Some(s.clone()),
            VariableSpec::Scalar(serde_yaml::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn as_port(&self) -> Option<u16> {
        match self {
            VariableSpec::Scalar(serde_yaml::Value::Number(n)) => {
                n.as_u64().and_then(|v| u16::try_from(v).ok())
            }
            VariableSpec::Scalar(serde_yaml::Value::String(s)) => s.parse().ok(),
            _ => None,
        }
    }

    fn is_secret(&self) -> bool {
        matches!(self, VariableSpec::Reference { kind: Some(k), .. } if k == "secret")
    }
}

/// A host-path mount requested by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPointSpec {
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub container_path: Option<String>,
}

/// An `app.*.yml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSpec {
    #[serde(default)]
    pub variables: Option<BTreeMap<String, VariableSpec>>,
    #[serde(default)]
    pub mount_points: Option<Vec<MountPointSpec>>,
}

/// An `infra.*.yml` document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfraSpec {
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub instance_count: Option<i64>,
    #[serde(default)]
    pub min_memory: Option<i64>,
    #[serde(default)]
    pub max_memory: Option<i64>,
    #[serde(default)]
    pub run_user: Option<String>,
    #[serde(default)]
    pub enable_inter_service_communication: Option<bool>,
}

/// Resolved parameter/secret references collected from the variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceBindings {
    pub parameters: BTreeMap<String, String>,
    pub secrets: BTreeMap<String, String>,
}

fn trim_slashes(value: &str) -> String {
    value.trim_matches('/').to_string()
}

/// The four documents of one service release, with layered accessors.
#[derive(Debug, Clone, Default)]
pub struct ServiceSpecSet {
    pub common_app: AppSpec,
    pub region_app: AppSpec,
    pub common_infra: InfraSpec,
    pub region_infra: InfraSpec,
}

impl ServiceSpecSet {
    /// Region variable if present, otherwise the common one.
    pub fn variable(&self, name: &str) -> Option<&VariableSpec> {
        self.region_app
            .variables
            .as_ref()
            .and_then(|v| v.get(name))
            .or_else(|| self.common_app.variables.as_ref().and_then(|v| v.get(name)))
    }

    /// The common document must declare a variables block.
    pub fn require_variables(&self) -> ConfigResult<()> {
        if self.common_app.variables.is_none() {
            return Err(ConfigError::MandatoryParametersMissing);
        }
        Ok(())
    }

    pub fn application_port(&self) -> ConfigResult<u16> {
        self.variable("APP_PORT")
            .and_then(VariableSpec::as_port)
            .ok_or(ConfigError::MandatoryParametersMissing)
    }

    /// Context path with surrounding slashes stripped; empty when unset.
    pub fn context_path(&self) -> String {
        match self.variable("APP_CONTEXT_PATH").and_then(VariableSpec::as_str) {
            Some(path) => trim_slashes(&path),
            None => {
                warn!("context path not defined, defaulting to empty");
                String::new()
            }
        }
    }

    /// Health endpoint with surrounding slashes stripped; empty when
    /// unset.
    pub fn health_api(&self) -> String {
        match self.variable("HEALTH_CHECK_PATH").and_then(VariableSpec::as_str) {
            Some(path) => trim_slashes(&path),
            None => {
                warn!("health api not defined, defaulting to empty");
                String::new()
            }
        }
    }

    /// Path probed by the load balancer's target group.
    pub fn health_check_path(&self) -> String {
        format!("/{}/{}", self.context_path(), self.health_api())
    }

    /// `port/context/health` probe address used by the container health
    /// check; the context segment drops out when empty.
    pub fn health_check_uri(&self, port: u16) -> String {
        let context = self.context_path();
        if context.is_empty() {
            format!("{}/{}", port, self.health_api())
        } else {
            format!("{}/{}/{}", port, context, self.health_api())
        }
    }

    /// Default cluster: region override, or the common name suffixed with
    /// the lowercased region code.
    pub fn default_cluster(&self, region: &str) -> ConfigResult<String> {
        if let Some(name) = &self.region_infra.cluster_name {
            return Ok(name.clone());
        }
        let base = self
            .common_infra
            .cluster_name
            .as_ref()
            .ok_or(ConfigError::MandatoryParametersMissing)?;
        Ok(format!("{}-{}", base, region.to_lowercase()))
    }

    /// Non-standard service name, when the common infra spec pins one.
    pub fn service_name_override(&self) -> Option<&str> {
        self.common_infra.service_name.as_deref()
    }

    pub fn instance_count(&self) -> Option<i64> {
        self.region_infra
            .instance_count
            .or(self.common_infra.instance_count)
    }

    /// Common document wins for the run user, region is the fallback.
    pub fn run_user(&self) -> Option<&str> {
        self.common_infra
            .run_user
            .as_deref()
            .or(self.region_infra.run_user.as_deref())
    }

    pub fn min_memory(&self) -> i64 {
        self.region_infra
            .min_memory
            .or(self.common_infra.min_memory)
            .unwrap_or(512)
    }

    /// Never below the reservation.
    pub fn max_memory(&self) -> i64 {
        let min = self.min_memory();
        let max = self
            .region_infra
            .max_memory
            .or(self.common_infra.max_memory)
            .unwrap_or(min);
        max.max(min)
    }

    pub fn inter_service_communication(&self) -> bool {
        self.region_infra
            .enable_inter_service_communication
            .or(self.common_infra.enable_inter_service_communication)
            .unwrap_or(false)
    }

    /// Mount points from the region document, else common; entries
    /// missing either path are dropped.
    pub fn mount_points(&self) -> Vec<(String, String)> {
        let source = self
            .region_app
            .mount_points
            .as_ref()
            .or(self.common_app.mount_points.as_ref());
        source
            .map(|points| {
                points
                    .iter()
                    .filter_map(|p| match (&p.source_path, &p.container_path) {
                        (Some(src), Some(dst)) => Some((src.clone(), dst.clone())),
                        _ => {
                            warn!("skipping mount point with missing path");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Collect parameter and secret references, region shadowing common
    /// per variable name.
    pub fn reference_bindings(&self) -> ReferenceBindings {
        let mut bindings = ReferenceBindings::default();
        for variables in [
            self.common_app.variables.as_ref(),
            self.region_app.variables.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            for (name, variable) in variables {
                if let VariableSpec::Reference { reference, .. } = variable {
                    if variable.is_secret() {
                        bindings.parameters.remove(name);
                        bindings.secrets.insert(name.clone(), reference.clone());
                    } else {
                        bindings.secrets.remove(name);
                        bindings.parameters.insert(name.clone(), reference.clone());
                    }
                }
            }
        }
        bindings
    }
}
