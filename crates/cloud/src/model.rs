//! Wire model for the infrastructure ports.
//!
//! These structs mirror what the describe/create/update primitives
//! exchange. Fields the engine treats as pass-through (network
//! configuration, placement rules, deployment controller) are carried as
//! opaque JSON values so updates preserve them untouched.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const LB_KIND_APPLICATION: &str = "application";
pub const PRIMARY_DEPLOYMENT_STATUS: &str = "PRIMARY";
pub const INACTIVE_SERVICE_STATUS: &str = "INACTIVE";
pub const RUNNING_TASK_STATUS: &str = "RUNNING";
pub const HEALTHY_CONTAINER_STATUS: &str = "HEALTHY";

/// A load balancer with its resource tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub arn: String,
    pub name: String,
    /// `application` or `network`; only application LBs participate in
    /// allocation.
    pub kind: String,
    pub tags: HashMap<String, String>,
}

impl LoadBalancer {
    /// Whether a tag holds one of the permitted values,
    /// case-insensitively.
    pub fn tag_matches(&self, key: &str, permitted: &[&str]) -> bool {
        self.tags.get(key).is_some_and(|value| {
            permitted
                .iter()
                .any(|p| value.eq_ignore_ascii_case(p))
        })
    }
}

/// A listener routing one port on a load balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listener {
    pub arn: String,
    pub load_balancer_arn: String,
    pub port: u16,
}

/// A target group routing traffic to a service's tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetGroup {
    pub arn: String,
    pub name: String,
    pub port: u16,
    pub health_check_path: String,
    pub load_balancer_arns: Vec<String>,
    pub vpc_id: Option<String>,
}

/// Client alias of a service-connect service entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConnectAlias {
    pub port: u16,
    pub dns_name: String,
}

/// One published service in a service-connect configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConnectService {
    pub port_name: String,
    pub discovery_name: String,
    pub client_aliases: Vec<ServiceConnectAlias>,
}

/// Inter-service networking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConnectConfig {
    pub enabled: bool,
    pub namespace: String,
    pub services: Vec<ServiceConnectService>,
}

/// One rollout revision reported by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentState {
    pub id: String,
    /// `PRIMARY` for the promoted revision, `ACTIVE` for superseded ones.
    pub status: String,
    pub task_definition: String,
    pub desired_count: i64,
    pub running_count: i64,
    pub pending_count: i64,
    pub failed_tasks: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub service_connect: Option<ServiceConnectConfig>,
}

/// A free-text event from the service's event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEvent {
    pub created_at: DateTime<Utc>,
    pub message: String,
}

/// Binding between a service and a target group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBalancerBinding {
    pub target_group_arn: String,
    pub container_name: String,
    pub container_port: u16,
}

/// Live description of a compute service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescription {
    pub cluster: String,
    pub service_name: String,
    /// `ACTIVE`, `DRAINING`, or `INACTIVE`.
    pub status: String,
    pub desired_count: i64,
    pub running_count: i64,
    pub pending_count: i64,
    pub task_definition: String,
    pub deployments: Vec<DeploymentState>,
    pub events: Vec<ServiceEvent>,
    pub load_balancers: Vec<LoadBalancerBinding>,

    // Non-declarative settings preserved verbatim on update.
    pub network_configuration: Option<serde_json::Value>,
    pub deployment_configuration: Option<serde_json::Value>,
    pub deployment_controller: Option<serde_json::Value>,
    pub placement_strategy: Option<serde_json::Value>,
    pub placement_constraints: Option<serde_json::Value>,
    pub scheduling_strategy: Option<String>,
    pub service_registries: Option<serde_json::Value>,
    pub health_check_grace_period_seconds: Option<i64>,
}

impl ServiceDescription {
    /// The currently promoted deployment, if any.
    pub fn primary_deployment(&self) -> Option<&DeploymentState> {
        self.deployments
            .iter()
            .find(|d| d.status == PRIMARY_DEPLOYMENT_STATUS)
    }

    pub fn is_inactive(&self) -> bool {
        self.status == INACTIVE_SERVICE_STATUS
    }
}

/// Environment-file reference attached to a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvFileRef {
    pub value: String,
    /// Source kind, e.g. `s3`.
    pub kind: String,
}

/// Secret reference attached to a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
    pub value_from: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValue {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortMapping {
    pub container_port: u16,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckSpec {
    /// Probe command; index 1 holds the probe URL by convention.
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountPoint {
    pub source_volume: String,
    pub container_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub name: String,
    pub host_source_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfiguration {
    pub driver: Option<String>,
    pub options: HashMap<String, String>,
}

/// One container definition inside a task definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerDefinition {
    pub name: String,
    pub image: String,
    pub memory: Option<i64>,
    pub memory_reservation: Option<i64>,
    pub port_mappings: Vec<PortMapping>,
    pub health_check: Option<HealthCheckSpec>,
    pub environment: Vec<KeyValue>,
    pub environment_files: Vec<EnvFileRef>,
    pub secrets: Vec<SecretRef>,
    pub mount_points: Vec<MountPoint>,
    pub log_configuration: Option<LogConfiguration>,
    pub user: Option<String>,
}

/// A task definition revision.
///
/// `arn`, `revision`, and `registered_at` are server-assigned; the
/// convergence diff ignores them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub arn: Option<String>,
    pub family: String,
    pub revision: Option<i64>,
    pub network_mode: Option<String>,
    pub execution_role_arn: Option<String>,
    pub task_role_arn: Option<String>,
    pub containers: Vec<ContainerDefinition>,
    pub volumes: Vec<Volume>,
    pub registered_at: Option<DateTime<Utc>>,
}

/// Health report for one container of a running task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub name: String,
    /// `HEALTHY`, `UNHEALTHY`, or `UNKNOWN`; absent when the container
    /// defines no health check.
    pub health_status: Option<String>,
}

/// A running task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub arn: String,
    pub task_definition_arn: String,
    pub last_status: String,
    pub containers: Vec<ContainerStatus>,
}

/// Update request applied to a live service.
///
/// Non-declarative settings are copied from the live description so an
/// update never clobbers them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceUpdate {
    pub cluster: String,
    pub service: String,
    pub desired_count: i64,
    pub task_definition: String,
    pub force_new_deployment: bool,
    pub service_connect: Option<ServiceConnectConfig>,

    pub network_configuration: Option<serde_json::Value>,
    pub deployment_configuration: Option<serde_json::Value>,
    pub deployment_controller: Option<serde_json::Value>,
    pub placement_strategy: Option<serde_json::Value>,
    pub placement_constraints: Option<serde_json::Value>,
    pub scheduling_strategy: Option<String>,
    pub service_registries: Option<serde_json::Value>,
    pub health_check_grace_period_seconds: Option<i64>,
}

impl ServiceUpdate {
    /// Build an update that preserves every non-declarative setting of
    /// the live service and forces a new rollout.
    pub fn preserving(live: &ServiceDescription, task_definition: String, desired_count: i64) -> Self {
        Self {
            cluster: live.cluster.clone(),
            service: live.service_name.clone(),
            desired_count,
            task_definition,
            force_new_deployment: true,
            service_connect: None,
            network_configuration: live.network_configuration.clone(),
            deployment_configuration: live.deployment_configuration.clone(),
            deployment_controller: live.deployment_controller.clone(),
            placement_strategy: live.placement_strategy.clone(),
            placement_constraints: live.placement_constraints.clone(),
            scheduling_strategy: live.scheduling_strategy.clone(),
            service_registries: live.service_registries.clone(),
            health_check_grace_period_seconds: live.health_check_grace_period_seconds,
        }
    }
}

/// Summary of a provisioned stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSummary {
    pub name: String,
    pub status: String,
}

/// One resource inside a stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackResource {
    pub logical_id: String,
    pub physical_id: String,
}
