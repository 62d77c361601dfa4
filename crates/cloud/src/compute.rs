//! Compute collaborator port: services, task definitions, tasks.

use async_trait::async_trait;

use crate::error::CloudResult;
use crate::model::{ServiceDescription, ServiceUpdate, Task, TaskDefinition};

/// Compute operations scoped by (cluster, service) identifiers.
#[async_trait]
pub trait ComputePort: Send + Sync {
    /// Describe a service; `None` when it does not exist.
    async fn describe_service(
        &self,
        cluster: &str,
        service: &str,
    ) -> CloudResult<Option<ServiceDescription>>;

    /// Apply an update to a live service.
    async fn update_service(&self, update: ServiceUpdate) -> CloudResult<ServiceDescription>;

    /// Delete a service.
    async fn delete_service(&self, cluster: &str, service: &str) -> CloudResult<()>;

    /// Describe a task definition by ARN or family reference.
    async fn describe_task_definition(&self, reference: &str) -> CloudResult<TaskDefinition>;

    /// Register a new task-definition revision; the returned value
    /// carries the server-assigned ARN, revision, and registration time.
    async fn register_task_definition(
        &self,
        definition: TaskDefinition,
    ) -> CloudResult<TaskDefinition>;

    /// List task ARNs for a service in a given desired status.
    async fn list_tasks(
        &self,
        cluster: &str,
        service: &str,
        desired_status: &str,
    ) -> CloudResult<Vec<String>>;

    /// Describe tasks by ARN.
    async fn describe_tasks(&self, cluster: &str, task_arns: &[String]) -> CloudResult<Vec<Task>>;

    /// VPC ids usable by a cluster, via its container instances. Empty
    /// when the cluster has no registered instances.
    async fn cluster_vpcs(&self, cluster: &str) -> CloudResult<Vec<String>>;
}
