//! Network collaborator port: load balancers, listeners, target groups.

use async_trait::async_trait;

use crate::error::CloudResult;
use crate::model::{Listener, LoadBalancer, TargetGroup};

/// Load-balancing operations the allocator and cleanup paths need.
#[async_trait]
pub trait NetworkPort: Send + Sync {
    /// List every load balancer in the environment, any kind.
    async fn list_load_balancers(&self) -> CloudResult<Vec<LoadBalancer>>;

    /// List the listeners attached to one load balancer.
    async fn list_listeners(&self, load_balancer_arn: &str) -> CloudResult<Vec<Listener>>;

    /// Delete a listener.
    async fn delete_listener(&self, listener_arn: &str) -> CloudResult<()>;

    /// Describe a target group by name.
    async fn describe_target_group(&self, name: &str) -> CloudResult<Option<TargetGroup>>;

    /// Describe a target group by ARN.
    async fn describe_target_group_by_arn(&self, arn: &str) -> CloudResult<Option<TargetGroup>>;

    /// Delete a target group by ARN.
    async fn delete_target_group(&self, arn: &str) -> CloudResult<()>;

    /// Modify a target group's health-check path.
    async fn modify_health_check_path(&self, arn: &str, path: &str) -> CloudResult<()>;
}
