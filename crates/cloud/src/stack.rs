//! Stack collaborator port: declarative infrastructure provisioning.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CloudResult;
use crate::model::{StackResource, StackSummary};

/// Provisioning operations for desired-state stacks.
///
/// Create/update/delete block until the stack reaches a terminal state or
/// the wait budget is exhausted, in which case they fail with
/// [`crate::CloudError::WaitTimeout`].
#[async_trait]
pub trait StackPort: Send + Sync {
    /// List stacks currently in one of the given statuses.
    async fn list_stacks(&self, status_filter: &[&str]) -> CloudResult<Vec<StackSummary>>;

    /// List the resources of one stack.
    async fn list_stack_resources(&self, stack_name: &str) -> CloudResult<Vec<StackResource>>;

    /// Whether a stack with this name exists at all.
    async fn stack_exists(&self, stack_name: &str) -> CloudResult<bool>;

    /// Create a stack and wait up to `max_wait` for completion.
    async fn create_stack(
        &self,
        stack_name: &str,
        template_body: serde_json::Value,
        max_wait: Duration,
    ) -> CloudResult<()>;

    /// Update a stack and wait up to `max_wait` for completion.
    async fn update_stack(
        &self,
        stack_name: &str,
        template_body: serde_json::Value,
        max_wait: Duration,
    ) -> CloudResult<()>;

    /// Delete a stack and wait for the deletion to complete.
    async fn delete_stack(&self, stack_name: &str) -> CloudResult<()>;

    /// Ensure the log group a new service writes to exists.
    async fn ensure_log_group(&self, name: &str) -> CloudResult<()>;
}
