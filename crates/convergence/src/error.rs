use flotilla_allocator::AllocationError;
use flotilla_cloud::error::CloudError;
use flotilla_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvergenceError {
    /// Creation is gated off for this product/region.
    #[error("Service Creation Not Enabled")]
    CreationDisabled,

    /// The target cluster has no registered instances, so there is no
    /// VPC to place the target group into.
    #[error("Instances not found for cluster:{0}")]
    ClusterUnavailable(String),

    /// The stack was created but never stabilized within the wait
    /// budget; the partial stack has already been rolled back.
    #[error("Service created , Health Check haven't returned Success within wait time")]
    CreateTimeout,

    /// Any other convergence-action failure; the partial stack, if any,
    /// has already been rolled back.
    #[error("Service creation failed: {0}")]
    StackOperation(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

pub type ConvergenceResult<T> = Result<T, ConvergenceError>;
