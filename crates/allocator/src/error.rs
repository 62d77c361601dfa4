use flotilla_cloud::error::CloudError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllocationError {
    /// Another listener in the environment already serves this port.
    #[error("Port {0} already in use")]
    PortConflict(u16),

    /// No permitted load balancer has spare listener capacity.
    #[error("No ALB found to add Listener Mappings")]
    CapacityExceeded,

    #[error(transparent)]
    Cloud(#[from] CloudError),
}

pub type AllocationResult<T> = Result<T, AllocationError>;
