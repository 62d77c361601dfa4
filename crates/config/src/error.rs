use flotilla_cloud::error::StoreError;
use thiserror::Error;

/// Failures while loading or interpreting configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The common application spec carries no `variables` block, or a
    /// mandatory variable is absent.
    #[error("Mandatory Parameters missing in config files")]
    MandatoryParametersMissing,

    /// A mandatory spec document could not be fetched.
    #[error("Mandatory Config Files missing")]
    MandatoryFilesMissing,

    /// A document or parameter fetched fine but did not parse into the
    /// expected shape.
    #[error("invalid configuration in {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
