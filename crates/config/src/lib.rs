//! Layered deployment configuration.
//!
//! Two configuration planes feed a deployment run:
//!
//! * **Platform metadata**: JSON parameters keyed by customer/tenant,
//!   holding per-product defaults (create gating, cluster overrides,
//!   role and namespace overrides, service-connect namespaces).
//! * **Service specification documents**: YAML `app.*`/`infra.*` files
//!   read per catalog entry, with region-specific documents falling back
//!   to their `common` counterparts.
//!
//! Both planes resolve most-specific-wins: a global default is shadowed
//! by a product-level value, which is shadowed by a product+region
//! value. Absence at a layer inherits from the layer above.

pub mod error;
pub mod metadata;
pub mod resolver;
pub mod spec;

pub use error::ConfigError;
pub use metadata::{ClusterMetadata, DeploymentMetadata};
pub use resolver::SpecResolver;
pub use spec::{AppSpec, InfraSpec, ServiceSpecSet, VariableSpec};
