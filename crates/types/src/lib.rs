//! # flotilla-types
//!
//! Shared data model for the Flotilla deployment convergence engine:
//! catalog documents and entries, per-entry deployment status records,
//! resource identifiers, and the explicit operation context threaded
//! through every stage in place of ambient logging state.

#![deny(unsafe_code)]

pub mod catalog;
pub mod context;
pub mod resource;
pub mod status;

pub use catalog::{CatalogDocument, CatalogEntry, CatalogHeader, DacpacRef, DeployMode};
pub use context::OpContext;
pub use resource::{ResourceIdentifier, TargetGroupSelection};
pub use status::{
    AppStage, ComponentType, DbComponentStatus, DeploymentStatus, HealthOutcome, RolloutHealth,
    Verdict,
};
