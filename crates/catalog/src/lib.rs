//! # flotilla-catalog
//!
//! Catalog-driven deployment orchestration: the sequencer walks one
//! catalog's entries in execution order through the database stage, the
//! convergence engine, and the rollout monitor; lifecycle modes
//! (`stop`/`start`/`cleanup`/`cleanupTg`) bypass convergence; the
//! aggregator folds every stage's result into one verdict per service.
//! The runner at the top processes a directory of catalog files and
//! never lets one catalog's failure reach another.

#![deny(unsafe_code)]

pub mod aggregate;
pub mod cleanup;
pub mod runner;
pub mod sequencer;

pub use aggregate::StatusAggregator;
pub use cleanup::CleanupRunner;
pub use runner::{DeploymentRunner, DEFAULT_CUSTOMER, DEFAULT_TENANT};
pub use sequencer::CatalogSequencer;
