//! Rollout monitoring.
//!
//! After an in-place service update, the monitor polls the live service
//! until the new revision stabilizes, a rollback to the previous
//! revision is inferred, or the timeout budget runs out. It never
//! raises: every session ends in a [`flotilla_types::status::RolloutHealth`]
//! report.

pub mod ledger;
pub mod monitor;

pub use ledger::DeploymentLedger;
pub use monitor::{DeploymentMonitor, MonitorSettings};
