//! # flotilla-cloud
//!
//! Collaborator ports for the convergence engine and their simulated
//! implementations.
//!
//! The engine never talks to cloud APIs directly: it consumes narrow
//! `async_trait` ports (network, compute, stack, config store, database
//! deployer, notifier) injected at construction time. Production binaries
//! supply real clients; tests and the simulation-backed CLI supply the
//! `Simulated*` types in this crate.

#![deny(unsafe_code)]

pub mod compute;
pub mod database;
pub mod error;
pub mod model;
pub mod network;
pub mod notify;
pub mod simulated;
pub mod stack;
pub mod store;

pub use compute::ComputePort;
pub use database::{DatabaseDeployer, SimulatedDatabaseDeployer};
pub use error::{CloudError, CloudResult, StoreError};
pub use network::NetworkPort;
pub use notify::{Notifier, TracingNotifier};
pub use simulated::SimulatedCloud;
pub use stack::StackPort;
pub use store::{ConfigStorePort, SimulatedConfigStore};
