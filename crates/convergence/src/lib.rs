//! Stack convergence.
//!
//! Given a desired state assembled from catalog + configuration, the
//! engine decides between creating a new service stack and updating the
//! live service in place, keeping the applied change minimal: the task
//! definition is re-registered only when a field-level diff shows real
//! drift, and every non-declarative service setting survives an update
//! untouched.

pub mod desired;
pub mod diff;
pub mod engine;
pub mod error;

pub use desired::{DesiredState, DesiredStateBuilder, DesiredTargetGroup};
pub use engine::{ConvergenceAction, ConvergenceOutcome, StackConvergenceEngine};
pub use error::ConvergenceError;
