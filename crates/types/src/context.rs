//! Operation context threaded through every stage.
//!
//! Replaces implicit call-scoped logging state with an explicit value:
//! every allocator/convergence/monitor call receives an `OpContext` and
//! includes its fields in log lines.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation context for one unit of work.
///
/// A root context covers a whole run; each catalog gets a child context
/// labelled with the catalog name so its log lines stay attributable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpContext {
    /// Correlation id, propagated to children.
    pub correlation_id: String,

    /// Run id for the whole invocation.
    pub run_id: String,

    /// Scope label, e.g. `MainDeployment` or `Catalog:web-catalog.yml`.
    pub scope: String,
}

impl OpContext {
    /// Create a root context for a run.
    pub fn new_root(run_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            run_id: run_id.into(),
            scope: "MainDeployment".into(),
        }
    }

    /// Create a child context scoped to a narrower unit of work.
    ///
    /// The correlation id is inherited so log lines across stages can be
    /// joined back to the run.
    pub fn child(&self, scope: impl Into<String>) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            run_id: self.run_id.clone(),
            scope: scope.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_inherits_correlation_id() {
        let root = OpContext::new_root("12345");
        let child = root.child("Catalog:web-catalog.yml");
        assert_eq!(child.correlation_id, root.correlation_id);
        assert_eq!(child.run_id, "12345");
        assert_eq!(child.scope, "Catalog:web-catalog.yml");
    }

    #[test]
    fn roots_are_distinct() {
        let a = OpContext::new_root("1");
        let b = OpContext::new_root("1");
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
