//! Resource identification and allocation results.

use serde::{Deserialize, Serialize};

/// Locates an existing stack by the physical id of one of its resources
/// rather than by stack name alone, since stack names drift over time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    /// Logical resource id to match, e.g. `ECSService`.
    pub service_type: String,

    /// Substring expected inside the matching resource's physical id.
    pub resource: String,

    pub service_name: String,
    pub region: String,
    pub cluster_name: String,
}

/// A load-balancer/listener/port selection produced by the allocator.
///
/// Valid only when no other active listener in the environment serves the
/// port and the chosen load balancer has spare listener-rule capacity at
/// selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetGroupSelection {
    /// ARN of an already-existing target group, when one was found.
    pub target_group_arn: Option<String>,

    /// ARN of an already-existing listener on the selected port, when one
    /// was found.
    pub listener_arn: Option<String>,

    pub load_balancer_arn: String,

    pub port: u16,

    /// Deterministic target-group name derived from product, region, and
    /// port, enabling idempotent re-selection across runs.
    pub target_group_name: String,
}

impl TargetGroupSelection {
    /// Deterministic target-group name for a product/region/port triple.
    pub fn derive_name(product: &str, region: &str, port: u16) -> String {
        format!("tgp-ecs-{}-{}-{}", product, region.to_lowercase(), port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_group_name_is_deterministic() {
        let a = TargetGroupSelection::derive_name("hps", "EU1", 8443);
        let b = TargetGroupSelection::derive_name("hps", "eu1", 8443);
        assert_eq!(a, "tgp-ecs-hps-eu1-8443");
        assert_eq!(a, b);
    }
}
