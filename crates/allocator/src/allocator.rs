use std::sync::Arc;

use flotilla_cloud::model::{LoadBalancer, LB_KIND_APPLICATION};
use flotilla_cloud::network::NetworkPort;
use flotilla_types::context::OpContext;
use flotilla_types::resource::TargetGroupSelection;
use tracing::{debug, error, info, warn};

use crate::error::{AllocationError, AllocationResult};

/// Listener-rule capacity cap per application load balancer.
pub const MAX_LISTENERS_PER_BALANCER: usize = 100;

/// What a service needs from the shared pool.
#[derive(Debug, Clone)]
pub struct AllocationRequest<'a> {
    pub product: &'a str,
    pub region: &'a str,
    pub port: u16,
    /// Load-balancer short names this product may use; empty means no
    /// restriction.
    pub allowlist: &'a [String],
}

/// Short name of a balancer: the ARN path segment before the trailing
/// object id, `.../app/<short-name>/<id>`.
fn short_name(arn: &str) -> Option<&str> {
    let mut segments = arn.rsplit('/');
    segments.next()?;
    segments.next()
}

/// Picks a load balancer and listener port for a new service.
pub struct ResourceAllocator {
    network: Arc<dyn NetworkPort>,
}

impl ResourceAllocator {
    pub fn new(network: Arc<dyn NetworkPort>) -> Self {
        Self { network }
    }

    /// Application load balancers in name order whose tags all match the
    /// given (key, permitted-values) filters, case-insensitively.
    async fn permitted_balancers(
        &self,
        filters: &[(&str, &[&str])],
    ) -> AllocationResult<Vec<LoadBalancer>> {
        let mut balancers = self.network.list_load_balancers().await?;
        balancers.sort_by_key(|lb| lb.name.to_uppercase());
        let matching: Vec<LoadBalancer> = balancers
            .into_iter()
            .filter(|lb| lb.kind == LB_KIND_APPLICATION)
            .filter(|lb| filters.iter().all(|(key, values)| lb.tag_matches(key, values)))
            .collect();
        if matching.is_empty() {
            warn!("no application load balancers matched the tag filters");
        }
        Ok(matching)
    }

    /// Claim a port on the shared pool.
    ///
    /// Fails with [`AllocationError::PortConflict`] when any balancer in
    /// the environment already listens on the port, and with
    /// [`AllocationError::CapacityExceeded`] when no permitted candidate
    /// has spare listener capacity.
    pub async fn allocate(
        &self,
        ctx: &OpContext,
        request: &AllocationRequest<'_>,
    ) -> AllocationResult<TargetGroupSelection> {
        info!(
            correlation_id = %ctx.correlation_id,
            product = request.product,
            region = request.region,
            port = request.port,
            "allocating load-balancer capacity"
        );

        // The conflict scan covers every balancer in the environment, not
        // just this product's candidates: a port collides globally.
        let environment = self
            .permitted_balancers(&[("Environment", &[request.region])])
            .await?;
        for balancer in &environment {
            let listeners = self.network.list_listeners(&balancer.arn).await?;
            if let Some(listener) = listeners.iter().find(|l| l.port == request.port) {
                error!(
                    balancer = %balancer.name,
                    listener = %listener.arn,
                    "requested port already in use"
                );
                return Err(AllocationError::PortConflict(request.port));
            }
        }

        let candidates = self
            .permitted_balancers(&[
                ("Environment", &[request.region]),
                ("Product", &["COMMON", request.product]),
            ])
            .await?;

        for balancer in &candidates {
            let listeners = self.network.list_listeners(&balancer.arn).await?;
            if listeners.len() >= MAX_LISTENERS_PER_BALANCER {
                debug!(balancer = %balancer.name, "listener capacity exhausted");
                continue;
            }
            if !request.allowlist.is_empty() {
                let name = short_name(&balancer.arn).unwrap_or(&balancer.name);
                if !request.allowlist.iter().any(|allowed| allowed == name) {
                    info!(balancer = %balancer.arn, "not allow-listed for usage");
                    continue;
                }
            }
            info!(balancer = %balancer.arn, "selected load balancer");
            return Ok(TargetGroupSelection {
                target_group_arn: None,
                listener_arn: None,
                load_balancer_arn: balancer.arn.clone(),
                port: request.port,
                target_group_name: TargetGroupSelection::derive_name(
                    request.product,
                    request.region,
                    request.port,
                ),
            });
        }

        error!("no available load balancers found");
        Err(AllocationError::CapacityExceeded)
    }

    /// Drop the listener serving a port on one balancer; absent listeners
    /// are logged, not errors, so cleanup stays idempotent.
    pub async fn drop_listener_mapping(
        &self,
        load_balancer_arn: &str,
        port: u16,
    ) -> AllocationResult<()> {
        let listeners = self.network.list_listeners(load_balancer_arn).await?;
        match listeners.iter().find(|l| l.port == port) {
            Some(listener) => {
                self.network.delete_listener(&listener.arn).await?;
                info!(port, listener = %listener.arn, "deleted listener");
            }
            None => {
                error!(port, "no listener found on port");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_cloud::model::Listener;
    use flotilla_cloud::SimulatedCloud;
    use std::collections::HashMap;

    fn balancer(name: &str, tags: &[(&str, &str)]) -> LoadBalancer {
        LoadBalancer {
            arn: format!("arn:lb:loadbalancer/app/{}/0123abcd", name),
            name: name.to_string(),
            kind: LB_KIND_APPLICATION.to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn listener(lb: &LoadBalancer, port: u16) -> Listener {
        Listener {
            arn: format!("{}/listener/{}", lb.arn, port),
            load_balancer_arn: lb.arn.clone(),
            port,
        }
    }

    fn request<'a>(allowlist: &'a [String]) -> AllocationRequest<'a> {
        AllocationRequest {
            product: "caps",
            region: "EU1",
            port: 8443,
            allowlist,
        }
    }

    #[tokio::test]
    async fn picks_first_candidate_in_name_order() {
        let cloud = SimulatedCloud::new();
        // Added out of order; selection must still follow name order.
        cloud.add_load_balancer(balancer(
            "alb-hps-eu1-02",
            &[("Environment", "eu1"), ("Product", "caps")],
        ));
        cloud.add_load_balancer(balancer(
            "alb-hps-eu1-01",
            &[("Environment", "eu1"), ("Product", "COMMON")],
        ));

        let allocator = ResourceAllocator::new(Arc::new(cloud));
        let selection = allocator
            .allocate(&OpContext::new_root("run-1"), &request(&[]))
            .await
            .unwrap();
        assert!(selection.load_balancer_arn.contains("alb-hps-eu1-01"));
        assert_eq!(selection.target_group_name, "tgp-ecs-caps-eu1-8443");
    }

    #[tokio::test]
    async fn port_conflict_even_on_non_candidate_balancer() {
        let cloud = SimulatedCloud::new();
        // Same environment, different product: still blocks the port.
        let other = balancer("alb-other-eu1", &[("Environment", "EU1"), ("Product", "other")]);
        cloud.add_listener(listener(&other, 8443));
        cloud.add_load_balancer(other);
        cloud.add_load_balancer(balancer(
            "alb-hps-eu1-01",
            &[("Environment", "EU1"), ("Product", "caps")],
        ));

        let allocator = ResourceAllocator::new(Arc::new(cloud));
        let err = allocator
            .allocate(&OpContext::new_root("run-1"), &request(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::PortConflict(8443)));
    }

    #[tokio::test]
    async fn full_balancers_are_skipped() {
        let cloud = SimulatedCloud::new();
        let full = balancer("alb-a-full", &[("Environment", "EU1"), ("Product", "COMMON")]);
        for port in 0..MAX_LISTENERS_PER_BALANCER as u16 {
            cloud.add_listener(listener(&full, 9000 + port));
        }
        cloud.add_load_balancer(full);
        cloud.add_load_balancer(balancer(
            "alb-b-free",
            &[("Environment", "EU1"), ("Product", "COMMON")],
        ));

        let allocator = ResourceAllocator::new(Arc::new(cloud));
        let selection = allocator
            .allocate(&OpContext::new_root("run-1"), &request(&[]))
            .await
            .unwrap();
        assert!(selection.load_balancer_arn.contains("alb-b-free"));
    }

    #[tokio::test]
    async fn no_candidate_is_capacity_exceeded() {
        let cloud = SimulatedCloud::new();
        cloud.add_load_balancer(balancer("alb-us1", &[("Environment", "US1")]));

        let allocator = ResourceAllocator::new(Arc::new(cloud));
        let err = allocator
            .allocate(&OpContext::new_root("run-1"), &request(&[]))
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::CapacityExceeded));
    }

    #[tokio::test]
    async fn allowlist_restricts_by_short_name() {
        let cloud = SimulatedCloud::new();
        cloud.add_load_balancer(balancer(
            "alb-hps-eu1-01",
            &[("Environment", "EU1"), ("Product", "COMMON")],
        ));
        cloud.add_load_balancer(balancer(
            "alb-hps-eu1-02",
            &[("Environment", "EU1"), ("Product", "COMMON")],
        ));

        let allowlist = vec!["alb-hps-eu1-02".to_string()];
        let allocator = ResourceAllocator::new(Arc::new(cloud));
        let selection = allocator
            .allocate(&OpContext::new_root("run-1"), &request(&allowlist))
            .await
            .unwrap();
        assert!(selection.load_balancer_arn.contains("alb-hps-eu1-02"));
    }

    #[tokio::test]
    async fn drop_listener_mapping_is_idempotent() {
        let cloud = Arc::new(SimulatedCloud::new());
        let lb = balancer("alb-hps-eu1-01", &[("Environment", "EU1")]);
        cloud.add_listener(listener(&lb, 8443));
        let arn = lb.arn.clone();
        cloud.add_load_balancer(lb);

        let allocator = ResourceAllocator::new(cloud.clone());
        allocator.drop_listener_mapping(&arn, 8443).await.unwrap();
        assert_eq!(cloud.deleted_listeners().len(), 1);
        // Second drop finds nothing and stays quiet.
        allocator.drop_listener_mapping(&arn, 8443).await.unwrap();
        assert_eq!(cloud.deleted_listeners().len(), 1);
    }

    #[test]
    fn short_name_is_segment_before_object_id() {
        assert_eq!(
            short_name("arn:lb:loadbalancer/app/alb-hps-eu1-01/aa58cc79"),
            Some("alb-hps-eu1-01")
        );
        assert_eq!(short_name("no-slashes"), None);
    }
}
