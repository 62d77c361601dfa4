//! Lifecycle modes that bypass convergence.
//!
//! `stop`/`start` scale a live service's desired count to 0 or 1 while
//! preserving every non-declarative setting. `cleanup` additionally
//! tears down the service's target group, its listener mapping, and the
//! service itself. `cleanupTg` removes an orphaned target group and its
//! listener by ARN, for entries whose service is already gone.

use std::sync::Arc;

use flotilla_allocator::ResourceAllocator;
use flotilla_cloud::model::{ServiceDescription, ServiceUpdate};
use flotilla_cloud::{ComputePort, NetworkPort};
use flotilla_types::{CatalogEntry, DeployMode, DeploymentStatus, OpContext, Verdict};
use tracing::{error, info};

pub struct CleanupRunner {
    compute: Arc<dyn ComputePort>,
    network: Arc<dyn NetworkPort>,
    allocator: Arc<ResourceAllocator>,
}

impl CleanupRunner {
    pub fn new(
        compute: Arc<dyn ComputePort>,
        network: Arc<dyn NetworkPort>,
        allocator: Arc<ResourceAllocator>,
    ) -> Self {
        Self {
            compute,
            network,
            allocator,
        }
    }

    /// Apply one lifecycle mode to one entry. Failures land in the
    /// returned status record, never in a raised error.
    pub async fn run(
        &self,
        ctx: &OpContext,
        entry: &CatalogEntry,
        mode: DeployMode,
    ) -> DeploymentStatus {
        let mut status = DeploymentStatus::init(&entry.service_name, &entry.region, &entry.product);
        info!(
            correlation_id = %ctx.correlation_id,
            service = %entry.service_name,
            ?mode,
            "running lifecycle mode"
        );

        match (&entry.cluster, mode) {
            (Some(cluster), _) => {
                self.scale_or_remove(cluster, entry, mode, &mut status).await;
            }
            (None, DeployMode::CleanupTg) => {
                self.drop_orphaned_target_group(entry, &mut status).await;
            }
            (None, _) => {
                status.app.fail("Cluster Not Defined");
            }
        }
        status
    }

    async fn scale_or_remove(
        &self,
        cluster: &str,
        entry: &CatalogEntry,
        mode: DeployMode,
        status: &mut DeploymentStatus,
    ) {
        let service = entry.qualified_service_name();
        status.app.cluster = cluster.to_string();
        status.app.service = service.clone();

        let live = match self.compute.describe_service(cluster, &service).await {
            Ok(Some(live)) => live,
            Ok(None) => {
                status.app.fail(format!("{} Not Found", service));
                return;
            }
            Err(err) => {
                error!(%err, %service, "could not describe service");
                status.app.fail(err.to_string());
                return;
            }
        };

        let count = if mode == DeployMode::Start { 1 } else { 0 };
        let update = ServiceUpdate::preserving(&live, live.task_definition.clone(), count);
        match self.compute.update_service(update).await {
            Ok(_) => {
                status.app.outcome = Some(Verdict::Success);
                status.app.status = "Success".into();
                status.app.state = format!("Desired count set to {}", count);
            }
            Err(err) => {
                error!(%err, %service, "scaling failed");
                status.app.fail(err.to_string());
                return;
            }
        }

        if mode == DeployMode::Cleanup {
            if let Err(err) = self.remove_service_routing(&live).await {
                error!(%err, %service, "target group teardown failed");
                status.app.fail(err);
                return;
            }
            if let Err(err) = self.compute.delete_service(cluster, &service).await {
                error!(%err, %service, "service deletion failed");
                status.app.fail(err.to_string());
            }
        }
    }

    /// Drop the listener mapping and target group behind a live
    /// service's first load-balancer binding.
    async fn remove_service_routing(&self, live: &ServiceDescription) -> Result<(), String> {
        let binding = match live.load_balancers.first() {
            Some(binding) => binding,
            None => {
                info!(service = %live.service_name, "no target group bound to service");
                return Ok(());
            }
        };
        let group = self
            .network
            .describe_target_group_by_arn(&binding.target_group_arn)
            .await
            .map_err(|e| e.to_string())?;
        match group.as_ref().and_then(|g| g.load_balancer_arns.first()) {
            Some(balancer) => {
                info!(%balancer, port = binding.container_port, "dropping listener mapping");
                self.allocator
                    .drop_listener_mapping(balancer, binding.container_port)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            None => info!("no load balancer mapped to target group"),
        }
        self.network
            .delete_target_group(&binding.target_group_arn)
            .await
            .map_err(|e| e.to_string())
    }

    /// `cleanupTg` entries carry no cluster: the target group ARN and
    /// port come straight from the entry.
    async fn drop_orphaned_target_group(
        &self,
        entry: &CatalogEntry,
        status: &mut DeploymentStatus,
    ) {
        let (arn, port) = match (&entry.tg_arn, entry.port) {
            (Some(arn), Some(port)) => (arn.clone(), port),
            _ => {
                status.app.fail("Target Group Not Defined");
                return;
            }
        };

        let result: Result<(), String> = async {
            let group = self
                .network
                .describe_target_group_by_arn(&arn)
                .await
                .map_err(|e| e.to_string())?;
            match group.as_ref().and_then(|g| g.load_balancer_arns.first()) {
                Some(balancer) => {
                    info!(%balancer, port, "dropping listener mapping");
                    self.allocator
                        .drop_listener_mapping(balancer, port)
                        .await
                        .map_err(|e| e.to_string())?;
                }
                None => info!("no load balancer mapped to target group"),
            }
            self.network
                .delete_target_group(&arn)
                .await
                .map_err(|e| e.to_string())
        }
        .await;

        match result {
            Ok(()) => {
                status.app.outcome = Some(Verdict::Na);
                status.app.state = "NA".into();
                status.app.status = "Tg and Mapping Removed".into();
            }
            Err(err) => {
                error!(%err, %arn, "target group cleanup failed");
                status.app.fail(err);
            }
        }
    }
}
