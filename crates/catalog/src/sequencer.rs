//! Strictly sequential processing of one catalog.
//!
//! Entries run in ascending `executionOrder`, one at a time: allocation
//! reads a fresh inventory of shared load balancers per entry, so
//! concurrent entries would race on capacity and port-conflict checks.
//! Every failure is captured in the entry's own status record; one bad
//! entry never aborts its siblings.

use std::sync::Arc;

use flotilla_allocator::ResourceAllocator;
use flotilla_cloud::{
    ComputePort, ConfigStorePort, DatabaseDeployer, NetworkPort, StackPort,
};
use flotilla_config::SpecResolver;
use flotilla_convergence::{ConvergenceAction, DesiredState, StackConvergenceEngine};
use flotilla_monitor::{DeploymentMonitor, MonitorSettings};
use flotilla_types::{
    AppStage, CatalogDocument, CatalogEntry, DbComponentStatus, DeploymentStatus, OpContext,
    Verdict,
};
use tracing::{debug, info};

use crate::aggregate::StatusAggregator;
use crate::cleanup::CleanupRunner;

pub struct CatalogSequencer {
    resolver: SpecResolver,
    database: Arc<dyn DatabaseDeployer>,
    engine: StackConvergenceEngine,
    monitor: DeploymentMonitor,
    cleanup: CleanupRunner,
}

impl CatalogSequencer {
    pub fn new(
        compute: Arc<dyn ComputePort>,
        network: Arc<dyn NetworkPort>,
        stack: Arc<dyn StackPort>,
        store: Arc<dyn ConfigStorePort>,
        database: Arc<dyn DatabaseDeployer>,
    ) -> Self {
        let allocator = Arc::new(ResourceAllocator::new(network.clone()));
        Self {
            resolver: SpecResolver::new(store),
            database,
            engine: StackConvergenceEngine::new(
                compute.clone(),
                network.clone(),
                stack,
                allocator.clone(),
            ),
            monitor: DeploymentMonitor::new(compute.clone()),
            cleanup: CleanupRunner::new(compute, network, allocator),
        }
    }

    pub fn with_monitor_settings(mut self, settings: MonitorSettings) -> Self {
        self.monitor = self.monitor.with_settings(settings);
        self
    }

    /// Process one parsed catalog to a finalized status list. Never
    /// raises; the list carries one record per entry in visit order.
    pub async fn run(
        &self,
        ctx: &OpContext,
        document: &CatalogDocument,
        customer: &str,
        tenant: &str,
    ) -> Vec<DeploymentStatus> {
        let entries = document.sorted_entries();
        let mode = document.header().and_then(|h| h.mode);
        let mut statuses = Vec::with_capacity(entries.len());

        match mode {
            Some(mode) => {
                info!(?mode, entries = entries.len(), "catalog in lifecycle mode");
                for entry in &entries {
                    statuses.push(self.cleanup.run(ctx, entry, mode).await);
                }
            }
            None => {
                info!(entries = entries.len(), "catalog in converge mode");
                for entry in &entries {
                    statuses.push(self.deploy_entry(ctx, entry, customer, tenant).await);
                }
            }
        }

        self.run_health_checks(ctx, &mut statuses).await;
        StatusAggregator::finalize(&mut statuses);
        statuses
    }

    async fn deploy_entry(
        &self,
        ctx: &OpContext,
        entry: &CatalogEntry,
        customer: &str,
        tenant: &str,
    ) -> DeploymentStatus {
        info!(
            correlation_id = %ctx.correlation_id,
            service = %entry.service_name,
            region = %entry.region,
            product = %entry.product,
            "processing catalog entry"
        );
        let mut status = DeploymentStatus::init(&entry.service_name, &entry.region, &entry.product);
        self.database_stage(ctx, entry, customer, tenant, &mut status).await;
        self.application_stage(ctx, entry, customer, tenant, &mut status).await;
        status
    }

    async fn database_stage(
        &self,
        ctx: &OpContext,
        entry: &CatalogEntry,
        customer: &str,
        tenant: &str,
        status: &mut DeploymentStatus,
    ) {
        match &entry.dacpac {
            Some(dacpac) => {
                info!(file = %dacpac.file, "schema package found");
                status.db = self.database.deploy(ctx, entry, customer, tenant).await;
            }
            None => {
                info!("no schema package, skipping database stage");
                status.db = vec![DbComponentStatus::skipped_not_found()];
            }
        }
    }

    async fn application_stage(
        &self,
        ctx: &OpContext,
        entry: &CatalogEntry,
        customer: &str,
        tenant: &str,
        status: &mut DeploymentStatus,
    ) {
        if status.db_failed() {
            info!("skipping app stage after failed database stage");
            status.app.skip("Skipped for Failed DB deployment");
            return;
        }
        if entry.image.is_none() {
            info!("no image in entry, skipping app stage");
            status.app.skip("Skipped image not found");
            return;
        }

        if let Err(reason) = self
            .converge_entry(ctx, entry, customer, tenant, &mut status.app)
            .await
        {
            status.app.fail(reason);
        }
    }

    async fn converge_entry(
        &self,
        ctx: &OpContext,
        entry: &CatalogEntry,
        customer: &str,
        tenant: &str,
        app: &mut AppStage,
    ) -> Result<(), String> {
        let deployment = self
            .resolver
            .deployment_metadata(customer, tenant)
            .await
            .map_err(|e| e.to_string())?;
        let clusters = self
            .resolver
            .cluster_metadata(customer, tenant)
            .await
            .map_err(|e| e.to_string())?;
        let specs = self
            .resolver
            .service_specs(entry)
            .await
            .map_err(|e| e.to_string())?;

        let desired = DesiredState::assemble(entry, &specs, &deployment, &clusters)
            .map_err(|e| e.to_string())?;
        app.cluster = desired.cluster.clone();
        app.service = desired.service_name.clone();

        let allowlist = clusters.alb_allowlist(&entry.region, &entry.product);
        let create_enabled = deployment.create_enabled(&entry.product, &entry.region);

        let outcome = self
            .engine
            .converge(ctx, &desired, &allowlist, create_enabled)
            .await
            .map_err(|e| e.to_string())?;

        app.outcome = Some(Verdict::Success);
        match outcome.action {
            ConvergenceAction::Created => {
                app.status = "Service Created".into();
                app.state = "Service Created".into();
                app.is_update = false;
            }
            ConvergenceAction::Updated => {
                app.status = "Success".into();
                app.state = "Service Updated".into();
                app.is_update = true;
                app.initial_deployment_id = outcome.initial_deployment_id;
            }
        }
        Ok(())
    }

    /// Monitor every entry whose in-place update succeeded. Created
    /// services and lifecycle entries are not monitored.
    async fn run_health_checks(&self, ctx: &OpContext, statuses: &mut [DeploymentStatus]) {
        for status in statuses.iter_mut() {
            let app = &mut status.app;
            let initial = match &app.initial_deployment_id {
                Some(id) if app.is_update && app.outcome == Some(Verdict::Success) => id.clone(),
                _ => {
                    debug!(service = %app.service, "health check not applicable");
                    continue;
                }
            };
            let report = self
                .monitor
                .watch(ctx, &app.cluster, &app.service, &initial)
                .await;
            app.health = Some(report);
        }
    }
}
