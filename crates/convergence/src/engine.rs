//! The convergence engine: create-vs-update decision and execution.

use std::sync::Arc;
use std::time::Duration;

use flotilla_allocator::{AllocationRequest, ResourceAllocator};
use flotilla_cloud::compute::ComputePort;
use flotilla_cloud::error::{CloudError, CloudResult};
use flotilla_cloud::model::{ServiceDescription, ServiceUpdate, StackResource, TaskDefinition};
use flotilla_cloud::network::NetworkPort;
use flotilla_cloud::stack::StackPort;
use flotilla_types::context::OpContext;
use flotilla_types::resource::ResourceIdentifier;
use tracing::{error, info, warn};

use crate::desired::DesiredState;
use crate::diff;
use crate::error::{ConvergenceError, ConvergenceResult};

/// Prefix of stack names minted on the create path.
pub const STACK_NAME_PREFIX: &str = "ECS-Service-";

/// Default wait budget for stack creation to stabilize.
pub const DEFAULT_STABILIZATION_BUDGET: Duration = Duration::from_secs(900);

/// Stack statuses that count as "exists" during lookup.
const ACTIVE_STACK_STATUSES: &[&str] = &[
    "CREATE_COMPLETE",
    "UPDATE_COMPLETE",
    "UPDATE_ROLLBACK_COMPLETE",
    "ROLLBACK_COMPLETE",
];

/// Logical resource id that anchors stack lookup.
const SERVICE_RESOURCE_TYPE: &str = "ECSService";

/// A stack located through one of its resources.
#[derive(Debug, Clone)]
pub struct FoundStack {
    pub name: String,
    pub resources: Vec<StackResource>,
}

/// Which path convergence took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceAction {
    Created,
    Updated,
}

/// What happened, and what the monitor needs to pick up from here.
#[derive(Debug, Clone)]
pub struct ConvergenceOutcome {
    pub action: ConvergenceAction,
    pub cluster: String,
    pub service: String,
    /// PRIMARY deployment id seen before the update was applied; absent
    /// on the create path.
    pub initial_deployment_id: Option<String>,
}

pub struct StackConvergenceEngine {
    compute: Arc<dyn ComputePort>,
    network: Arc<dyn NetworkPort>,
    stack: Arc<dyn StackPort>,
    allocator: Arc<ResourceAllocator>,
    stabilization_budget: Duration,
}

impl StackConvergenceEngine {
    pub fn new(
        compute: Arc<dyn ComputePort>,
        network: Arc<dyn NetworkPort>,
        stack: Arc<dyn StackPort>,
        allocator: Arc<ResourceAllocator>,
    ) -> Self {
        Self {
            compute,
            network,
            stack,
            allocator,
            stabilization_budget: DEFAULT_STABILIZATION_BUDGET,
        }
    }

    pub fn with_stabilization_budget(mut self, budget: Duration) -> Self {
        self.stabilization_budget = budget;
        self
    }

    /// Locate an existing stack through a resource it owns: candidate
    /// names must contain the service, region, and cluster, and one of
    /// their resources must carry the expected logical id and physical
    /// id substring.
    pub async fn find_stack_by_resource(
        &self,
        identifier: &ResourceIdentifier,
    ) -> ConvergenceResult<Option<FoundStack>> {
        let stacks = self.stack.list_stacks(ACTIVE_STACK_STATUSES).await?;
        let service = identifier.service_name.to_lowercase();
        let region = identifier.region.to_lowercase();
        let cluster = identifier.cluster_name.to_lowercase();

        for summary in stacks {
            let name = summary.name.to_lowercase();
            if !(name.contains(&service) && name.contains(&region) && name.contains(&cluster)) {
                continue;
            }
            let resources = self.stack.list_stack_resources(&summary.name).await?;
            let matched = resources.iter().any(|resource| {
                resource.logical_id == identifier.service_type
                    && resource.physical_id.contains(&identifier.resource)
            });
            if matched {
                return Ok(Some(FoundStack {
                    name: summary.name,
                    resources,
                }));
            }
        }
        Ok(None)
    }

    fn identifier_for(desired: &DesiredState) -> ResourceIdentifier {
        ResourceIdentifier {
            service_type: SERVICE_RESOURCE_TYPE.to_string(),
            resource: desired.service_name.clone(),
            service_name: desired.service_name.clone(),
            region: desired.region.clone(),
            cluster_name: desired.cluster.clone(),
        }
    }

    /// Converge one service toward its desired state.
    ///
    /// A live, non-inactive service is updated in place; anything else
    /// goes down the create path, gated by `create_enabled`.
    pub async fn converge(
        &self,
        ctx: &OpContext,
        desired: &DesiredState,
        allowlist: &[String],
        create_enabled: bool,
    ) -> ConvergenceResult<ConvergenceOutcome> {
        let identifier = Self::identifier_for(desired);
        let found = self.find_stack_by_resource(&identifier).await?;
        let stack_name = match &found {
            Some(stack) => {
                info!(stack = %stack.name, "stack to be updated");
                stack.name.clone()
            }
            None => {
                let name = format!("{}{}-{}", STACK_NAME_PREFIX, desired.service_name, desired.cluster);
                info!(stack = %name, "stack to be created");
                name
            }
        };

        let live = self
            .compute
            .describe_service(&desired.cluster, &desired.service_name)
            .await?;

        match live {
            Some(service) if !service.is_inactive() => {
                info!(service = %desired.service_name, "service already available, updating");
                let initial_deployment_id =
                    service.primary_deployment().map(|d| d.id.clone());
                self.update(desired, &service).await?;
                Ok(ConvergenceOutcome {
                    action: ConvergenceAction::Updated,
                    cluster: desired.cluster.clone(),
                    service: desired.service_name.clone(),
                    initial_deployment_id,
                })
            }
            _ => {
                info!(service = %desired.service_name, "active service not found, creating");
                if !create_enabled {
                    return Err(ConvergenceError::CreationDisabled);
                }
                match self.create(ctx, desired, allowlist, &stack_name).await {
                    Ok(()) => Ok(ConvergenceOutcome {
                        action: ConvergenceAction::Created,
                        cluster: desired.cluster.clone(),
                        service: desired.service_name.clone(),
                        initial_deployment_id: None,
                    }),
                    Err(err) => {
                        error!(%err, stack = %stack_name, "create failed, rolling back stack");
                        if let Err(delete_err) = self.stack.delete_stack(&stack_name).await {
                            warn!(%delete_err, "stack rollback delete failed");
                        }
                        match err {
                            ConvergenceError::Cloud(CloudError::WaitTimeout { .. }) => {
                                Err(ConvergenceError::CreateTimeout)
                            }
                            ConvergenceError::ClusterUnavailable(cluster) => {
                                Err(ConvergenceError::ClusterUnavailable(cluster))
                            }
                            other => Err(ConvergenceError::StackOperation(other.to_string())),
                        }
                    }
                }
            }
        }
    }

    async fn create(
        &self,
        ctx: &OpContext,
        desired: &DesiredState,
        allowlist: &[String],
        stack_name: &str,
    ) -> ConvergenceResult<()> {
        let vpcs = self.compute.cluster_vpcs(&desired.cluster).await?;
        let vpc = vpcs
            .first()
            .cloned()
            .ok_or_else(|| ConvergenceError::ClusterUnavailable(desired.cluster.clone()))?;

        let request = AllocationRequest {
            product: &desired.product,
            region: &desired.region,
            port: desired.target_group.port,
            allowlist,
        };
        let selection = self.allocator.allocate(ctx, &request).await?;

        let mut state = desired.clone().with_selection(&selection);
        state.target_group.vpc_id = Some(vpc);

        let template = state
            .to_template()
            .map_err(|e| ConvergenceError::StackOperation(e.to_string()))?;

        // The stack can outlive its service, e.g. after a cleanup entry
        // deleted the service but left the stack behind. Update in place
        // then, creating on a taken name would fail outright.
        if self.stack.stack_exists(stack_name).await? {
            info!(stack = stack_name, "stack already exists, updating in place");
            self.stack
                .update_stack(stack_name, template, self.stabilization_budget)
                .await?;
            info!(stack = stack_name, "stack updated");
        } else {
            if let Some(group) = desired.log_group() {
                self.stack.ensure_log_group(&group).await?;
            }
            self.stack
                .create_stack(stack_name, template, self.stabilization_budget)
                .await?;
            info!(stack = stack_name, "stack created");
        }
        Ok(())
    }

    async fn update(
        &self,
        desired: &DesiredState,
        service: &ServiceDescription,
    ) -> ConvergenceResult<()> {
        let live_td = self
            .compute
            .describe_task_definition(&service.task_definition)
            .await?;
        let desired_td = self.apply_desired(&live_td, desired, service).await?;

        let changed = diff::task_definition_changed(&live_td, &desired_td)
            .map_err(|e| ConvergenceError::StackOperation(e.to_string()))?;
        let task_definition = if changed {
            let registered = self.compute.register_task_definition(desired_td).await?;
            registered.arn.ok_or_else(|| {
                CloudError::Api("registered task definition carries no arn".to_string())
            })?
        } else {
            info!("no change in task definition, reusing current revision");
            live_td
                .arn
                .clone()
                .unwrap_or_else(|| service.task_definition.clone())
        };

        let desired_count = match desired.desired_count {
            Some(count) => count,
            None => {
                warn!("instance count unset in desired state, keeping live count");
                service.desired_count
            }
        };

        let mut update = ServiceUpdate::preserving(service, task_definition, desired_count);

        // Enable service connect on update only when the live primary
        // deployment does not already run with it.
        if let Some(sc) = &desired.service_connect {
            let live_enabled = service
                .primary_deployment()
                .and_then(|d| d.service_connect.as_ref())
                .map(|c| c.enabled)
                .unwrap_or(false);
            if !live_enabled {
                info!("enabling service connect");
                update.service_connect = Some(sc.clone());
            }
        }

        self.compute.update_service(update).await?;
        Ok(())
    }

    /// Merge declared-mutable fields of the desired state into a copy of
    /// the live task definition.
    async fn apply_desired(
        &self,
        live: &TaskDefinition,
        desired: &DesiredState,
        service: &ServiceDescription,
    ) -> CloudResult<TaskDefinition> {
        let mut td = live.clone();
        let desired_container = match desired.task.containers.first() {
            Some(container) => container,
            None => return Ok(td),
        };

        if let Some(container) = td.containers.first_mut() {
            container.image = desired_container.image.clone();
            container.memory = desired_container.memory;
            container.memory_reservation = desired_container.memory_reservation;
            container.environment_files = desired_container.environment_files.clone();
            container.environment.clear();
            container.secrets = desired_container.secrets.clone();
        }

        // Enabling service connect over a task without a network mode
        // falls back to bridge and names the port mapping.
        if desired.service_connect.is_some() && td.network_mode.is_none() {
            info!("service connect requested with no network mode, using bridge");
            td.network_mode = Some("bridge".to_string());
            if let Some(container) = td.containers.first_mut() {
                if let Some(mapping) = container.port_mappings.first_mut() {
                    if mapping.name.is_none() {
                        mapping.name = desired_container
                            .port_mappings
                            .first()
                            .and_then(|m| m.name.clone());
                    }
                }
            }
        }

        if !desired_container.mount_points.is_empty() && !desired.task.volumes.is_empty() {
            td.volumes = desired.task.volumes.clone();
            if let Some(container) = td.containers.first_mut() {
                container.mount_points = desired_container.mount_points.clone();
            }
        }

        self.apply_health_check(&mut td, desired, service).await?;
        Ok(td)
    }

    /// A changed health probe is applied only when the URL is sane and
    /// the running container port still matches the requested one; the
    /// target group's probe path follows along when the service carries
    /// a binding.
    async fn apply_health_check(
        &self,
        td: &mut TaskDefinition,
        desired: &DesiredState,
        service: &ServiceDescription,
    ) -> CloudResult<()> {
        let desired_probe = match desired.health_probe_url() {
            Some(url) => url.to_string(),
            None => return Ok(()),
        };
        let current_probe = td
            .containers
            .first()
            .and_then(|c| c.health_check.as_ref())
            .and_then(|hc| hc.command.get(1))
            .cloned();
        if current_probe.as_deref() == Some(desired_probe.as_str()) {
            return Ok(());
        }
        info!("change in health check path");

        if desired_probe.is_empty()
            || desired_probe.contains("undefined")
            || desired_probe.contains("null")
        {
            error!("health url provided is invalid");
            return Ok(());
        }

        let running_port = td
            .containers
            .first()
            .and_then(|c| c.port_mappings.first())
            .map(|m| m.container_port);
        if running_port != Some(desired.target_group.port) {
            warn!("port change requested, keeping current health check");
            return Ok(());
        }

        if let (Some(container), Some(desired_container)) =
            (td.containers.first_mut(), desired.task.containers.first())
        {
            container.health_check = desired_container.health_check.clone();
        }
        if let Some(binding) = service.load_balancers.first() {
            self.network
                .modify_health_check_path(
                    &binding.target_group_arn,
                    &desired.target_group.health_check_path,
                )
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_cloud::model::{
        DeploymentState, LoadBalancer, LoadBalancerBinding, TargetGroup, LB_KIND_APPLICATION,
    };
    use flotilla_cloud::simulated::CreateBehavior;
    use flotilla_cloud::SimulatedCloud;
    use flotilla_config::metadata::{ClusterMetadata, DeploymentMetadata};
    use flotilla_config::spec::ServiceSpecSet;
    use flotilla_types::catalog::CatalogEntry;
    use std::collections::HashMap;

    fn entry() -> CatalogEntry {
        serde_yaml::from_str(
            "serviceName: billing\nregion: EU1\nproduct: CAPS\nimage: repo/billing:1.2.3\nconfigbucket: cfg\nreleaseIdentifier: r42\nexecutionOrder: 1\n",
        )
        .unwrap()
    }

    fn specs() -> ServiceSpecSet {
        ServiceSpecSet {
            common_app: serde_yaml::from_str(
                "variables:\n  APP_PORT: 8443\n  APP_CONTEXT_PATH: /caps\n  HEALTH_CHECK_PATH: /actuator/health\n",
            )
            .unwrap(),
            common_infra: serde_yaml::from_str("clusterName: caps\ninstanceCount: 2\n").unwrap(),
            ..Default::default()
        }
    }

    fn desired() -> DesiredState {
        DesiredState::assemble(
            &entry(),
            &specs(),
            &DeploymentMetadata::default(),
            &ClusterMetadata::default(),
        )
        .unwrap()
    }

    fn live_service(task_definition: &str) -> ServiceDescription {
        ServiceDescription {
            cluster: "caps-eu1".into(),
            service_name: "billing-eu1".into(),
            status: "ACTIVE".into(),
            desired_count: 2,
            running_count: 2,
            pending_count: 0,
            task_definition: task_definition.into(),
            deployments: vec![DeploymentState {
                id: "ecs-svc/1700000000123".into(),
                status: "PRIMARY".into(),
                task_definition: task_definition.into(),
                desired_count: 2,
                running_count: 2,
                pending_count: 0,
                failed_tasks: 0,
                created_at: None,
                updated_at: None,
                service_connect: None,
            }],
            events: vec![],
            load_balancers: vec![],
            network_configuration: Some(serde_json::json!({ "subnets": ["s-1"] })),
            deployment_configuration: None,
            deployment_controller: None,
            placement_strategy: None,
            placement_constraints: None,
            scheduling_strategy: Some("REPLICA".into()),
            service_registries: None,
            health_check_grace_period_seconds: Some(30),
        }
    }

    fn live_task_definition(desired: &DesiredState, arn: &str) -> TaskDefinition {
        let mut td = desired.task.clone();
        td.arn = Some(arn.into());
        td.revision = Some(1);
        td.registered_at = Some(chrono::Utc::now());
        td
    }

    fn engine(cloud: &Arc<SimulatedCloud>) -> StackConvergenceEngine {
        StackConvergenceEngine::new(
            cloud.clone(),
            cloud.clone(),
            cloud.clone(),
            Arc::new(ResourceAllocator::new(cloud.clone())),
        )
    }

    fn seed_balancer(cloud: &SimulatedCloud) {
        cloud.add_load_balancer(LoadBalancer {
            arn: "arn:lb:loadbalancer/app/alb-caps-eu1-01/abc".into(),
            name: "alb-caps-eu1-01".into(),
            kind: LB_KIND_APPLICATION.into(),
            tags: HashMap::from([
                ("Environment".into(), "EU1".into()),
                ("Product".into(), "COMMON".into()),
            ]),
        });
    }

    #[tokio::test]
    async fn matching_task_definition_skips_registration() {
        let cloud = Arc::new(SimulatedCloud::new());
        let desired = desired();
        let arn = "arn:sim:task-definition/billing-eu1:1";
        cloud.put_task_definition(live_task_definition(&desired, arn));
        let mut service = live_service(arn);
        service.cluster = desired.cluster.clone();
        cloud.put_service(service);

        let outcome = engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired, &[], false)
            .await
            .unwrap();
        assert_eq!(outcome.action, ConvergenceAction::Updated);
        assert_eq!(
            outcome.initial_deployment_id.as_deref(),
            Some("ecs-svc/1700000000123")
        );
        assert_eq!(cloud.registered_definition_count(), 0);
        assert_eq!(cloud.applied_updates()[0].task_definition, arn);
    }

    #[tokio::test]
    async fn image_change_registers_and_preserves_live_settings() {
        let cloud = Arc::new(SimulatedCloud::new());
        let desired = desired();
        let arn = "arn:sim:task-definition/billing-eu1:1";
        let mut live_td = live_task_definition(&desired, arn);
        live_td.containers[0].image = "repo/billing:1.2.2".into();
        cloud.put_task_definition(live_td);
        let mut service = live_service(arn);
        service.cluster = desired.cluster.clone();
        cloud.put_service(service);

        engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired, &[], false)
            .await
            .unwrap();

        assert_eq!(cloud.registered_definition_count(), 1);
        let update = &cloud.applied_updates()[0];
        assert!(update.force_new_deployment);
        assert_eq!(update.desired_count, 2);
        assert_eq!(
            update.network_configuration,
            Some(serde_json::json!({ "subnets": ["s-1"] }))
        );
        assert_eq!(update.scheduling_strategy.as_deref(), Some("REPLICA"));
        assert_ne!(update.task_definition, arn);
    }

    #[tokio::test]
    async fn health_path_change_updates_target_group_when_port_matches() {
        let cloud = Arc::new(SimulatedCloud::new());
        let desired = desired();
        let arn = "arn:sim:task-definition/billing-eu1:1";
        let mut live_td = live_task_definition(&desired, arn);
        live_td.containers[0].health_check = Some(flotilla_cloud::model::HealthCheckSpec {
            command: vec![
                "CMD-SHELL".into(),
                "curl -f http://localhost:8443/old/health || exit 1".into(),
            ],
        });
        cloud.put_task_definition(live_td);
        cloud.add_target_group(TargetGroup {
            arn: "arn:tg/old".into(),
            name: "tgp-ecs-CAPS-eu1-8443".into(),
            port: 8443,
            health_check_path: "/old/health".into(),
            load_balancer_arns: vec![],
            vpc_id: None,
        });
        let mut service = live_service(arn);
        service.cluster = desired.cluster.clone();
        service.load_balancers = vec![LoadBalancerBinding {
            target_group_arn: "arn:tg/old".into(),
            container_name: "billing-eu1".into(),
            container_port: 8443,
        }];
        cloud.put_service(service);

        engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired, &[], false)
            .await
            .unwrap();

        let tg = cloud
            .describe_target_group("tgp-ecs-CAPS-eu1-8443")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tg.health_check_path, "/caps/actuator/health");
    }

    #[tokio::test]
    async fn create_disabled_is_rejected_before_any_side_effect() {
        let cloud = Arc::new(SimulatedCloud::new());
        let err = engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired(), &[], false)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergenceError::CreationDisabled));
        assert!(cloud.created_log_groups().is_empty());
    }

    #[tokio::test]
    async fn create_path_builds_stack_with_allocation() {
        let cloud = Arc::new(SimulatedCloud::new());
        seed_balancer(&cloud);
        let desired = desired();
        cloud.set_cluster_vpcs(&desired.cluster, vec!["vpc-1".into()]);

        let outcome = engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired, &[], true)
            .await
            .unwrap();
        assert_eq!(outcome.action, ConvergenceAction::Created);
        assert!(cloud.has_stack("ECS-Service-billing-eu1-caps-eu1"));
        assert_eq!(cloud.created_log_groups(), vec!["ecs/billing-eu1"]);
    }

    #[tokio::test]
    async fn surviving_stack_without_service_is_updated_not_recreated() {
        let cloud = Arc::new(SimulatedCloud::new());
        seed_balancer(&cloud);
        let desired = desired();
        cloud.set_cluster_vpcs(&desired.cluster, vec!["vpc-1".into()]);
        // A cleanup entry deleted the service but the stack is still there.
        cloud.add_stack(
            "ECS-Service-billing-eu1-caps-eu1",
            "CREATE_COMPLETE",
            vec![StackResource {
                logical_id: "ECSService".into(),
                physical_id: "service/caps-eu1/billing-eu1".into(),
            }],
        );

        let outcome = engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired, &[], true)
            .await
            .unwrap();
        assert_eq!(outcome.action, ConvergenceAction::Created);
        assert_eq!(
            cloud.stack_status("ECS-Service-billing-eu1-caps-eu1").as_deref(),
            Some("UPDATE_COMPLETE")
        );
        assert!(cloud.deleted_stacks().is_empty());
        assert!(cloud.created_log_groups().is_empty());
    }

    #[tokio::test]
    async fn create_without_cluster_instances_is_configuration_error() {
        let cloud = Arc::new(SimulatedCloud::new());
        seed_balancer(&cloud);
        let err = engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired(), &[], true)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergenceError::ClusterUnavailable(_)));
    }

    #[tokio::test]
    async fn create_failure_rolls_back_partial_stack() {
        let cloud = Arc::new(SimulatedCloud::new());
        seed_balancer(&cloud);
        let desired = desired();
        cloud.set_cluster_vpcs(&desired.cluster, vec!["vpc-1".into()]);
        cloud.set_create_behavior(CreateBehavior::Fail("resource limit".into()));

        let err = engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired, &[], true)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergenceError::StackOperation(_)));
        assert_eq!(
            cloud.deleted_stacks(),
            vec!["ECS-Service-billing-eu1-caps-eu1"]
        );
    }

    #[tokio::test]
    async fn create_wait_budget_exceeded_is_timeout() {
        let cloud = Arc::new(SimulatedCloud::new());
        seed_balancer(&cloud);
        let desired = desired();
        cloud.set_cluster_vpcs(&desired.cluster, vec!["vpc-1".into()]);
        cloud.set_create_behavior(CreateBehavior::ExceedWait);

        let err = engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired, &[], true)
            .await
            .unwrap_err();
        assert!(matches!(err, ConvergenceError::CreateTimeout));
        assert_eq!(cloud.deleted_stacks().len(), 1);
    }

    #[tokio::test]
    async fn port_conflict_anywhere_blocks_creation() {
        let cloud = Arc::new(SimulatedCloud::new());
        seed_balancer(&cloud);
        cloud.add_listener(flotilla_cloud::model::Listener {
            arn: "arn:listener/8443".into(),
            load_balancer_arn: "arn:lb:loadbalancer/app/alb-caps-eu1-01/abc".into(),
            port: 8443,
        });
        let desired = desired();
        cloud.set_cluster_vpcs(&desired.cluster, vec!["vpc-1".into()]);

        let err = engine(&cloud)
            .converge(&OpContext::new_root("run"), &desired, &[], true)
            .await
            .unwrap_err();
        match err {
            ConvergenceError::StackOperation(message) => {
                assert!(message.contains("already in use"), "{}", message);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!cloud.has_stack("ECS-Service-billing-eu1-caps-eu1"));
    }

    #[tokio::test]
    async fn stack_lookup_needs_resource_confirmation() {
        let cloud = Arc::new(SimulatedCloud::new());
        // Name matches but the resource does not confirm.
        cloud.add_stack(
            "ECS-Service-billing-eu1-caps-eu1-old",
            "CREATE_COMPLETE",
            vec![StackResource {
                logical_id: "ECSService".into(),
                physical_id: "other-service-eu1".into(),
            }],
        );
        cloud.add_stack(
            "custom-billing-eu1-caps-eu1",
            "UPDATE_COMPLETE",
            vec![StackResource {
                logical_id: "ECSService".into(),
                physical_id: "service/caps-eu1/billing-eu1".into(),
            }],
        );
        // Right resource, but the stack is mid-operation.
        cloud.add_stack(
            "ECS-Service-billing-eu1-caps-eu1-new",
            "CREATE_IN_PROGRESS",
            vec![StackResource {
                logical_id: "ECSService".into(),
                physical_id: "service/caps-eu1/billing-eu1".into(),
            }],
        );

        let identifier = ResourceIdentifier {
            service_type: "ECSService".into(),
            resource: "billing-eu1".into(),
            service_name: "billing-eu1".into(),
            region: "EU1".into(),
            cluster_name: "caps-eu1".into(),
        };
        let found = engine(&cloud)
            .find_stack_by_resource(&identifier)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "custom-billing-eu1-caps-eu1");
    }
}
