//! Desired-state assembly.
//!
//! A [`DesiredState`] is the full declarative picture of one service:
//! the task definition to run, the target-group shape, and the
//! service-connect intent. It is assembled through a consuming builder,
//! so every step takes a value and hands back a new one; nothing shares
//! a mutable template.

use flotilla_cloud::model::{
    ContainerDefinition, EnvFileRef, HealthCheckSpec, LogConfiguration, MountPoint, PortMapping,
    SecretRef, ServiceConnectAlias, ServiceConnectConfig, ServiceConnectService, TaskDefinition,
    Volume,
};
use flotilla_config::metadata::{ClusterMetadata, DeploymentMetadata};
use flotilla_config::spec::ServiceSpecSet;
use flotilla_config::ConfigError;
use flotilla_types::catalog::CatalogEntry;
use flotilla_types::resource::TargetGroupSelection;
use serde_json::{json, Value};
use tracing::{info, warn};

/// Target-group shape requested for the service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredTargetGroup {
    pub name: String,
    pub port: u16,
    pub health_check_path: String,
    /// Filled in on the create path once the cluster's VPC is known.
    pub vpc_id: Option<String>,
    /// Filled in on the create path from the allocator's selection.
    pub load_balancer_arn: Option<String>,
}

/// Everything convergence needs to know about where a service should
/// end up.
#[derive(Debug, Clone)]
pub struct DesiredState {
    /// Qualified service name, `{name}-{region_lower}`.
    pub service_name: String,
    pub cluster: String,
    pub region: String,
    pub product: String,
    /// Unset means "keep the live count" on update.
    pub desired_count: Option<i64>,
    pub task: TaskDefinition,
    pub target_group: DesiredTargetGroup,
    pub service_connect: Option<ServiceConnectConfig>,
}

impl DesiredState {
    pub fn builder(
        service_name: impl Into<String>,
        cluster: impl Into<String>,
        region: impl Into<String>,
        product: impl Into<String>,
    ) -> DesiredStateBuilder {
        DesiredStateBuilder::new(service_name, cluster, region, product)
    }

    /// Name of the container's log group.
    pub fn log_group(&self) -> Option<String> {
        self.task
            .containers
            .first()
            .and_then(|c| c.log_configuration.as_ref())
            .and_then(|lc| lc.options.get("awslogs-group").cloned())
    }

    /// Container health-probe URL, by convention the second element of
    /// the health-check command.
    pub fn health_probe_url(&self) -> Option<&str> {
        self.task
            .containers
            .first()
            .and_then(|c| c.health_check.as_ref())
            .and_then(|hc| hc.command.get(1))
            .map(String::as_str)
    }

    /// Render the stack template submitted on the create path.
    pub fn to_template(&self) -> serde_json::Result<Value> {
        let container_name = self
            .task
            .containers
            .first()
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let mut resources = json!({
            "ECSService": {
                "Properties": {
                    "ServiceName": self.service_name,
                    "Cluster": self.cluster,
                    "DesiredCount": self.desired_count,
                    "LoadBalancers": [{
                        "ContainerName": container_name,
                        "ContainerPort": self.target_group.port,
                    }],
                }
            },
            "TaskDefinition": { "Properties": serde_json::to_value(&self.task)? },
            "ALBTargetGroup": {
                "Properties": {
                    "Name": self.target_group.name,
                    "Port": self.target_group.port,
                    "HealthCheckPath": self.target_group.health_check_path,
                    "VpcId": self.target_group.vpc_id,
                }
            },
            "ALBListener": {
                "Properties": {
                    "Port": self.target_group.port,
                    "LoadBalancerArn": self.target_group.load_balancer_arn,
                }
            },
        });
        if let Some(sc) = &self.service_connect {
            resources["ECSService"]["Properties"]["ServiceConnectConfiguration"] =
                serde_json::to_value(sc)?;
        }
        Ok(json!({ "Resources": resources }))
    }

    /// Inject the allocator's selection, returning the enriched state.
    pub fn with_selection(mut self, selection: &TargetGroupSelection) -> Self {
        self.target_group.load_balancer_arn = Some(selection.load_balancer_arn.clone());
        self.target_group.name = selection.target_group_name.clone();
        self
    }

    /// Assemble the desired state for one catalog entry from its spec
    /// documents and the platform metadata.
    pub fn assemble(
        entry: &CatalogEntry,
        specs: &ServiceSpecSet,
        deployment: &DeploymentMetadata,
        clusters: &ClusterMetadata,
    ) -> Result<DesiredState, ConfigError> {
        specs.require_variables()?;

        let region_lower = entry.region.to_lowercase();
        let base_name = match specs.service_name_override() {
            Some(name) => {
                warn!(
                    standard = %entry.service_name,
                    pinned = name,
                    "non-standard service name pinned by infra spec"
                );
                name.to_string()
            }
            None => entry.service_name.clone(),
        };
        let service_name = format!("{}-{}", base_name, region_lower);
        let container_name = format!("{}-{}", entry.service_name, region_lower);

        let cluster = deployment.resolve_cluster(
            specs.default_cluster(&entry.region)?,
            &entry.product,
            &entry.region,
            entry.service_line.as_deref(),
        );

        let port = specs.application_port()?;
        let image = entry
            .image
            .clone()
            .ok_or(ConfigError::MandatoryParametersMissing)?;

        let mut builder = DesiredState::builder(service_name, cluster, &entry.region, &entry.product)
            .container_name(&container_name)
            .image(image)
            .memory(specs.min_memory(), specs.max_memory())
            .port(port)
            .health_check(
                specs.health_check_uri(port),
                specs.health_check_path(),
            )
            .log_group(format!("ecs/{}", container_name), &region_lower)
            .mount_points(specs.mount_points());

        if let Some(count) = specs.instance_count() {
            builder = builder.desired_count(count);
        }
        if let Some(user) = specs.run_user() {
            builder = builder.run_user(user);
        }
        if let Some(role) = deployment.task_role(&entry.product) {
            builder = builder.task_role(role);
        }
        if let Some(role) = deployment.execution_role(&entry.product) {
            builder = builder.execution_role(role);
        }

        if let (Some(bucket), Some(release)) =
            (entry.config_bucket.as_deref(), entry.release_identifier.as_deref())
        {
            let env_base = format!(
                "{}/environments/{}/{}/{}",
                bucket, entry.product, entry.service_name, release
            );
            builder = builder.environment_files(vec![
                format!("arn:aws:s3:::{}/{}.{}.env", env_base, entry.service_name, region_lower),
                format!("arn:aws:s3:::{}/{}.common.env", env_base, entry.service_name),
            ]);
        }

        let bindings = specs.reference_bindings();
        let region_upper = entry.region.to_uppercase();
        let parameter_ns = deployment.parameter_namespace(&entry.product);
        let secret_ns = deployment.secret_namespace(&entry.product);
        let mut secrets: Vec<(String, String)> = bindings
            .secrets
            .iter()
            .map(|(name, reference)| {
                (
                    name.clone(),
                    format!("secret:/{}/{}/{}", secret_ns, region_upper, reference),
                )
            })
            .collect();
        secrets.extend(bindings.parameters.iter().map(|(name, reference)| {
            (
                name.clone(),
                format!("parameter:/{}/{}/{}", parameter_ns, region_upper, reference),
            )
        }));
        builder = builder.secrets(secrets);

        let namespace = clusters.service_connect_namespace(&entry.region, &entry.product);
        if let Some(namespace) = namespace {
            if specs.inter_service_communication() {
                info!(namespace, "enabling inter-service communication");
                builder = builder.service_connect(namespace);
            }
        }

        Ok(builder.build())
    }
}

/// Consuming builder for [`DesiredState`]; each step returns a new
/// value.
#[derive(Debug, Clone)]
pub struct DesiredStateBuilder {
    state: DesiredState,
}

impl DesiredStateBuilder {
    pub fn new(
        service_name: impl Into<String>,
        cluster: impl Into<String>,
        region: impl Into<String>,
        product: impl Into<String>,
    ) -> Self {
        let service_name = service_name.into();
        let region = region.into();
        let product = product.into();
        let family = service_name.to_lowercase();
        Self {
            state: DesiredState {
                service_name: service_name.clone(),
                cluster: cluster.into(),
                region,
                product,
                desired_count: None,
                task: TaskDefinition {
                    family,
                    containers: vec![ContainerDefinition {
                        name: service_name,
                        ..Default::default()
                    }],
                    ..Default::default()
                },
                target_group: DesiredTargetGroup::default(),
                service_connect: None,
            },
        }
    }

    fn container(mut self, f: impl FnOnce(&mut ContainerDefinition)) -> Self {
        if let Some(container) = self.state.task.containers.first_mut() {
            f(container);
        }
        self
    }

    pub fn container_name(self, name: &str) -> Self {
        let name = name.to_string();
        self.container(|c| c.name = name)
    }

    pub fn image(self, image: impl Into<String>) -> Self {
        let image = image.into();
        self.container(|c| c.image = image)
    }

    pub fn memory(self, reservation: i64, limit: i64) -> Self {
        self.container(|c| {
            c.memory_reservation = Some(reservation);
            c.memory = Some(limit);
        })
    }

    /// Publish the port; the mapping is named `{container}-{port}-tcp`.
    pub fn port(mut self, port: u16) -> Self {
        self.state.target_group.port = port;
        self.state.target_group.name = TargetGroupSelection::derive_name(
            &self.state.product,
            &self.state.region,
            port,
        );
        self.container(|c| {
            c.port_mappings = vec![PortMapping {
                container_port: port,
                name: Some(format!("{}-{}-tcp", c.name, port)),
            }];
        })
    }

    /// `probe_url` feeds the container command, `path` the target group.
    pub fn health_check(mut self, probe_url: String, path: String) -> Self {
        self.state.target_group.health_check_path = path;
        self.container(|c| {
            c.health_check = Some(HealthCheckSpec {
                command: vec![
                    "CMD-SHELL".to_string(),
                    format!("curl -f http://localhost:{} || exit 1", probe_url),
                ],
            });
        })
    }

    pub fn log_group(self, group: String, region: &str) -> Self {
        let region = region.to_string();
        self.container(|c| {
            c.log_configuration = Some(LogConfiguration {
                driver: Some("awslogs".to_string()),
                options: [
                    ("awslogs-group".to_string(), group),
                    ("awslogs-region".to_string(), region),
                ]
                .into_iter()
                .collect(),
            });
        })
    }

    pub fn run_user(self, user: &str) -> Self {
        let user = user.to_string();
        self.container(|c| c.user = Some(user))
    }

    pub fn desired_count(mut self, count: i64) -> Self {
        self.state.desired_count = Some(count);
        self
    }

    pub fn task_role(mut self, role: &str) -> Self {
        self.state.task.task_role_arn = Some(role.to_string());
        self
    }

    pub fn execution_role(mut self, role: &str) -> Self {
        self.state.task.execution_role_arn = Some(role.to_string());
        self
    }

    pub fn environment_files(self, files: Vec<String>) -> Self {
        self.container(|c| {
            c.environment_files = files
                .into_iter()
                .map(|value| EnvFileRef {
                    value,
                    kind: "s3".to_string(),
                })
                .collect();
        })
    }

    pub fn secrets(self, secrets: Vec<(String, String)>) -> Self {
        self.container(|c| {
            c.secrets = secrets
                .into_iter()
                .map(|(name, value_from)| SecretRef { name, value_from })
                .collect();
        })
    }

    /// Volumes are synthesized as `fxsmount{idx}` host mounts.
    pub fn mount_points(mut self, points: Vec<(String, String)>) -> Self {
        let mut volumes = Vec::new();
        let mut mounts = Vec::new();
        for (index, (source, container_path)) in points.into_iter().enumerate() {
            let volume_name = format!("fxsmount{}", index);
            volumes.push(Volume {
                name: volume_name.clone(),
                host_source_path: source,
            });
            mounts.push(MountPoint {
                source_volume: volume_name,
                container_path,
            });
        }
        self.state.task.volumes = volumes;
        self.container(|c| c.mount_points = mounts)
    }

    /// Opt in to service connect; forces bridge networking on the task.
    pub fn service_connect(mut self, namespace: &str) -> Self {
        let (container_name, port) = self
            .state
            .task
            .containers
            .first()
            .map(|c| {
                (
                    c.name.clone(),
                    c.port_mappings.first().map(|p| p.container_port).unwrap_or(0),
                )
            })
            .unwrap_or_default();
        self.state.service_connect = Some(ServiceConnectConfig {
            enabled: true,
            namespace: namespace.to_string(),
            services: vec![ServiceConnectService {
                port_name: format!("{}-{}-tcp", container_name, port),
                discovery_name: container_name.clone(),
                client_aliases: vec![ServiceConnectAlias {
                    port,
                    dns_name: container_name,
                }],
            }],
        });
        self.state.task.network_mode = Some("bridge".to_string());
        self
    }

    pub fn build(self) -> DesiredState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry() -> CatalogEntry {
        serde_yaml::from_str(
            "serviceName: billing\nregion: EU1\nproduct: CAPS\nimage: repo/billing:1.2.3\nconfigbucket: cfg\nreleaseIdentifier: r42\nexecutionOrder: 1\n",
        )
        .unwrap()
    }

    fn specs() -> ServiceSpecSet {
        ServiceSpecSet {
            common_app: serde_yaml::from_str(
                "variables:\n  APP_PORT: 8443\n  APP_CONTEXT_PATH: /caps\n  HEALTH_CHECK_PATH: /actuator/health\n  DB_PASS:\n    reference: db/pass\n    type: secret\n",
            )
            .unwrap(),
            common_infra: serde_yaml::from_str(
                "clusterName: caps-shared\ninstanceCount: 2\nminMemory: 512\nmaxMemory: 1024\n",
            )
            .unwrap(),
            ..Default::default()
        }
    }

    #[test]
    fn assembles_names_ports_and_probe() {
        let state = DesiredState::assemble(
            &entry(),
            &specs(),
            &DeploymentMetadata::default(),
            &ClusterMetadata::default(),
        )
        .unwrap();

        assert_eq!(state.service_name, "billing-eu1");
        assert_eq!(state.cluster, "caps-shared-eu1");
        assert_eq!(state.desired_count, Some(2));
        assert_eq!(state.target_group.name, "tgp-ecs-CAPS-eu1-8443");
        assert_eq!(state.target_group.health_check_path, "/caps/actuator/health");
        assert_eq!(
            state.health_probe_url(),
            Some("curl -f http://localhost:8443/caps/actuator/health || exit 1")
        );
        assert_eq!(state.log_group().as_deref(), Some("ecs/billing-eu1"));

        let container = &state.task.containers[0];
        assert_eq!(container.image, "repo/billing:1.2.3");
        assert_eq!(container.memory, Some(1024));
        assert_eq!(container.memory_reservation, Some(512));
        assert_eq!(
            container.port_mappings[0].name.as_deref(),
            Some("billing-eu1-8443-tcp")
        );
        assert_eq!(container.secrets.len(), 1);
        assert!(container.secrets[0].value_from.contains("/CAPS/EU1/db/pass"));
        assert_eq!(container.environment_files.len(), 2);
    }

    #[test]
    fn service_connect_requires_namespace_and_opt_in() {
        let clusters: ClusterMetadata = serde_json::from_value(json!({
            "EU1": { "CAPS": { "serviceConnect": { "nameSpace": "caps-mesh" } } }
        }))
        .unwrap();

        // Namespace configured but service did not opt in.
        let state = DesiredState::assemble(
            &entry(),
            &specs(),
            &DeploymentMetadata::default(),
            &clusters,
        )
        .unwrap();
        assert!(state.service_connect.is_none());

        // Both present: connect enabled, bridge networking forced.
        let mut opted = specs();
        opted.common_infra.enable_inter_service_communication = Some(true);
        let state =
            DesiredState::assemble(&entry(), &opted, &DeploymentMetadata::default(), &clusters)
                .unwrap();
        let sc = state.service_connect.unwrap();
        assert_eq!(sc.namespace, "caps-mesh");
        assert_eq!(sc.services[0].port_name, "billing-eu1-8443-tcp");
        assert_eq!(state.task.network_mode.as_deref(), Some("bridge"));
    }

    #[test]
    fn missing_variables_is_mandatory_failure() {
        let bare = ServiceSpecSet {
            common_infra: specs().common_infra,
            ..Default::default()
        };
        let err = DesiredState::assemble(
            &entry(),
            &bare,
            &DeploymentMetadata::default(),
            &ClusterMetadata::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MandatoryParametersMissing));
    }

    #[test]
    fn template_carries_selection() {
        let state = DesiredState::assemble(
            &entry(),
            &specs(),
            &DeploymentMetadata::default(),
            &ClusterMetadata::default(),
        )
        .unwrap()
        .with_selection(&TargetGroupSelection {
            target_group_arn: None,
            listener_arn: None,
            load_balancer_arn: "arn:lb/app/alb-hps-eu1-01/abc".into(),
            port: 8443,
            target_group_name: "tgp-ecs-CAPS-eu1-8443".into(),
        });

        let template = state.to_template().unwrap();
        assert_eq!(
            template["Resources"]["ALBListener"]["Properties"]["LoadBalancerArn"],
            json!("arn:lb/app/alb-hps-eu1-01/abc")
        );
        assert_eq!(
            template["Resources"]["ECSService"]["Properties"]["ServiceName"],
            json!("billing-eu1")
        );
    }
}
