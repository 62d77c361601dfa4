//! Simulation fixtures.
//!
//! The CLI runs against the simulated infrastructure ports; a fixture
//! file seeds them with the load balancers, services, task definitions,
//! platform metadata parameters, and spec documents a run needs. Every
//! section is optional.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use flotilla_cloud::model::{
    Listener, LoadBalancer, ServiceDescription, StackResource, TargetGroup, Task, TaskDefinition,
};
use flotilla_cloud::{SimulatedCloud, SimulatedConfigStore};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Fixture {
    /// Hierarchical parameters, e.g. the deployment/cluster metadata.
    pub parameters: HashMap<String, serde_json::Value>,
    /// Spec documents keyed by bucket and object key.
    pub documents: Vec<DocumentSeed>,

    pub load_balancers: Vec<LoadBalancer>,
    pub listeners: Vec<Listener>,
    pub target_groups: Vec<TargetGroup>,
    pub services: Vec<ServiceDescription>,
    pub task_definitions: Vec<TaskDefinition>,
    pub tasks: Vec<TaskSeed>,
    pub cluster_vpcs: HashMap<String, Vec<String>>,
    pub stacks: Vec<StackSeed>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentSeed {
    pub bucket: String,
    pub key: String,
    pub body: serde_yaml::Value,
}

#[derive(Debug, Deserialize)]
pub struct TaskSeed {
    pub cluster: String,
    pub service: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
pub struct StackSeed {
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub resources: Vec<StackResource>,
}

impl Fixture {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing fixture {}", path.display()))
    }

    pub fn apply(&self, cloud: &SimulatedCloud, store: &SimulatedConfigStore) {
        for (name, value) in &self.parameters {
            store.put_parameter(name, value.clone());
        }
        for document in &self.documents {
            store.put_document(&document.bucket, &document.key, document.body.clone());
        }

        for lb in &self.load_balancers {
            cloud.add_load_balancer(lb.clone());
        }
        for listener in &self.listeners {
            cloud.add_listener(listener.clone());
        }
        for group in &self.target_groups {
            cloud.add_target_group(group.clone());
        }
        for service in &self.services {
            cloud.put_service(service.clone());
        }
        for definition in &self.task_definitions {
            cloud.put_task_definition(definition.clone());
        }
        for seed in &self.tasks {
            cloud.put_tasks(&seed.cluster, &seed.service, seed.tasks.clone());
        }
        for (cluster, vpcs) in &self.cluster_vpcs {
            cloud.set_cluster_vpcs(cluster, vpcs.clone());
        }
        for stack in &self.stacks {
            cloud.add_stack(&stack.name, &stack.status, stack.resources.clone());
        }

        info!(
            parameters = self.parameters.len(),
            documents = self.documents.len(),
            load_balancers = self.load_balancers.len(),
            services = self.services.len(),
            "fixture applied"
        );
    }
}
