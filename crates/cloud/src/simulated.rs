//! Simulated infrastructure provider.
//!
//! One state bag implements the network, compute, and stack ports with
//! scripted behavior: tests seed load balancers, services, and stacks,
//! enqueue describe-snapshots for monitoring sessions, and configure the
//! create path to succeed, fail, or exceed its wait budget. Destructive
//! calls are recorded so tests can assert on them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use crate::compute::ComputePort;
use crate::error::{CloudError, CloudResult};
use crate::model::{
    Listener, LoadBalancer, ServiceDescription, ServiceUpdate, StackResource, StackSummary, Task,
    TargetGroup, TaskDefinition,
};
use crate::network::NetworkPort;
use crate::stack::StackPort;

/// How the simulated stack create path behaves.
#[derive(Debug, Clone)]
pub enum CreateBehavior {
    Succeed,
    /// Fail immediately with the given message, leaving a partial stack.
    Fail(String),
    /// Exceed the wait budget, leaving a partial stack.
    ExceedWait,
}

fn service_key(cluster: &str, service: &str) -> String {
    format!("{}/{}", cluster, service)
}

/// In-memory implementation of the infrastructure ports.
#[derive(Default)]
pub struct SimulatedCloud {
    load_balancers: Mutex<Vec<LoadBalancer>>,
    listeners: DashMap<String, Vec<Listener>>,
    target_groups: DashMap<String, TargetGroup>,

    services: DashMap<String, ServiceDescription>,
    service_scripts: DashMap<String, VecDeque<ServiceDescription>>,
    task_definitions: DashMap<String, TaskDefinition>,
    tasks: DashMap<String, Vec<Task>>,
    cluster_vpcs: DashMap<String, Vec<String>>,

    stacks: DashMap<String, (String, Vec<StackResource>)>,
    create_behavior: Mutex<Option<CreateBehavior>>,

    registered_definitions: AtomicUsize,
    applied_updates: Mutex<Vec<ServiceUpdate>>,
    deleted_services: Mutex<Vec<String>>,
    deleted_stacks: Mutex<Vec<String>>,
    deleted_target_groups: Mutex<Vec<String>>,
    deleted_listeners: Mutex<Vec<String>>,
    log_groups: Mutex<Vec<String>>,
}

impl SimulatedCloud {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Seeding ────────────────────────────────────────────────────────

    pub fn add_load_balancer(&self, lb: LoadBalancer) {
        self.load_balancers.lock().unwrap().push(lb);
    }

    pub fn add_listener(&self, listener: Listener) {
        self.listeners
            .entry(listener.load_balancer_arn.clone())
            .or_default()
            .push(listener);
    }

    pub fn add_target_group(&self, tg: TargetGroup) {
        self.target_groups.insert(tg.name.clone(), tg);
    }

    pub fn put_service(&self, service: ServiceDescription) {
        self.services
            .insert(service_key(&service.cluster, &service.service_name), service);
    }

    /// Enqueue describe-snapshots for one service; each describe pops the
    /// next snapshot, the last one staying sticky.
    pub fn script_service(&self, cluster: &str, service: &str, snapshots: Vec<ServiceDescription>) {
        self.service_scripts
            .insert(service_key(cluster, service), snapshots.into());
    }

    pub fn put_task_definition(&self, definition: TaskDefinition) {
        if let Some(arn) = definition.arn.clone() {
            self.task_definitions.insert(arn, definition);
        }
    }

    pub fn put_tasks(&self, cluster: &str, service: &str, tasks: Vec<Task>) {
        self.tasks.insert(service_key(cluster, service), tasks);
    }

    pub fn set_cluster_vpcs(&self, cluster: &str, vpcs: Vec<String>) {
        self.cluster_vpcs.insert(cluster.to_string(), vpcs);
    }

    pub fn add_stack(&self, name: &str, status: &str, resources: Vec<StackResource>) {
        self.stacks
            .insert(name.to_string(), (status.to_string(), resources));
    }

    pub fn set_create_behavior(&self, behavior: CreateBehavior) {
        *self.create_behavior.lock().unwrap() = Some(behavior);
    }

    // ── Assertions ─────────────────────────────────────────────────────

    pub fn registered_definition_count(&self) -> usize {
        self.registered_definitions.load(Ordering::SeqCst)
    }

    pub fn applied_updates(&self) -> Vec<ServiceUpdate> {
        self.applied_updates.lock().unwrap().clone()
    }

    pub fn deleted_services(&self) -> Vec<String> {
        self.deleted_services.lock().unwrap().clone()
    }

    pub fn deleted_stacks(&self) -> Vec<String> {
        self.deleted_stacks.lock().unwrap().clone()
    }

    pub fn deleted_target_groups(&self) -> Vec<String> {
        self.deleted_target_groups.lock().unwrap().clone()
    }

    pub fn deleted_listeners(&self) -> Vec<String> {
        self.deleted_listeners.lock().unwrap().clone()
    }

    pub fn created_log_groups(&self) -> Vec<String> {
        self.log_groups.lock().unwrap().clone()
    }

    pub fn has_stack(&self, name: &str) -> bool {
        self.stacks.contains_key(name)
    }

    pub fn stack_status(&self, name: &str) -> Option<String> {
        self.stacks.get(name).map(|entry| entry.value().0.clone())
    }
}

#[async_trait]
impl NetworkPort for SimulatedCloud {
    async fn list_load_balancers(&self) -> CloudResult<Vec<LoadBalancer>> {
        Ok(self.load_balancers.lock().unwrap().clone())
    }

    async fn list_listeners(&self, load_balancer_arn: &str) -> CloudResult<Vec<Listener>> {
        Ok(self
            .listeners
            .get(load_balancer_arn)
            .map(|l| l.clone())
            .unwrap_or_default())
    }

    async fn delete_listener(&self, listener_arn: &str) -> CloudResult<()> {
        for mut entry in self.listeners.iter_mut() {
            entry.value_mut().retain(|l| l.arn != listener_arn);
        }
        self.deleted_listeners
            .lock()
            .unwrap()
            .push(listener_arn.to_string());
        Ok(())
    }

    async fn describe_target_group(&self, name: &str) -> CloudResult<Option<TargetGroup>> {
        Ok(self.target_groups.get(name).map(|tg| tg.clone()))
    }

    async fn describe_target_group_by_arn(&self, arn: &str) -> CloudResult<Option<TargetGroup>> {
        Ok(self
            .target_groups
            .iter()
            .find(|tg| tg.arn == arn)
            .map(|tg| tg.clone()))
    }

    async fn delete_target_group(&self, arn: &str) -> CloudResult<()> {
        self.target_groups.retain(|_, tg| tg.arn != arn);
        self.deleted_target_groups
            .lock()
            .unwrap()
            .push(arn.to_string());
        Ok(())
    }

    async fn modify_health_check_path(&self, arn: &str, path: &str) -> CloudResult<()> {
        for mut tg in self.target_groups.iter_mut() {
            if tg.arn == arn {
                tg.health_check_path = path.to_string();
                return Ok(());
            }
        }
        Err(CloudError::NotFound(arn.to_string()))
    }
}

#[async_trait]
impl ComputePort for SimulatedCloud {
    async fn describe_service(
        &self,
        cluster: &str,
        service: &str,
    ) -> CloudResult<Option<ServiceDescription>> {
        let key = service_key(cluster, service);
        if let Some(mut script) = self.service_scripts.get_mut(&key) {
            if script.len() > 1 {
                let snapshot = script.pop_front().expect("non-empty script");
                return Ok(Some(snapshot));
            }
            if let Some(last) = script.front() {
                // Last snapshot stays sticky for final best-effort reads.
                return Ok(Some(last.clone()));
            }
        }
        Ok(self.services.get(&key).map(|s| s.clone()))
    }

    async fn update_service(&self, update: ServiceUpdate) -> CloudResult<ServiceDescription> {
        let key = service_key(&update.cluster, &update.service);
        let described = {
            let mut entry = self
                .services
                .get_mut(&key)
                .ok_or_else(|| CloudError::NotFound(key.clone()))?;
            entry.desired_count = update.desired_count;
            entry.task_definition = update.task_definition.clone();
            entry.clone()
        };
        self.applied_updates.lock().unwrap().push(update);
        Ok(described)
    }

    async fn delete_service(&self, cluster: &str, service: &str) -> CloudResult<()> {
        let key = service_key(cluster, service);
        self.services.remove(&key);
        self.deleted_services.lock().unwrap().push(key);
        Ok(())
    }

    async fn describe_task_definition(&self, reference: &str) -> CloudResult<TaskDefinition> {
        self.task_definitions
            .get(reference)
            .map(|td| td.clone())
            .ok_or_else(|| CloudError::NotFound(reference.to_string()))
    }

    async fn register_task_definition(
        &self,
        mut definition: TaskDefinition,
    ) -> CloudResult<TaskDefinition> {
        let revision = self.registered_definitions.fetch_add(1, Ordering::SeqCst) as i64 + 2;
        let arn = format!("arn:sim:task-definition/{}:{}", definition.family, revision);
        definition.arn = Some(arn.clone());
        definition.revision = Some(revision);
        definition.registered_at = Some(Utc::now());
        self.task_definitions.insert(arn, definition.clone());
        Ok(definition)
    }

    async fn list_tasks(
        &self,
        cluster: &str,
        service: &str,
        desired_status: &str,
    ) -> CloudResult<Vec<String>> {
        Ok(self
            .tasks
            .get(&service_key(cluster, service))
            .map(|tasks| {
                tasks
                    .iter()
                    .filter(|t| t.last_status == desired_status)
                    .map(|t| t.arn.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn describe_tasks(&self, cluster: &str, task_arns: &[String]) -> CloudResult<Vec<Task>> {
        let mut found = Vec::new();
        for entry in self.tasks.iter() {
            if !entry.key().starts_with(&format!("{}/", cluster)) {
                continue;
            }
            for task in entry.value() {
                if task_arns.contains(&task.arn) {
                    found.push(task.clone());
                }
            }
        }
        Ok(found)
    }

    async fn cluster_vpcs(&self, cluster: &str) -> CloudResult<Vec<String>> {
        Ok(self
            .cluster_vpcs
            .get(cluster)
            .map(|v| v.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl StackPort for SimulatedCloud {
    async fn list_stacks(&self, status_filter: &[&str]) -> CloudResult<Vec<StackSummary>> {
        Ok(self
            .stacks
            .iter()
            .filter(|entry| status_filter.contains(&entry.value().0.as_str()))
            .map(|entry| StackSummary {
                name: entry.key().clone(),
                status: entry.value().0.clone(),
            })
            .collect())
    }

    async fn list_stack_resources(&self, stack_name: &str) -> CloudResult<Vec<StackResource>> {
        self.stacks
            .get(stack_name)
            .map(|entry| entry.value().1.clone())
            .ok_or_else(|| CloudError::NotFound(stack_name.to_string()))
    }

    async fn stack_exists(&self, stack_name: &str) -> CloudResult<bool> {
        Ok(self.stacks.contains_key(stack_name))
    }

    async fn create_stack(
        &self,
        stack_name: &str,
        _template_body: serde_json::Value,
        _max_wait: Duration,
    ) -> CloudResult<()> {
        if self.stacks.contains_key(stack_name) {
            return Err(CloudError::Api(format!(
                "stack {} already exists",
                stack_name
            )));
        }
        let behavior = self
            .create_behavior
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(CreateBehavior::Succeed);
        match behavior {
            CreateBehavior::Succeed => {
                self.stacks.insert(
                    stack_name.to_string(),
                    ("CREATE_COMPLETE".to_string(), Vec::new()),
                );
                Ok(())
            }
            CreateBehavior::Fail(message) => {
                self.stacks.insert(
                    stack_name.to_string(),
                    ("CREATE_FAILED".to_string(), Vec::new()),
                );
                Err(CloudError::Api(message))
            }
            CreateBehavior::ExceedWait => {
                self.stacks.insert(
                    stack_name.to_string(),
                    ("CREATE_IN_PROGRESS".to_string(), Vec::new()),
                );
                Err(CloudError::WaitTimeout {
                    operation: format!("create stack {}", stack_name),
                })
            }
        }
    }

    async fn update_stack(
        &self,
        stack_name: &str,
        _template_body: serde_json::Value,
        _max_wait: Duration,
    ) -> CloudResult<()> {
        if !self.stacks.contains_key(stack_name) {
            return Err(CloudError::NotFound(stack_name.to_string()));
        }
        self.stacks.insert(
            stack_name.to_string(),
            ("UPDATE_COMPLETE".to_string(), Vec::new()),
        );
        Ok(())
    }

    async fn delete_stack(&self, stack_name: &str) -> CloudResult<()> {
        self.stacks.remove(stack_name);
        self.deleted_stacks.lock().unwrap().push(stack_name.to_string());
        Ok(())
    }

    async fn ensure_log_group(&self, name: &str) -> CloudResult<()> {
        self.log_groups.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeploymentState;

    fn snapshot(id: &str, running: i64) -> ServiceDescription {
        ServiceDescription {
            cluster: "c1".into(),
            service_name: "svc".into(),
            status: "ACTIVE".into(),
            desired_count: 2,
            running_count: running,
            pending_count: 0,
            task_definition: "td:1".into(),
            deployments: vec![DeploymentState {
                id: id.into(),
                status: "PRIMARY".into(),
                task_definition: "td:1".into(),
                desired_count: 2,
                running_count: running,
                pending_count: 0,
                failed_tasks: 0,
                created_at: None,
                updated_at: None,
                service_connect: None,
            }],
            events: vec![],
            load_balancers: vec![],
            network_configuration: None,
            deployment_configuration: None,
            deployment_controller: None,
            placement_strategy: None,
            placement_constraints: None,
            scheduling_strategy: None,
            service_registries: None,
            health_check_grace_period_seconds: None,
        }
    }

    #[tokio::test]
    async fn scripted_snapshots_pop_in_order_and_stick() {
        let cloud = SimulatedCloud::new();
        cloud.script_service("c1", "svc", vec![snapshot("d1", 0), snapshot("d1", 2)]);

        let first = cloud.describe_service("c1", "svc").await.unwrap().unwrap();
        assert_eq!(first.running_count, 0);
        let second = cloud.describe_service("c1", "svc").await.unwrap().unwrap();
        assert_eq!(second.running_count, 2);
        // Sticky after the script drains.
        let third = cloud.describe_service("c1", "svc").await.unwrap().unwrap();
        assert_eq!(third.running_count, 2);
    }

    #[tokio::test]
    async fn create_failure_leaves_partial_stack() {
        let cloud = SimulatedCloud::new();
        cloud.set_create_behavior(CreateBehavior::Fail("boom".into()));
        let err = cloud
            .create_stack("ECS-Service-x", serde_json::json!({}), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CloudError::Api(_)));
        assert!(cloud.has_stack("ECS-Service-x"));
    }

    #[tokio::test]
    async fn register_assigns_fresh_revisions() {
        let cloud = SimulatedCloud::new();
        let td = TaskDefinition {
            family: "billing-eu1".into(),
            ..Default::default()
        };
        let first = cloud.register_task_definition(td.clone()).await.unwrap();
        let second = cloud.register_task_definition(td).await.unwrap();
        assert_ne!(first.arn, second.arn);
        assert_eq!(cloud.registered_definition_count(), 2);
    }
}
