//! The polling loop and rollback inference.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use flotilla_cloud::compute::ComputePort;
use flotilla_cloud::model::{
    DeploymentState, ServiceDescription, ServiceEvent, HEALTHY_CONTAINER_STATUS,
    RUNNING_TASK_STATUS,
};
use flotilla_types::context::OpContext;
use flotilla_types::status::{HealthOutcome, RolloutHealth};
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::ledger::DeploymentLedger;

/// Status string reported when the budget ran out before stability.
pub const TIMEOUT_STATUS: &str = "Service Health Status Unknown after timeout";

/// Stable rollouts report this status.
pub const STABLE_STATUS: &str = "STABLE";

/// Events older than this many seconds before the initial deployment's
/// first sighting are ignored during rollback inference.
const ROLLBACK_LOOKBACK_SECS: i64 = 60;

/// Poll cadence and budget for one session.
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            timeout: Duration::from_secs(15 * 60),
        }
    }
}

fn failure_vocabulary(message: &str) -> bool {
    message.contains("failed") || message.contains("roll")
}

/// Deployment ids of the form `ecs-svc/<digits>` embed a creation epoch
/// in their first ten digits.
fn deployment_epoch(id: &str) -> Option<i64> {
    let digits = id.strip_prefix("ecs-svc/").or_else(|| {
        id.split_once("ecs-svc/").map(|(_, rest)| rest)
    })?;
    if digits.len() < 10 {
        return None;
    }
    digits.get(..10)?.parse().ok()
}

fn primary(service: &ServiceDescription) -> Option<DeploymentState> {
    service.primary_deployment().cloned()
}

/// Filtered excerpt of a service's event log for the final report.
fn event_excerpt(events: &[ServiceEvent]) -> String {
    events
        .iter()
        .filter(|e| {
            failure_vocabulary(&e.message) || e.message.contains("health")
        })
        .take(10)
        .map(|e| format!("{} - {}", e.created_at.to_rfc3339(), e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

enum LoopExit {
    Stable,
    RolledBack,
    NoActiveDeployment,
    Timeout,
}

/// Watches one service rollout to a terminal verdict.
pub struct DeploymentMonitor {
    compute: Arc<dyn ComputePort>,
    settings: MonitorSettings,
}

impl DeploymentMonitor {
    pub fn new(compute: Arc<dyn ComputePort>) -> Self {
        Self {
            compute,
            settings: MonitorSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: MonitorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Monitor one rollout until it stabilizes, rolls back, loses its
    /// active deployment, or the budget runs out. Never raises.
    pub async fn watch(
        &self,
        ctx: &OpContext,
        cluster: &str,
        service: &str,
        initial_deployment_id: &str,
    ) -> RolloutHealth {
        let started = Instant::now();
        info!(
            correlation_id = %ctx.correlation_id,
            cluster,
            service,
            initial_deployment_id,
            "monitoring deployment"
        );

        let mut ledger = DeploymentLedger::new();
        let mut active: Option<DeploymentState> = None;
        let mut rollback_reason: Option<String> = None;

        let exit = loop {
            if started.elapsed() >= self.settings.timeout {
                break LoopExit::Timeout;
            }

            let details = match self.compute.describe_service(cluster, service).await {
                Ok(Some(details)) => details,
                Ok(None) => {
                    warn!(service, "service not found, retrying");
                    sleep(self.settings.poll_interval).await;
                    continue;
                }
                Err(err) => {
                    warn!(service, %err, "could not get service details, retrying");
                    sleep(self.settings.poll_interval).await;
                    continue;
                }
            };

            let current = match primary(&details) {
                Some(deployment) => deployment,
                None => {
                    info!(service, "no active deployment found");
                    break LoopExit::NoActiveDeployment;
                }
            };

            let now = Utc::now();
            ledger.observe(&details.deployments, now);

            if current.id != initial_deployment_id {
                if let Some(reason) =
                    self.infer_rollback(&ledger, &details, initial_deployment_id, &current)
                {
                    info!(
                        service,
                        initial = initial_deployment_id,
                        current = %current.id,
                        reason = %reason,
                        "detected rollback"
                    );
                    rollback_reason = Some(reason);
                    active = Some(current);
                    break LoopExit::RolledBack;
                }
            }

            let complete = current.running_count == current.desired_count
                && current.pending_count == 0
                && details.deployments.len() == 1;
            let healthy = self.tasks_healthy(cluster, service, &current).await;
            active = Some(current);

            if complete && healthy {
                info!(service, "deployment has stabilized");
                break LoopExit::Stable;
            }

            sleep(self.settings.poll_interval).await;
        };

        // Best-effort final snapshot; its absence does not fail the
        // report.
        let final_details = match self.compute.describe_service(cluster, service).await {
            Ok(details) => details,
            Err(err) => {
                warn!(service, %err, "could not get final service details");
                None
            }
        };
        if let Some(details) = &final_details {
            if let Some(deployment) = primary(details) {
                active = Some(deployment);
            }
        }

        let (outcome, status) = match exit {
            LoopExit::Stable => (HealthOutcome::Stable, STABLE_STATUS.to_string()),
            LoopExit::Timeout => (HealthOutcome::Timeout, TIMEOUT_STATUS.to_string()),
            LoopExit::RolledBack => (HealthOutcome::RolledBack, "ROLLED_BACK".to_string()),
            LoopExit::NoActiveDeployment => {
                (HealthOutcome::NoActiveDeployment, "UNKNOWN".to_string())
            }
        };

        RolloutHealth {
            cluster: cluster.to_string(),
            service: service.to_string(),
            outcome,
            status,
            initial_deployment_id: initial_deployment_id.to_string(),
            current_deployment_id: active
                .as_ref()
                .map(|d| d.id.clone())
                .unwrap_or_else(|| "unknown".to_string()),
            rollback_occurred: rollback_reason.is_some(),
            rollback_reason,
            desired_count: active.as_ref().map(|d| d.desired_count).unwrap_or(0),
            pending_count: active.as_ref().map(|d| d.pending_count).unwrap_or(0),
            running_count: active.as_ref().map(|d| d.running_count).unwrap_or(0),
            failed_tasks: active.as_ref().map(|d| d.failed_tasks).unwrap_or(0),
            events: final_details
                .as_ref()
                .map(|d| event_excerpt(&d.events))
                .unwrap_or_default(),
            task_definition: active.as_ref().map(|d| d.task_definition.clone()),
            monitoring_time_elapsed: format!(
                "{:.2} minutes",
                started.elapsed().as_secs_f64() / 60.0
            ),
        }
    }

    /// Returns the rollback reason when the PRIMARY change is explained
    /// by failure/rollback vocabulary in the event log.
    fn infer_rollback(
        &self,
        ledger: &DeploymentLedger,
        details: &ServiceDescription,
        initial_deployment_id: &str,
        current: &DeploymentState,
    ) -> Option<String> {
        if let Some(record) = ledger.get(initial_deployment_id) {
            let lookback: DateTime<Utc> =
                record.first_seen - chrono::Duration::seconds(ROLLBACK_LOOKBACK_SECS);
            return details
                .events
                .iter()
                .find(|e| e.created_at >= lookback && failure_vocabulary(&e.message))
                .map(|e| e.message.clone());
        }

        // The initial id aged out before the monitor ever saw it; fall
        // back to comparing the epochs embedded in the ids.
        let initial_epoch = deployment_epoch(initial_deployment_id)?;
        let current_epoch = deployment_epoch(&current.id)?;
        if current_epoch > initial_epoch {
            return details
                .events
                .iter()
                .find(|e| failure_vocabulary(&e.message))
                .map(|e| e.message.clone());
        }
        None
    }

    /// Independent task-level health probe: every running task must be
    /// on the active revision with all health-checked containers
    /// healthy. Errors count as unhealthy and are retried next tick.
    async fn tasks_healthy(
        &self,
        cluster: &str,
        service: &str,
        deployment: &DeploymentState,
    ) -> bool {
        let task_arns = match self
            .compute
            .list_tasks(cluster, service, RUNNING_TASK_STATUS)
            .await
        {
            Ok(arns) => arns,
            Err(err) => {
                error!(service, %err, "error checking health status");
                return false;
            }
        };
        if task_arns.is_empty() {
            info!(service, "no running tasks found");
            return false;
        }

        let tasks = match self.compute.describe_tasks(cluster, &task_arns).await {
            Ok(tasks) => tasks,
            Err(err) => {
                error!(service, %err, "error checking health status");
                return false;
            }
        };

        let unhealthy = tasks
            .iter()
            .filter(|task| {
                if task.task_definition_arn != deployment.task_definition {
                    // Still on a previous revision: not yet healthy.
                    return true;
                }
                task.containers.iter().any(|container| {
                    container
                        .health_status
                        .as_deref()
                        .is_some_and(|status| status != HEALTHY_CONTAINER_STATUS)
                })
            })
            .count();

        if unhealthy > 0 {
            info!(service, unhealthy, "found unhealthy tasks");
            false
        } else {
            info!(service, total = tasks.len(), "all tasks healthy");
            !tasks.is_empty()
        }
    }
}
