//! Per-entry deployment status records and consolidated verdicts.
//!
//! One `DeploymentStatus` is created per catalog entry at the start of
//! processing, mutated in place by each stage, and never shared across
//! entries.

use serde::{Deserialize, Serialize};

/// Consolidated verdict for a component or a whole service.
///
/// `Failed` means an action itself failed; `Failure` means the infra
/// action succeeded but the workload never stabilized. The five variants
/// are deliberately kept distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Success,
    Failed,
    Failure,
    Unknown,
    /// Not applicable: the component was not targeted or was skipped.
    Na,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Success => write!(f, "Success"),
            Verdict::Failed => write!(f, "Failed"),
            Verdict::Failure => write!(f, "Failure"),
            Verdict::Unknown => write!(f, "Unknown"),
            Verdict::Na => write!(f, "NA"),
        }
    }
}

/// Component kinds present in a service's status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentType {
    Db,
    App,
}

/// Outcome of one database component deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbComponentStatus {
    pub file: String,
    pub db: String,
    pub status: Verdict,
    pub message: String,
}

impl DbComponentStatus {
    /// Status recorded when an entry carries no schema package.
    pub fn skipped_not_found() -> Self {
        Self {
            file: "NA".into(),
            db: "NA".into(),
            status: Verdict::Na,
            message: "Skipped DB component not found".into(),
        }
    }
}

/// Terminal state of one monitoring session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthOutcome {
    /// The rollout stabilized.
    Stable,
    /// A rollback to the previous revision was inferred.
    RolledBack,
    /// The timeout budget elapsed; health is unknown, not failed.
    Timeout,
    /// The service reported no active deployment.
    NoActiveDeployment,
    /// The session itself errored (reported, never thrown).
    Error,
}

/// Consolidated rollout health for one (cluster, service) session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloutHealth {
    pub cluster: String,
    pub service: String,
    pub outcome: HealthOutcome,

    /// Human-readable status string, e.g. `STABLE` or
    /// `Service Health Status Unknown after timeout`.
    pub status: String,

    pub initial_deployment_id: String,
    pub current_deployment_id: String,

    pub rollback_occurred: bool,
    pub rollback_reason: Option<String>,

    pub desired_count: i64,
    pub pending_count: i64,
    pub running_count: i64,
    pub failed_tasks: i64,

    /// Excerpt of recent failure/rollback/health events, newline-joined.
    pub events: String,

    pub task_definition: Option<String>,

    /// Elapsed monitoring time, e.g. `3.50 minutes`.
    pub monitoring_time_elapsed: String,
}

impl RolloutHealth {
    pub fn is_stable(&self) -> bool {
        self.outcome == HealthOutcome::Stable
    }
}

/// Application-stage slice of a `DeploymentStatus`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppStage {
    pub cluster: String,
    pub service: String,

    /// Convergence outcome for aggregation.
    pub outcome: Option<Verdict>,

    /// Human-readable status, rewritten by the aggregator to embed both
    /// the convergence and the health outcome.
    pub status: String,

    /// Last recorded state detail, e.g. `Service Created` or an error
    /// reason.
    pub state: String,

    pub is_update: bool,

    /// PRIMARY deployment id observed immediately before convergence;
    /// seed for rollback inference.
    pub initial_deployment_id: Option<String>,

    pub health: Option<RolloutHealth>,
}

impl AppStage {
    /// Record a skipped app stage (`NA`).
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.outcome = Some(Verdict::Na);
        self.status = "NA".into();
        self.state = reason.into();
    }

    /// Record a failed app stage with a reason string.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        self.outcome = Some(Verdict::Failed);
        self.status = format!("Failed- {}", reason);
        self.state = reason;
    }

    /// Whether the stage was targeted for deployment at all.
    pub fn is_targeted(&self) -> bool {
        !matches!(self.outcome, None | Some(Verdict::Na))
    }
}

/// Status record for one catalog entry, mutated in place by each stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentStatus {
    pub service: String,
    pub region: String,
    pub product: String,
    pub app: AppStage,
    pub db: Vec<DbComponentStatus>,
}

impl DeploymentStatus {
    /// Initialize a record for an entry. Region and product are reported
    /// uppercased; region may be empty for cleanup entries.
    pub fn init(service: &str, region: &str, product: &str) -> Self {
        Self {
            service: service.to_string(),
            region: region.to_uppercase(),
            product: product.to_uppercase(),
            app: AppStage::default(),
            db: Vec::new(),
        }
    }

    /// Whether any DB component failed. An empty DB list counts as
    /// successful.
    pub fn db_failed(&self) -> bool {
        self.db.iter().any(|d| d.status == Verdict::Failed)
    }

    /// Component kinds present in this record.
    pub fn component_types(&self) -> Vec<ComponentType> {
        let mut kinds = Vec::new();
        if !self.db.is_empty() {
            kinds.push(ComponentType::Db);
        }
        if self.app.is_targeted() {
            kinds.push(ComponentType::App);
        }
        kinds
    }
}
