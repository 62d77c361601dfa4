//! Consolidated verdicts and final status strings.

use flotilla_types::{ComponentType, DeploymentStatus, Verdict};
use tracing::{info, warn};

/// Health status a stable rollout reports.
const STABLE: &str = "STABLE";

/// Combines the DB component results and the app rollout health of one
/// service into a single verdict, and rewrites the app status string so
/// a reader sees both the convergence outcome and the health outcome.
pub struct StatusAggregator;

impl StatusAggregator {
    /// One verdict per service:
    ///
    /// * any `Failed` DB component takes precedence;
    /// * a targeted app that never reached `STABLE` is a `Failure`
    ///   (the infra action succeeded, the workload did not);
    /// * a healthy DB (or none) with a stable or untargeted app is a
    ///   `Success`;
    /// * anything else, such as an untargeted app over skipped-only DB
    ///   components, stays `Unknown`.
    pub fn consolidated_verdict(status: &DeploymentStatus) -> Verdict {
        if status.db_failed() {
            return Verdict::Failed;
        }

        let stable = status
            .app
            .health
            .as_ref()
            .map(|h| h.status == STABLE)
            .unwrap_or(false);

        if status.app.is_targeted() {
            return if stable {
                Verdict::Success
            } else {
                Verdict::Failure
            };
        }

        if status.db.is_empty() || status.db.iter().any(|d| d.status == Verdict::Success) {
            Verdict::Success
        } else {
            Verdict::Unknown
        }
    }

    /// Rewrite each app status for human consumption and log one
    /// consolidated line per service. Only services whose convergence
    /// succeeded are rewritten; failure strings stay as recorded.
    pub fn finalize(statuses: &mut [DeploymentStatus]) {
        for status in statuses.iter_mut() {
            let verdict = Self::consolidated_verdict(status);
            let components: Vec<ComponentType> = status.component_types();
            info!(
                product = %status.product,
                region = %status.region,
                service = %status.service,
                ?components,
                verdict = %verdict,
                app_status = %status.app.status,
                "consolidated deployment status"
            );

            if status.app.outcome != Some(Verdict::Success) {
                continue;
            }
            match &status.app.health {
                Some(health) => {
                    if health.status == STABLE {
                        status.app.status = format!(
                            "Deployment - {}, Health Status - {}",
                            Verdict::Success,
                            health.status
                        );
                    } else {
                        let reason = health
                            .rollback_reason
                            .clone()
                            .unwrap_or_else(|| "Unknown".into());
                        status.app.status = format!(
                            "Health Check Failed - {} ,Reason-{}",
                            health.status, reason
                        );
                    }
                }
                None => {
                    warn!(
                        service = %status.app.service,
                        "deployment successful but no health report recorded"
                    );
                }
            }
        }
    }
}
