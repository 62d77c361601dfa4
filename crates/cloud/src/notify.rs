//! Notification collaborator port.

use async_trait::async_trait;

use flotilla_types::{DeploymentStatus, OpContext};

/// Receives the consolidated status list for one catalog.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, ctx: &OpContext, catalog: &str, statuses: &[DeploymentStatus]);
}

/// Notifier that logs a one-line summary per service.
#[derive(Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, ctx: &OpContext, catalog: &str, statuses: &[DeploymentStatus]) {
        for status in statuses {
            tracing::info!(
                correlation_id = %ctx.correlation_id,
                catalog,
                service = %status.service,
                region = %status.region,
                product = %status.product,
                app_status = %status.app.status,
                db_components = status.db.len(),
                "deployment report"
            );
        }
    }
}
