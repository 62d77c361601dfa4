//! Flotilla CLI - catalog-driven deployment convergence
//!
//! Reads a directory of `*-catalog.yml` files and drives each entry
//! through the database stage, stack convergence, and rollout
//! monitoring against the simulated infrastructure ports, printing one
//! consolidated status line per service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use flotilla_catalog::{CatalogSequencer, DeploymentRunner, StatusAggregator};
use flotilla_cloud::{
    SimulatedCloud, SimulatedConfigStore, SimulatedDatabaseDeployer, TracingNotifier,
};
use flotilla_monitor::MonitorSettings;
use flotilla_types::OpContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod fixture;

use fixture::Fixture;

#[derive(Parser)]
#[command(name = "flotilla")]
#[command(about = "Flotilla - catalog-driven deployment convergence", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every catalog in a directory
    Deploy {
        /// Directory holding *-catalog.yml files
        directory: PathBuf,

        /// Fixture file seeding the simulated infrastructure
        #[arg(short, long, env = "FLOTILLA_FIXTURE")]
        fixture: Option<PathBuf>,

        /// Rollout monitoring budget per service, in minutes
        #[arg(long, default_value_t = 15)]
        timeout_minutes: u64,

        /// Monitor poll interval, in seconds
        #[arg(long, default_value_t = 30)]
        poll_interval_seconds: u64,
    },

    /// Parse-check every catalog in a directory without deploying
    Validate {
        /// Directory holding *-catalog.yml files
        directory: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Deploy {
            directory,
            fixture,
            timeout_minutes,
            poll_interval_seconds,
        } => {
            deploy(
                &directory,
                fixture.as_deref(),
                MonitorSettings {
                    poll_interval: Duration::from_secs(poll_interval_seconds),
                    timeout: Duration::from_secs(timeout_minutes * 60),
                },
            )
            .await
        }
        Commands::Validate { directory } => validate(&directory),
    }
}

async fn deploy(
    directory: &std::path::Path,
    fixture: Option<&std::path::Path>,
    settings: MonitorSettings,
) -> anyhow::Result<()> {
    let cloud = Arc::new(SimulatedCloud::new());
    let store = Arc::new(SimulatedConfigStore::new());
    if let Some(path) = fixture {
        Fixture::load(path)?.apply(&cloud, &store);
    }

    let sequencer = CatalogSequencer::new(
        cloud.clone(),
        cloud.clone(),
        cloud,
        store,
        Arc::new(SimulatedDatabaseDeployer::succeeding()),
    )
    .with_monitor_settings(settings);
    let runner = DeploymentRunner::new(sequencer, Arc::new(TracingNotifier::new()));

    let run_id = chrono::Utc::now().timestamp_millis().to_string();
    let ctx = OpContext::new_root(run_id);
    let reports = runner.run(&ctx, directory).await;

    for (catalog, statuses) in &reports {
        println!("{}", catalog);
        for status in statuses {
            let verdict = StatusAggregator::consolidated_verdict(status);
            println!(
                "  {} {}/{} [{}]: {}",
                status.product, status.service, status.region, verdict, status.app.status
            );
            for db in &status.db {
                println!("    db {} ({}): {} - {}", db.file, db.db, db.status, db.message);
            }
        }
    }
    if reports.is_empty() {
        println!("no catalogs processed");
    }
    Ok(())
}

fn validate(directory: &std::path::Path) -> anyhow::Result<()> {
    let mut failures = 0usize;
    let mut entries: Vec<_> = std::fs::read_dir(directory)?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| name.ends_with("-catalog.yml"))
        .collect();
    entries.sort();

    if entries.is_empty() {
        println!("no catalog files found in {}", directory.display());
        return Ok(());
    }

    for name in entries {
        let path = directory.join(&name);
        let raw = std::fs::read_to_string(&path)?;
        match serde_yaml::from_str::<flotilla_types::CatalogDocument>(&raw) {
            Ok(document) => {
                println!("✓ {} ({} entries)", name, document.sorted_entries().len());
            }
            Err(err) => {
                failures += 1;
                eprintln!("✗ {}: {}", name, err);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} catalog file(s) failed validation", failures);
    }
    Ok(())
}
