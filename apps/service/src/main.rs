#![warn(clippy::all)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod alert;
mod audit;
mod config;
mod monitoring;
mod store;

use alert::{AlertDispatcher, LogDispatcher, SmsGateway};
use audit::AuditLog;
use config::Config;
use monitoring::{HttpTransport, OutcomeProcessor, ProbeExecutor, Scheduler, SchedulerConfig};
use store::{FileStore, RecordStore};

/// Uptime monitoring engine: probes stored checks, alerts owners on
/// up/down transitions, and keeps rotated per-check audit logs.
#[derive(Parser)]
#[command(name = "vigil", version, about)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the resolved configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init_tracing();

    let args = Args::parse();
    let config = Config::from_config(args.config.as_ref())?;

    if args.print_config {
        print!("{config}");
        return Ok(());
    }

    run(config).await
}

async fn run(config: Config) -> Result<()> {
    tokio::fs::create_dir_all(config.storage.data_dir.join("checks")).await?;
    tokio::fs::create_dir_all(&config.storage.log_dir).await?;

    let store: Arc<dyn RecordStore> = Arc::new(FileStore::new(&config.storage.data_dir));
    let audit = Arc::new(AuditLog::new(&config.storage.log_dir));

    let dispatcher: Arc<dyn AlertDispatcher> = match &config.sms {
        Some(sms) => Arc::new(SmsGateway::new(sms)?),
        None => Arc::new(LogDispatcher),
    };

    let executor = Arc::new(ProbeExecutor::new(Arc::new(HttpTransport::new()?)));
    let processor =
        Arc::new(OutcomeProcessor::new(Arc::clone(&store), Arc::clone(&audit), dispatcher));

    let scheduler = Scheduler::new(
        store,
        executor,
        processor,
        audit,
        SchedulerConfig {
            probe_interval: Duration::from_secs(config.monitoring.probe_interval_seconds),
            rotation_interval: Duration::from_secs(config.monitoring.rotation_interval_seconds),
            serialize_checks: config.monitoring.serialize_checks,
        },
    );
    let handles = scheduler.start();

    info!(
        "monitoring engine started (probe every {}s, rotate logs every {}s)",
        config.monitoring.probe_interval_seconds, config.monitoring.rotation_interval_seconds,
    );

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, stopping");
    for handle in handles {
        handle.abort();
    }

    Ok(())
}
