use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

mod collectors;
mod config;
mod runner;
mod transport;

use config::{AgentConfig, Overrides};

/// Sysmon agent: samples system metrics and pushes them to the collector.
#[derive(Parser, Debug)]
#[command(name = "sysmon-agent", version, about)]
struct Cli {
    /// Collector URL, e.g. http://10.0.0.5:8080.
    #[arg(short, long)]
    server: Option<String>,

    /// Collection interval in seconds.
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Custom device identifier.
    #[arg(short, long)]
    device_id: Option<String>,

    /// Number of samples to send (0 for infinite).
    #[arg(short, long, default_value_t = 0)]
    count: u64,

    /// Log payloads, collector responses and progress.
    #[arg(short, long)]
    verbose: bool,

    /// Collect samples but don't send them.
    #[arg(long)]
    dry_run: bool,

    /// Send one sample and exit.
    #[arg(long)]
    once: bool,

    /// Generate a new device id, save it and exit.
    #[arg(long)]
    new_id: bool,

    /// Path to the JSON configuration file (defaults to beside the executable).
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            server_url: self.server.clone(),
            interval_secs: self.interval,
            device_id: self.device_id.clone(),
            verbose: self.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sysmon_agent=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_path);

    let resolved = AgentConfig::resolve(&config_path, &cli.overrides())?;
    let mut cfg = resolved.config;

    if cli.new_id {
        cfg.regenerate_id(&config_path)?;
        println!("Generated new device ID: {}", cfg.device_id);
        return Ok(());
    }

    if resolved.persisted_overrides {
        info!(path = %config_path.display(), "Configuration updated");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %cfg.server_url,
        device_id = %cfg.device_id,
        interval = cfg.interval_secs,
        "Starting Sysmon agent"
    );

    let opts = runner::RunOptions {
        device_id: cfg.device_id.clone(),
        interval: Duration::from_secs(cfg.interval_secs),
        count: if cli.once { 1 } else { cli.count },
        dry_run: cli.dry_run,
        verbose: cfg.verbose,
    };

    let transport = transport::HttpTransport::new(&cfg.server_url, cfg.verbose)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!("Failed to listen for interrupt: {e}");
                // Keep the sender alive so the loop keeps running.
                std::future::pending::<()>().await;
            }
        }
    });

    let (exit, sent) = runner::run(
        &collectors::SysstatSampler,
        &transport,
        &opts,
        shutdown_rx,
    )
    .await;

    match exit {
        runner::Exit::Interrupted => info!(sent, "Monitoring stopped by user"),
        runner::Exit::CountReached => info!(sent, "Requested sample count reached"),
    }

    Ok(())
}
