use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;

mod client;
mod model;
mod render;

use client::CollectorClient;

/// Sysmon query client: fetch and display device statistics from the collector.
#[derive(Parser, Debug)]
#[command(name = "sysmon-query", version, about)]
struct Cli {
    /// Collector URL.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Show only this device id.
    #[arg(short, long)]
    device: Option<String>,

    /// Time range in hours to fetch history for.
    #[arg(short = 't', long, default_value_t = 24)]
    hours: u64,

    /// Show the historical table as well as the latest snapshot.
    #[arg(short, long)]
    verbose: bool,

    /// List all available devices and exit.
    #[arg(short, long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout carries only the report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sysmon_query=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let client = CollectorClient::new(&cli.server)?;
    let mut stdout = std::io::stdout().lock();

    if cli.list {
        let devices = client.list_devices().await?;
        writeln!(stdout, "Available devices:")?;
        for device in devices {
            writeln!(stdout, "  - {device}")?;
        }
        return Ok(());
    }

    let device_ids = match cli.device {
        Some(ref id) => vec![id.clone()],
        None => client.list_devices().await?,
    };

    // Fetch everything before printing so a failure produces no partial report.
    let mut reports = Vec::with_capacity(device_ids.len());
    for id in &device_ids {
        reports.push(client.fetch_history(id, cli.hours).await?);
    }

    if reports.is_empty() {
        render::render(&mut stdout, &[], cli.verbose)?;
    }
    for entries in &reports {
        render::render(&mut stdout, entries, cli.verbose).context("failed to write report")?;
    }
    Ok(())
}
