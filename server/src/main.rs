use anyhow::Result;
use clap::Parser;
use sysmon_server::{api, config};
use tracing::info;

/// Sysmon collector: stores agent samples in memory and serves queries.
#[derive(Parser, Debug)]
#[command(name = "sysmon-server", version, about)]
struct Cli {
    /// Address and port to listen on.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Path to a TOML configuration file (optional).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (logs).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sysmon_server=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Sysmon collector"
    );

    // Load optional config file.
    let app_config = if let Some(ref path) = cli.config {
        config::AppConfig::from_file(path)?
    } else {
        config::AppConfig::default()
    };

    // Samples live only as long as this process.
    let state = api::AppState::new(app_config);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&cli.listen).await?;
    info!(addr = %cli.listen, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Collector stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
