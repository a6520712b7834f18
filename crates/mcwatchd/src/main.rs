//! mcwatch daemon - watches game servers and reports changes to chat.

use anyhow::{Context, Result};
use clap::Parser;
use mcwatchd::config::Config;
use mcwatchd::monitor::{Monitor, MonitorContext};
use mcwatchd::observed::ObservedStateTable;
use mcwatchd::provider::{SlpProvider, SrvResolver};
use mcwatchd::registry::ServerRegistry;
use mcwatchd::server::{self, AppState};
use mcwatchd::sink::{DiscordSink, LogSink, NotificationSink};
use mcwatchd::tracking::TrackingStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcwatchd")]
#[command(about = "Game server status monitor", long_about = None)]
#[command(version)]
struct Args {
    /// Config file (defaults to /etc/mcwatch/config.toml)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("mcwatchd v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;

    let registry = Arc::new(ServerRegistry::from_entries(&config.servers));
    let tracking = Arc::new(TrackingStore::open(&config.tracking.path).await);

    let sink: Arc<dyn NotificationSink> = match config.discord.token.as_deref() {
        Some(token) if !token.is_empty() => {
            Arc::new(DiscordSink::new(&config.discord.api_base, token)?)
        }
        _ => {
            warn!("No Discord token configured, notifications will only be logged");
            Arc::new(LogSink)
        }
    };

    let mut provider = SlpProvider::new(
        Duration::from_secs(config.provider.timeout_secs),
        config.provider.protocol_version,
    );
    if config.provider.srv_lookup {
        match SrvResolver::from_system_conf() {
            Ok(resolver) => provider = provider.with_srv(resolver),
            Err(e) => warn!("SRV lookups disabled, no usable DNS configuration: {}", e),
        }
    }
    let provider = Arc::new(provider);

    let monitor = Arc::new(Monitor::new(
        registry,
        Arc::new(ObservedStateTable::new()),
        MonitorContext {
            tracking,
            provider,
            sink,
            baseline: config.monitor.baseline,
        },
        config.monitor.interval(),
    ));
    monitor.start().await;

    info!("mcwatchd ready");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutting down gracefully");
    };

    let result = server::run(AppState::new(Arc::clone(&monitor)), &config.http.bind, shutdown).await;
    monitor.shutdown().await;
    result
}
