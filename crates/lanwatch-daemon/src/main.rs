//! Lanwatch Daemon - Main entry point
//!
//! Runs the periodic subnet discovery loop and serves the web UI.

mod api;
mod config;
mod lock;
mod server;
mod state;
mod ui;
mod ws;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::ui::UiLauncher;

#[derive(Parser, Debug)]
#[command(name = "lanwatch")]
#[command(about = "Local subnet device discovery daemon")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "lanwatch.toml")]
    config: PathBuf,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single scan and exit
    #[arg(long)]
    scan_once: bool,

    /// Do not open the UI in a browser
    #[arg(long)]
    no_ui: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Lanwatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::load_config(&args.config)?;

    // Override bind address if specified
    if let Some(bind) = args.bind {
        config.daemon.bind = bind;
    }

    // One instance per machine; a second one just points at the first
    let _instance_lock = match lock::InstanceLock::acquire(config.daemon.instance_lock_port) {
        Ok(lock) => lock,
        Err(e) => {
            info!(error = %e, "Another instance is already running, exiting");
            return Ok(());
        }
    };

    // Shutdown signal threaded through orchestrator, pool, and workers
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);

    // Create application state
    let state = state::AppState::new(&config, cancel_rx)?;

    if args.scan_once {
        // Single scan mode
        info!("Running single discovery scan");
        let devices = state.orchestrator.run_once().await?;
        println!("Discovered {} devices:", devices.len());
        for device in devices {
            println!(
                "  - {} [{}] {}",
                device.addr,
                device.hardware_addr,
                device.vendor.as_deref().unwrap_or("Unknown"),
            );
        }
        return Ok(());
    }

    // Daemon mode: discovery loop in the background
    let orchestrator = state.orchestrator.clone();
    let discovery_task = tokio::spawn(async move {
        orchestrator.run().await;
    });

    // Web server
    let bind = config.daemon.bind.clone();
    let server_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = server::run(server_state, &bind).await {
            tracing::error!(error = %e, "Web server failed");
        }
    });

    if config.daemon.open_ui && !args.no_ui {
        let url = format!("http://{}", config.daemon.bind);
        ui::BrowserLauncher.open(&url);
    }

    // Graceful shutdown on ctrl-c
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    let _ = cancel_tx.send(true);
    if let Err(e) = discovery_task.await {
        warn!(error = %e, "Discovery task did not shut down cleanly");
    }

    Ok(())
}
