//! Inspection Gateway - shared inspection checklist with live sync

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inspection_gateway::{config::Args, server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("inspection_gateway={},info", log_level).into()),
        )
        .with(args.log_json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!args.log_json).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Inspection Gateway");
    info!("======================================");
    info!("Listen: {}", args.listen);
    info!("Data file: {}", args.data_file.display());
    info!("Push channel: ws://{}/inspection", args.listen);
    info!("Broadcast capacity: {}", args.broadcast_capacity);
    info!("======================================");

    let state = Arc::new(AppState::initialize(args).await);
    info!(
        items = state.document.snapshot().await.items.len(),
        "Inspection document ready"
    );

    tokio::select! {
        result = server::run(Arc::clone(&state)) => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Inspection gateway shutting down");
    Ok(())
}
