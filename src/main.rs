mod command;
mod config;
mod handlers;
mod scheduler;
mod server;
mod sheets;
mod store;
mod util;
mod whatsapp;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::server::AppState;
use crate::sheets::GoogleSheetsClient;
use crate::store::RecordStore;
use crate::whatsapp::{Gateway, WhatsAppClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,kostbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Rooms: {}", config.rooms.available.len());
    info!("  Admins: {}", config.admin.phone_numbers.len());
    info!("  Backup enabled: {}", config.backup.enabled);
    info!("  Payment gateway enabled: {}", config.payment_gateway.enabled);
    if config.server.debug {
        info!("  Debug mode: webhook payloads will be logged");
    }

    // Wire shared collaborators
    let config = Arc::new(config);
    let sheets = Arc::new(GoogleSheetsClient::new(config.sheets.clone()));
    let store: Arc<dyn RecordStore> = sheets.clone();
    let gateway: Arc<dyn Gateway> = Arc::new(WhatsAppClient::new(config.whatsapp.clone()));

    let state = AppState {
        config,
        store,
        gateway,
    };

    // Backup + reminder jobs
    scheduler::start_background_jobs(state.clone(), sheets).await?;

    // Serve the webhook
    info!("Bot is starting...");
    server::run(state).await
}
