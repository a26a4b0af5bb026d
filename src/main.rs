// This is the entry point of the library booking webhook.
//
// **Architecture Overview:**
// - `core/` = Booking rules (knows nothing about Dialogflow or Sheets)
// - `infra/` = Implementations of core traits (Google Sheets, in-memory)
// - `webhook/` = Dialogflow-specific adapter (HTTP server, intent handlers)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Start the HTTP server

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;
#[path = "webhook/webhook_layer.rs"]
mod webhook;

mod config;

use std::sync::Arc;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::core::booking::{BookingService, BookingStore, OpeningHours};
use crate::infra::booking::SheetsBookingStore;
use crate::infra::google_sheets::{ServiceAccountAuth, SheetsClient};
use crate::webhook::server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // RUST_LOG wins; otherwise info for everything
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    // Credentials are checked before anything listens, so a bad key fails the
    // start instead of the first request.
    let auth = ServiceAccountAuth::from_source(&config.credentials)
        .await
        .context("Failed to load GOOGLE_SERVICE_ACCOUNT credentials")?;
    tracing::info!(client_email = auth.client_email(), "Loaded service account");

    let hours = OpeningHours::new(config.allow_until_midnight);
    let client = SheetsClient::new(Arc::new(auth), config.spreadsheet_id.clone());
    let store = SheetsBookingStore::connect(client, hours.slots_per_day())
        .await
        .with_context(|| format!("Failed to prepare spreadsheet {}", config.spreadsheet_id))?;
    tracing::info!(
        spreadsheet_id = %config.spreadsheet_id,
        slots_per_day = hours.slots_per_day(),
        "Spreadsheet ready"
    );

    let booking = BookingService::new(Box::new(store) as Box<dyn BookingStore>, hours);
    let state = AppState::new(Arc::new(booking), config.timezone, config.debug_endpoints);
    if config.debug_endpoints {
        tracing::warn!("Debug endpoints are enabled");
    }
    let app = build_router(state, config.request_timeout);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Webhook listening on POST /webhook");

    axum::serve(listener, app).await?;
    Ok(())
}
