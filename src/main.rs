//! Hudi Catalog Sync - table metadata publisher
//!
//! Reads a Hudi table's schema, properties and commit timeline and publishes
//! them to a DataHub-style metadata catalog as concurrent aspect proposals.
//!
//! The server exposes trigger endpoints for a configured table:
//! - Full sync: container, dataset, schema, properties and last-commit marker
//! - Schema-only and properties-only syncs
//! - Caller-supplied property patches

mod config;
mod emitter;
mod error;
mod identifier;
mod models;
mod proposal;
mod routes;
mod schema;
mod state;
mod sync;
mod table;

use crate::config::Settings;
use crate::emitter::RestEmitter;
use crate::routes::create_router;
use crate::state::AppState;
use crate::sync::CatalogSyncClient;
use crate::table::HoodieTableReader;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting Hudi Catalog Sync...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    if settings.emitter.token.is_none() {
        warn!("⚠️  DATAHUB_TOKEN not set, emitting without authentication");
    }

    let transport = RestEmitter::from_config(&settings.emitter)?;
    let metadata = HoodieTableReader::new(&settings.sync.base_path);
    let sync = CatalogSyncClient::new(settings.sync.clone(), Arc::new(transport), Arc::new(metadata))?;

    let scope = sync.scope();
    info!("📦 Dataset:   {}", scope.dataset_urn);
    info!("📁 Container: {}", scope.container_urn);
    info!("🔗 Catalog:   {}", scope.endpoint);

    if settings.server.sync_on_startup {
        match sync.sync_table().await {
            Ok(report) if report.is_success() => info!("✅ Startup sync finished"),
            Ok(_) => warn!("⚠️  Startup sync finished with failures"),
            Err(e) => error!("❌ Startup sync failed: {}", e),
        }
    }

    let state = Arc::new(AppState::new(sync));

    // Build the router
    let app = create_router(state);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("🌐 Server listening on http://{}", addr);
    info!("");
    info!("📚 API Endpoints:");
    info!("   GET  /health              - Liveness check");
    info!("   GET  /scope               - Dataset and catalog being synced");
    info!("   POST /sync                - Full table sync");
    info!("   POST /sync/schema         - Publish the table schema");
    info!("   POST /sync/properties     - Patch dataset properties");
    info!("   POST /sync/last-commit    - Record the latest commit time");
    info!("   GET  /sync/last-synced    - Read back the last synced commit");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
///
/// `LOG_FORMAT=json` switches to one JSON object per event.
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hudi_catalog_sync=debug,tower_http=debug"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .compact(),
            )
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
