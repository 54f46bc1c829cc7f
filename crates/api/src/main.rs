//! Herald API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use herald_common::config::AppConfig;
use herald_common::db::create_pool;
use herald_engine::ack::AckService;
use herald_engine::dispatch::DispatchEngine;
use herald_engine::registration::RegistrationService;
use herald_gateway::FcmClient;
use herald_store::{PgCampaignStore, PgDeliveryLedger, PgTokenStore};

use herald_api::routes::create_router;
use herald_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("herald_api=debug,herald_engine=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Herald API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    // Wire collaborators once at startup; everything downstream takes
    // them by injection.
    let tokens = Arc::new(PgTokenStore::new(pool.clone()));
    let campaigns = Arc::new(PgCampaignStore::new(pool.clone()));
    let ledger = Arc::new(PgDeliveryLedger::new(pool.clone()));
    let gateway = Arc::new(FcmClient::new(
        config.fcm_endpoint.clone(),
        config.fcm_server_key.clone(),
    ));

    let registration = Arc::new(RegistrationService::new(
        tokens.clone(),
        config.registration_ttl_hours,
    ));
    let ack = Arc::new(AckService::new(ledger.clone()));
    let dispatch = Arc::new(DispatchEngine::new(tokens, campaigns, ledger, gateway));

    // Build application state
    let state = AppState::new(registration, ack, dispatch);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
