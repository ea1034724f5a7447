use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use concierge::config::AppConfig;
use concierge::db;
use concierge::handlers;
use concierge::services::booking::http::HttpBookingApi;
use concierge::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if config.webhook_secret.is_empty() {
        tracing::warn!("WEBHOOK_SECRET is empty, inbound messages are not authenticated");
    }

    tracing::info!(url = %config.booking_api_url, "using booking API");
    let api = HttpBookingApi::new(
        config.booking_api_url.clone(),
        config.booking_api_timeout(),
        config.booking_api_max_retries,
    )?;

    let state = Arc::new(AppState::new(config.clone(), conn, Arc::new(api))?);

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
