use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use meetserver::api_router::configure_api_routes;
use meetserver::config::AppConfig;
use meetserver::shared::state::AppState;
use meetserver::shared::utils::{create_conn, run_migrations};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    info!("starting meetserver on {}:{}", config.server.host, config.server.port);

    let pool = create_conn(&config.database_url)?;
    run_migrations(&pool)?;
    tokio::fs::create_dir_all(&config.uploads_dir).await?;

    let state = Arc::new(AppState::new(pool, config.clone()));

    let app = configure_api_routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
