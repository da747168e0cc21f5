mod cache;
mod config;
mod gemini;
mod models;
mod naming;
mod normalize;
mod prompt;
mod routes;
mod schema;

use axum::{Router, routing::{post, get}};
use routes::{create_naming, get_naming, health, AppState};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};
use std::sync::Arc;
use parking_lot::RwLock;
use tower::ServiceBuilder;
use tower_http::{cors::{CorsLayer, Any}, trace::TraceLayer};

use crate::cache::ResultCache;
use crate::config::AppConfig;
use crate::gemini::{ChunkSource, GeminiClient, HttpChunkSource};
use crate::models::Tier;
use crate::naming::NameStylist;

pub fn build_router<S: ChunkSource + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/naming", post(create_naming::<S>))
        .route("/api/naming/:request_id", get(get_naming::<S>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any)
                ),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();
    for tier in [Tier::Free, Tier::Premium] {
        match config.credentials.for_tier(tier) {
            Some(key) => tracing::info!("Using {:?} API key: {}...", tier, key.chars().take(6).collect::<String>()),
            None => tracing::warn!("No API key for {:?} tier; those requests will fail", tier),
        }
    }

    let source = HttpChunkSource::new(config.api_base.clone(), config.request_timeout)?;
    let state = AppState {
        cache: Arc::new(RwLock::new(ResultCache::new(config.cache_ttl))),
        stylist: Arc::new(NameStylist::new(GeminiClient::new(source, config.credentials.clone(), config.model.clone()))),
    };

    let app = build_router(state);

    let addr = SocketAddr::from(([0,0,0,0], config.port));
    tracing::info!(%addr, model = %config.model, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async { tokio::signal::ctrl_c().await.ok(); })
        .await?;
    Ok(())
}
