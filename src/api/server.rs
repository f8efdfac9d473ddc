//! Axum HTTP server for the gateway.

use std::future::Future;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::Result;

use super::service::Gateway;

/// Shared state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self {
            gateway: Arc::new(gateway),
        }
    }
}

/// Build the axum router with all gateway routes.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let shared_state = Arc::new(state);

    // Any origin, method and header; browser front-ends call this directly.
    let cors = CorsLayer::very_permissive();

    Router::new()
        .route("/", get(super::routes::health::liveness))
        .route("/metrics", get(super::routes::metrics::get_metrics))
        .route("/authenticate", post(super::routes::tracker::authenticate))
        .route("/fetch-stories", post(super::routes::tracker::fetch_stories))
        .route(
            "/generate-test-cases",
            post(super::routes::test_cases::generate_test_cases),
        )
        .layer(DefaultBodyLimit::max(config.body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state)
}

/// Bind the listener and serve until `shutdown` resolves.
pub async fn start_server<F>(config: &ServerConfig, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, config);
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Gateway listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
