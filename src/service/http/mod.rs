//! The HTTP API.
//!
//! One axum router serves the orchestrated `/chat` endpoint, the per-agent
//! chat endpoints, and the dashboard endpoints over the store.

pub mod routes;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, instrument, warn};

use crate::{base::types::Void, runtime::Runtime};

/// Build the application router over the runtime.
pub fn build_router(runtime: Runtime) -> Router {
    let cors = build_cors_layer(&runtime.config.cors_allowed_origins);

    Router::new()
        .route("/chat", post(routes::chat))
        .route("/api/chat/{agent}", post(routes::chat_with_agent))
        .route("/api/tickets", get(routes::list_tickets).post(routes::create_ticket))
        .route("/api/tickets/{id}", get(routes::get_ticket))
        .route("/api/agents", get(routes::list_agents))
        .route("/api/dashboard/metrics", get(routes::dashboard_metrics))
        .route("/api/settings", get(routes::get_settings).put(routes::update_settings))
        .route("/api/health", get(routes::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(runtime)
}

/// CORS from a comma-separated origin list, where `*` allows any origin.
fn build_cors_layer(origins: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.split(',').any(|origin| origin.trim() == "*") {
        return cors.allow_origin(Any);
    }

    let origins = origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin `{}`.", origin);
                None
            }
        })
        .collect::<Vec<_>>();

    cors.allow_origin(AllowOrigin::list(origins))
}

/// Bind the configured address and serve until Ctrl-C.
#[instrument(skip_all)]
pub async fn serve(runtime: Runtime) -> Void {
    let addr = format!("{}:{}", runtime.config.server_host, runtime.config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Listening on http://{} ...", addr);

    axum::serve(listener, build_router(runtime)).with_graceful_shutdown(shutdown_signal()).await?;

    info!("Server stopped.");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }

    info!("Shutting down ...");
}

// Tests.
