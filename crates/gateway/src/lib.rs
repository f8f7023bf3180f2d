//! HTTP API gateway for PokeRAG.
//!
//! Exposes a health check and the `/v1` chat and ingest endpoints.
//! Built on Axum; all request handling is delegated to `pokerag-agent`.

pub mod api_v1;

#[cfg(test)]
mod test_support;

use axum::extract::DefaultBodyLimit;
use axum::{Router, extract::State, response::Json, routing::get};
use chrono::{DateTime, Utc};
use pokerag_agent::Services;
use pokerag_config::AppConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub services: Services,
    pub start_time: DateTime<Utc>,
}

impl GatewayState {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            start_time: Utc::now(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the router with all routes and middleware.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - Permissive CORS
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let services = Services::from_config(&config)?;
    let app = build_router(Arc::new(GatewayState::new(services)));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until the process is killed.
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
    pub token_estimator: String,
    pub vector_store: String,
    /// Stored chunks, when the store answered in time.
    pub documents: Option<usize>,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let store = &state.services.store;
    let documents = match tokio::time::timeout(Duration::from_secs(2), store.count()).await {
        Ok(Ok(n)) => Some(n),
        _ => None,
    };

    Json(HealthResponse {
        status: if documents.is_some() { "ok" } else { "degraded" }.into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_secs: (Utc::now() - state.start_time).num_seconds(),
        token_estimator: state.services.chat.estimator().strategy_name().into(),
        vector_store: store.name().into(),
        documents,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let app = build_router(test_state(&[]));

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "ok");
        assert_eq!(health.token_estimator, "char_ratio");
        assert_eq!(health.vector_store, "memory");
        assert_eq!(health.documents, Some(0));
    }

    #[tokio::test]
    async fn v1_routes_are_nested() {
        let app = build_router(test_state(&[]));
        let req = Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message":"   "}"#))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let app = build_router(test_state(&[]));
        let req = Request::builder().uri("/v2/chat").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = build_router(test_state(&[]));
        let body = format!(r#"{{"message":"{}"}}"#, "a".repeat(2 * 1024 * 1024));
        let req = Request::builder()
            .method("POST")
            .uri("/v1/chat")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
