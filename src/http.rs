//! HTTP server for the Prometheus metrics endpoint.
//!
//! Every `/metrics` request polls the remote API through the registered
//! collectors. A remote fault fails the scrape with a 500 instead of
//! serving partial or stale data.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::collectors::CollectorRegistry;
use crate::metrics::render;

/// Content type of the text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    registry: Arc<CollectorRegistry>,
}

/// Create the HTTP router.
fn create_router(registry: Arc<CollectorRegistry>) -> Router {
    let state = AppState { registry };

    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.registry.gather().await {
        Ok(families) => (
            StatusCode::OK,
            [("content-type", EXPOSITION_CONTENT_TYPE)],
            render(&families),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Scrape failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("scrape failed: {e}\n"),
            )
                .into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// The exporter's own HTTP endpoint.
pub struct MetricsServer {
    registry: Arc<CollectorRegistry>,
    listen_addr: SocketAddr,
}

impl MetricsServer {
    pub fn new(registry: Arc<CollectorRegistry>, listen_addr: SocketAddr) -> Self {
        Self {
            registry,
            listen_addr,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.registry);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(addr = %self.listen_addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::StubApi;
    use crate::client::PmgApi;
    use crate::collectors;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn registry_for(names: &[&str]) -> Arc<CollectorRegistry> {
        let api: Arc<dyn PmgApi> = Arc::new(StubApi::new());
        let requested: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        Arc::new(collectors::resolve(&requested, api))
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let router = create_router(registry_for(&["exporter_status"]));

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert_eq!(content_type.to_str().unwrap(), EXPOSITION_CONTENT_TYPE);

        let text = body_text(response).await;
        assert!(text.contains("# HELP pmg_exporter_up"));
        assert!(text.contains("pmg_exporter_up 1"));
    }

    #[tokio::test]
    async fn test_metrics_endpoint_fails_scrape_on_remote_fault() {
        // version_info hits an unstubbed path and gets a 404 from the API.
        let router = create_router(registry_for(&["exporter_status", "version_info"]));

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let text = body_text(response).await;
        assert!(text.contains("scrape failed"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let router = create_router(registry_for(&["exporter_status"]));

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let router = create_router(registry_for(&["exporter_status"]));

        let response = router
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
