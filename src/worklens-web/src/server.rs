//! Axum server setup and routing

use crate::routes;
use crate::state::{AppState, SubmissionAnalyzer};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Build the application router. Split out from [`serve`] so tests can
/// drive it without binding a socket.
pub fn router(analyzer: Arc<dyn SubmissionAnalyzer>) -> Router {
    Router::new()
        .route("/analyze", get(routes::analyze))
        .route("/health", get(routes::health))
        .with_state(AppState::new(analyzer))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Start the trigger endpoint.
pub async fn serve(analyzer: Arc<dyn SubmissionAnalyzer>, port: u16) -> anyhow::Result<()> {
    let app = router(analyzer);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("starting worklens trigger endpoint on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
