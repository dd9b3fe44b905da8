//! `api` crate — HTTP surface over the workflow tools.
//!
//! Exposes:
//!   GET    /api/v1/workflows
//!   POST   /api/v1/workflows
//!   GET    /api/v1/workflows/{id}
//!   DELETE /api/v1/workflows/{id}
//!   POST   /api/v1/workflows/{id}/partial-update
//!   POST   /api/v1/workflows/{id}/validate
//!   POST   /api/v1/workflows/{id}/autofix

pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub use error::ApiError;
pub use handlers::AppState;

/// Build the router with all routes and layers attached.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v1/workflows",
            get(handlers::workflows::list).post(handlers::workflows::create),
        )
        .route(
            "/api/v1/workflows/{id}",
            get(handlers::workflows::get).delete(handlers::workflows::delete),
        )
        .route("/api/v1/workflows/{id}/partial-update", post(handlers::tools::partial_update))
        .route("/api/v1/workflows/{id}/validate", post(handlers::tools::validate))
        .route("/api/v1/workflows/{id}/autofix", post(handlers::tools::autofix))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
