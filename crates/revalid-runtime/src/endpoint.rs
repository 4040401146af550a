//! Freshness endpoint
//!
//! Answers `GET` on the configured path with the server's current time so
//! clients can measure their clock offset. Responses must never be cached.

use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::info;

use revalid_clock::FreshnessResponse;
use revalid_core::{RevalidResult, Timestamp};

/// Router serving the freshness endpoint at `path`
pub fn freshness_router(path: &str) -> Router {
    Router::new().route(path, get(freshness))
}

async fn freshness() -> impl IntoResponse {
    (
        [(header::CACHE_CONTROL, "no-store, max-age=0")],
        Json(FreshnessResponse::at(Timestamp::now())),
    )
}

/// Serve the freshness endpoint until the listener fails
pub async fn serve(listener: TcpListener, path: &str) -> RevalidResult<()> {
    info!(addr = ?listener.local_addr().ok(), %path, "serving freshness endpoint");
    axum::serve(listener, freshness_router(path)).await?;
    Ok(())
}
